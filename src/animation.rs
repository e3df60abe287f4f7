//! Scroll-driven playback: progress to frame mapping, redraw coalescing and
//! the overlay fade.

use crate::OverlayConfig;

/// Map a scroll progress value to a frame index.
///
/// Progress is clamped to 0.0 - 1.0 (NaN counts as 0), so the result is
/// always a valid index for a non-empty sequence.
///
/// ```rust
/// use frameseq_scroll::frame_for_progress;
///
/// assert_eq!(frame_for_progress(0.0, 192), 0);
/// assert_eq!(frame_for_progress(0.5, 192), 95);
/// assert_eq!(frame_for_progress(1.0, 192), 191);
/// assert_eq!(frame_for_progress(1.7, 192), 191);
/// ```
pub fn frame_for_progress(progress: f64, frame_count: usize) -> usize {
    if frame_count == 0 {
        return 0;
    }
    let p = clamp_progress(progress);
    let max_idx = (frame_count - 1) as f64;
    ((p * max_idx).floor() as usize).min(frame_count - 1)
}

#[inline]
fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

/// Last frame handed to the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackCursor {
    last_rendered_frame: Option<usize>,
}

impl PlaybackCursor {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn last_rendered_frame(&self) -> Option<usize> {
        self.last_rendered_frame
    }

    /// Move to `frame`. Returns false when it is already current.
    pub fn advance_to(&mut self, frame: usize) -> bool {
        if self.last_rendered_frame == Some(frame) {
            return false;
        }
        self.last_rendered_frame = Some(frame);
        true
    }

    pub fn reset(&mut self) {
        self.last_rendered_frame = None;
    }
}

/// Single pending redraw, latest request wins.
///
/// The host asks for one paint callback when [`RedrawSlot::schedule`]
/// returns true; further frames replace the pending one until the callback
/// runs and calls [`RedrawSlot::take`].
#[derive(Clone, Copy, Debug, Default)]
pub struct RedrawSlot {
    pending: Option<usize>,
}

impl RedrawSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `frame`. Returns true when a paint callback must be requested.
    pub fn schedule(&mut self, frame: usize) -> bool {
        self.pending.replace(frame).is_none()
    }

    /// Take the frame to draw in this paint callback.
    pub fn take(&mut self) -> Option<usize> {
        self.pending.take()
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Overlay style at a given progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayStyle {
    /// 1.0 fully visible, 0.0 hidden
    pub opacity: f64,
    /// Vertical offset in CSS pixels
    pub translate_y: f64,
}

impl OverlayStyle {
    pub const VISIBLE: Self = Self {
        opacity: 1.0,
        translate_y: 0.0,
    };

    /// CSS `transform` value for the offset.
    pub fn css_transform(&self) -> String {
        format!("translateY({:.2}px)", self.translate_y)
    }
}

/// Continuous fade over the first part of the traversal.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayFade {
    config: OverlayConfig,
}

impl OverlayFade {
    pub fn new(config: OverlayConfig) -> Self {
        Self { config }
    }

    /// Style at traversal progress `progress`.
    pub fn style_at(&self, progress: f64) -> OverlayStyle {
        let local = (clamp_progress(progress) / self.config.fade_end).min(1.0);
        OverlayStyle {
            opacity: 1.0 - local,
            translate_y: self.config.translate_y * local,
        }
    }
}

/// Catch-up smoothing between the scroll position and displayed progress.
///
/// With a lag of `lag_seconds` the displayed value closes the remaining
/// distance proportionally to elapsed time. A lag of 0 follows the target
/// directly.
#[derive(Clone, Copy, Debug)]
pub struct ScrubSmoother {
    lag_seconds: f64,
    current: f64,
    target: f64,
}

impl ScrubSmoother {
    const SETTLE_EPSILON: f64 = 1e-4;

    pub fn new(lag_seconds: f64) -> Self {
        Self {
            lag_seconds: lag_seconds.max(0.0),
            current: 0.0,
            target: 0.0,
        }
    }

    /// Set the value to move toward. Returns the current value, already
    /// equal to the target when smoothing is off.
    pub fn set_target(&mut self, target: f64) -> f64 {
        self.target = clamp_progress(target);
        if self.lag_seconds == 0.0 {
            self.current = self.target;
        }
        self.current
    }

    /// Advance by `dt_seconds` and return the displayed value.
    pub fn advance(&mut self, dt_seconds: f64) -> f64 {
        if self.lag_seconds == 0.0 || dt_seconds >= self.lag_seconds {
            self.current = self.target;
        } else if dt_seconds > 0.0 {
            self.current += (self.target - self.current) * (dt_seconds / self.lag_seconds);
            if (self.target - self.current).abs() < Self::SETTLE_EPSILON {
                self.current = self.target;
            }
        }
        self.current
    }

    #[inline]
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Check if the displayed value has reached the target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    /// Jump straight to `value`.
    pub fn snap(&mut self, value: f64) {
        self.target = clamp_progress(value);
        self.current = self.target;
    }
}

/// Default scroll-progress source: a pinned region starting at `start`
/// spanning `extent` scroll units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinnedRange {
    start: f64,
    extent: f64,
}

impl PinnedRange {
    pub fn new(start: f64, extent: f64) -> Self {
        Self {
            start,
            extent: extent.max(0.0),
        }
    }

    #[inline]
    pub fn start(&self) -> f64 {
        self.start
    }

    #[inline]
    pub fn extent(&self) -> f64 {
        self.extent
    }

    #[inline]
    pub fn end(&self) -> f64 {
        self.start + self.extent
    }

    /// Re-measure after layout changes.
    pub fn refresh(&mut self, start: f64) {
        self.start = start;
    }

    /// Progress at scroll offset `scroll`: 0 at entry, 1 at exit.
    pub fn progress_at(&self, scroll: f64) -> f64 {
        if self.extent == 0.0 {
            return if scroll >= self.start { 1.0 } else { 0.0 };
        }
        clamp_progress((scroll - self.start) / self.extent)
    }

    /// Check if `scroll` lies inside the pinned region.
    pub fn contains(&self, scroll: f64) -> bool {
        scroll >= self.start && scroll <= self.end()
    }
}

/// What the host should do after a progress update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollUpdate {
    /// Newly resolved frame, when it changed
    pub frame: Option<usize>,
    /// True when a paint callback must be requested
    pub request_paint: bool,
    /// Overlay style at this progress
    pub overlay: OverlayStyle,
}

/// Turns progress values into frame changes and overlay styles.
///
/// ## Example
///
/// ```rust
/// use frameseq_scroll::{OverlayConfig, ScrollAdapter};
///
/// let mut adapter = ScrollAdapter::new(100, OverlayConfig::default());
///
/// let first = adapter.update(0.5);
/// assert_eq!(first.frame, Some(49));
/// assert!(first.request_paint);
///
/// // Same frame again: nothing to draw
/// let second = adapter.update(0.501);
/// assert_eq!(second.frame, None);
/// assert!(!second.request_paint);
///
/// assert_eq!(adapter.take_pending(), Some(49));
/// ```
#[derive(Clone, Debug)]
pub struct ScrollAdapter {
    frame_count: usize,
    cursor: PlaybackCursor,
    redraw: RedrawSlot,
    overlay: OverlayFade,
}

impl ScrollAdapter {
    pub fn new(frame_count: usize, overlay: OverlayConfig) -> Self {
        Self {
            frame_count,
            cursor: PlaybackCursor::new(),
            redraw: RedrawSlot::new(),
            overlay: OverlayFade::new(overlay),
        }
    }

    /// Feed a progress value.
    pub fn update(&mut self, progress: f64) -> ScrollUpdate {
        let overlay = self.overlay.style_at(progress);
        let frame = frame_for_progress(progress, self.frame_count);
        if !self.cursor.advance_to(frame) {
            return ScrollUpdate {
                frame: None,
                request_paint: false,
                overlay,
            };
        }
        ScrollUpdate {
            frame: Some(frame),
            request_paint: self.redraw.schedule(frame),
            overlay,
        }
    }

    /// Frame to draw in the current paint callback.
    pub fn take_pending(&mut self) -> Option<usize> {
        self.redraw.take()
    }

    /// Frame currently shown: the last resolved one, or the first frame.
    #[inline]
    pub fn current_frame(&self) -> usize {
        self.cursor.last_rendered_frame().unwrap_or(0)
    }

    #[inline]
    pub fn cursor(&self) -> PlaybackCursor {
        self.cursor
    }

    /// Record a draw made outside the scroll path (e.g. the initial frame).
    pub fn note_rendered(&mut self, frame: usize) {
        self.cursor.advance_to(frame);
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        self.redraw.is_pending()
    }

    /// Forget the pending redraw and the cursor.
    pub fn reset(&mut self) {
        self.redraw.cancel();
        self.cursor.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_mapping_bounds() {
        for count in [1usize, 2, 5, 192] {
            for step in 0..=100 {
                let p = step as f64 / 100.0;
                let frame = frame_for_progress(p, count);
                assert!(frame < count, "p={p} count={count} -> {frame}");
            }
            assert_eq!(frame_for_progress(0.0, count), 0);
            assert_eq!(frame_for_progress(1.0, count), count - 1);
        }
    }

    #[test]
    fn test_frame_mapping_clamps() {
        assert_eq!(frame_for_progress(-0.5, 192), 0);
        assert_eq!(frame_for_progress(2.0, 192), 191);
        assert_eq!(frame_for_progress(f64::NAN, 192), 0);
        assert_eq!(frame_for_progress(f64::INFINITY, 192), 191);
        assert_eq!(frame_for_progress(0.5, 0), 0);
    }

    #[test]
    fn test_cursor_suppresses_repeats() {
        let mut cursor = PlaybackCursor::new();
        assert!(cursor.advance_to(3));
        assert!(!cursor.advance_to(3));
        assert!(cursor.advance_to(4));
        assert_eq!(cursor.last_rendered_frame(), Some(4));
    }

    #[test]
    fn test_redraw_slot_latest_wins() {
        let mut slot = RedrawSlot::new();
        assert!(slot.schedule(1));
        assert!(!slot.schedule(2));
        assert!(!slot.schedule(3));
        assert_eq!(slot.take(), Some(3));
        assert_eq!(slot.take(), None);
        assert!(slot.schedule(4));
    }

    #[test]
    fn test_overlay_fades_over_first_part() {
        let fade = OverlayFade::new(OverlayConfig::default());
        assert_eq!(fade.style_at(0.0), OverlayStyle::VISIBLE);

        let mid = fade.style_at(0.15);
        assert!((mid.opacity - 0.5).abs() < 1e-9);
        assert!((mid.translate_y - (-25.0)).abs() < 1e-9);

        let done = fade.style_at(0.3);
        assert!(done.opacity.abs() < 1e-9);
        assert!((done.translate_y - (-50.0)).abs() < 1e-9);

        // Stays hidden past the fade range
        assert_eq!(fade.style_at(0.9), fade.style_at(1.0));
        assert_eq!(OverlayStyle::VISIBLE.css_transform(), "translateY(0.00px)");
    }

    #[test]
    fn test_adapter_coalesces_same_frame() {
        let mut adapter = ScrollAdapter::new(10, OverlayConfig::default());
        let mut paints = 0;
        for p in [0.0, 0.01, 0.05, 0.1, 0.11, 0.5, 0.5, 1.0] {
            if adapter.update(p).request_paint {
                paints += 1;
                adapter.take_pending();
            }
        }
        // Frames 0, 0, 0, 0, 0, 4, 4, 9 -> three distinct
        assert_eq!(paints, 3);
        assert_eq!(adapter.current_frame(), 9);
    }

    #[test]
    fn test_adapter_one_paint_per_burst() {
        let mut adapter = ScrollAdapter::new(100, OverlayConfig::default());
        let requests = [0.1, 0.2, 0.3, 0.4]
            .iter()
            .filter(|&&p| adapter.update(p).request_paint)
            .count();
        assert_eq!(requests, 1);
        assert_eq!(adapter.take_pending(), Some(39));
    }

    #[test]
    fn test_scrub_smoother() {
        let mut smoother = ScrubSmoother::new(1.0);
        assert_eq!(smoother.set_target(1.0), 0.0);
        let half = smoother.advance(0.5);
        assert!((half - 0.5).abs() < 1e-9);
        assert!(!smoother.is_settled());
        assert_eq!(smoother.advance(1.0), 1.0);
        assert!(smoother.is_settled());

        let mut direct = ScrubSmoother::new(0.0);
        assert_eq!(direct.set_target(0.7), 0.7);
    }

    #[test]
    fn test_pinned_range() {
        let mut range = PinnedRange::new(800.0, 3840.0);
        assert_eq!(range.progress_at(0.0), 0.0);
        assert_eq!(range.progress_at(800.0 + 1920.0), 0.5);
        assert_eq!(range.progress_at(10_000.0), 1.0);
        assert!(range.contains(1000.0));

        range.refresh(1000.0);
        assert_eq!(range.progress_at(1000.0), 0.0);
        assert_eq!(range.end(), 4840.0);

        let empty = PinnedRange::new(10.0, 0.0);
        assert_eq!(empty.progress_at(9.0), 0.0);
        assert_eq!(empty.progress_at(10.0), 1.0);
    }
}
