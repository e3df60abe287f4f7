//! Frame preloading state management.
//!
//! All frame requests go out at once and complete in any order. The
//! [`Preloader`] counts completions, retries failures according to the
//! [`RetryPolicy`], and fires the ready transition exactly once when every
//! frame has settled.

use crate::{FrameSet, FrameStatus, PlayerError, RetryPolicy, SequenceConfig};

/// Loading phase indicator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadingPhase {
    /// Not loading anything
    Idle,
    /// Frame requests in flight
    Loading,
    /// Every frame settled, playback may start
    Ready,
}

/// Snapshot exposed to the host for the loading indicator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PreloadState {
    /// Percentage of drawable frames loaded (0-100)
    pub progress: u8,
    /// Set once, when loading finishes
    pub is_loaded: bool,
}

/// Progress information for frame loading
#[derive(Clone, Debug, Default)]
pub struct LoadingProgress {
    /// Frames decoded successfully
    pub loaded: usize,
    /// Frames given up on
    pub failed: usize,
    /// Frames requested
    pub total: usize,
}

impl LoadingProgress {
    /// Create a new loading progress tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset progress for a new loading session
    pub fn reset(&mut self, total: usize) {
        self.loaded = 0;
        self.failed = 0;
        self.total = total;
    }

    /// Loading percentage (0-100).
    ///
    /// Failed frames leave the denominator, so failures push progress
    /// forward instead of holding it below 100.
    pub fn percent(&self) -> u8 {
        let drawable = self.total.saturating_sub(self.failed);
        if self.total == 0 {
            0
        } else if drawable == 0 {
            100
        } else {
            ((self.loaded.min(drawable) * 100) / drawable) as u8
        }
    }

    /// Check if every frame has a final status
    pub fn complete(&self) -> bool {
        self.total > 0 && self.loaded + self.failed >= self.total
    }

    /// Format the loading message
    pub fn message(&self) -> String {
        format!("Loading Cinematic Experience... {}%", self.percent())
    }
}

/// A single image fetch the host must perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRequest {
    /// Position in the sequence
    pub index: usize,
    /// Source path to fetch
    pub url: String,
    /// 0 for the first try, then 1, 2, ... for retries
    pub attempt: u32,
    /// Delay before the fetch is issued
    pub delay_ms: u32,
    /// Give up on this attempt after this long
    pub timeout_ms: Option<u32>,
}

/// Result of feeding a completion or failure into the preloader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Counted; loading continues
    Progress(PreloadState),
    /// Counted, and this completion finished loading
    Ready(PreloadState),
    /// The attempt failed; issue this request again
    Retry(FrameRequest),
    /// The frame was given up on
    Failed {
        error: PlayerError,
        state: PreloadState,
        ready: bool,
    },
    /// Duplicate or late event; nothing changed
    Ignored,
}

impl LoadOutcome {
    /// Check if this outcome carries the ready transition.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Failed { ready: true, .. })
    }
}

/// Preloader state machine: `Idle → Loading → Ready`.
#[derive(Clone, Debug)]
pub struct Preloader {
    phase: LoadingPhase,
    progress: LoadingProgress,
    attempts: Vec<u32>,
    retry: RetryPolicy,
    ready_fired: bool,
}

impl Default for Preloader {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl Preloader {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            phase: LoadingPhase::Idle,
            progress: LoadingProgress::new(),
            attempts: Vec::new(),
            retry,
            ready_fired: false,
        }
    }

    /// Start loading and return one request per frame.
    pub fn start<I>(&mut self, frames: &FrameSet<I>, config: &SequenceConfig) -> Vec<FrameRequest> {
        self.phase = LoadingPhase::Loading;
        self.ready_fired = false;
        self.progress.reset(frames.len());
        self.attempts = vec![0; frames.len()];
        tracing::debug!(frames = frames.len(), base_path = %config.base_path, "preloading frame sequence");

        frames
            .iter()
            .enumerate()
            .map(|(index, frame)| FrameRequest {
                index,
                url: frame.source.clone(),
                attempt: 0,
                delay_ms: 0,
                timeout_ms: self.retry.load_timeout_ms,
            })
            .collect()
    }

    /// Record a decoded frame.
    pub fn frame_loaded<I>(&mut self, frames: &mut FrameSet<I>, index: usize, image: I, width: u32, height: u32) -> LoadOutcome {
        if self.phase != LoadingPhase::Loading {
            return LoadOutcome::Ignored;
        }
        match frames.mark_loaded(index, image, width, height) {
            None => LoadOutcome::Ignored,
            Some(FrameStatus::Loaded) => {
                self.progress.loaded += 1;
                tracing::trace!(index, width, height, "frame loaded");
                self.settle()
            }
            Some(_) => {
                self.progress.failed += 1;
                let error = PlayerError::image_load(index, "image has no natural size");
                tracing::warn!(%error, "skipping frame");
                self.settle_failed(error)
            }
        }
    }

    /// Record a failed or timed-out attempt.
    ///
    /// Retries while the policy allows, then gives up on the frame.
    pub fn frame_failed<I>(&mut self, frames: &mut FrameSet<I>, index: usize, reason: &str) -> LoadOutcome {
        if self.phase != LoadingPhase::Loading {
            return LoadOutcome::Ignored;
        }
        let Some(frame) = frames.get(index) else {
            return LoadOutcome::Ignored;
        };
        if frame.is_settled() {
            return LoadOutcome::Ignored;
        }

        let attempt = self.attempts[index] + 1;
        self.attempts[index] = attempt;
        if attempt <= self.retry.max_retries {
            let delay_ms = self.retry.delay_for(attempt);
            tracing::debug!(index, attempt, delay_ms, reason, "retrying frame");
            return LoadOutcome::Retry(FrameRequest {
                index,
                url: frame.source.clone(),
                attempt,
                delay_ms,
                timeout_ms: self.retry.load_timeout_ms,
            });
        }

        frames.mark_failed(index);
        self.progress.failed += 1;
        let error = PlayerError::image_load(index, reason);
        tracing::warn!(%error, attempts = attempt, "giving up on frame");
        self.settle_failed(error)
    }

    fn settle(&mut self) -> LoadOutcome {
        if self.try_finish() {
            LoadOutcome::Ready(self.state())
        } else {
            LoadOutcome::Progress(self.state())
        }
    }

    fn settle_failed(&mut self, error: PlayerError) -> LoadOutcome {
        let ready = self.try_finish();
        LoadOutcome::Failed {
            error,
            state: self.state(),
            ready,
        }
    }

    /// One-shot ready transition, guarded by its own flag.
    fn try_finish(&mut self) -> bool {
        if self.ready_fired || !self.progress.complete() {
            return false;
        }
        self.ready_fired = true;
        self.phase = LoadingPhase::Ready;
        if self.progress.loaded == 0 {
            tracing::warn!(total = self.progress.total, "no frame of the sequence could be loaded");
        } else {
            tracing::debug!(
                loaded = self.progress.loaded,
                failed = self.progress.failed,
                "frame sequence ready"
            );
        }
        true
    }

    /// Current loading snapshot.
    pub fn state(&self) -> PreloadState {
        if self.ready_fired {
            PreloadState {
                progress: 100,
                is_loaded: true,
            }
        } else {
            PreloadState {
                progress: self.progress.percent(),
                is_loaded: false,
            }
        }
    }

    #[inline]
    pub fn phase(&self) -> LoadingPhase {
        self.phase
    }

    #[inline]
    pub fn progress(&self) -> &LoadingProgress {
        &self.progress
    }

    /// Check if playback can start
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.phase == LoadingPhase::Ready
    }

    /// Drop back to idle; late completions are ignored afterwards.
    pub fn reset(&mut self) {
        self.phase = LoadingPhase::Idle;
        self.progress = LoadingProgress::new();
        self.attempts.clear();
        self.ready_fired = false;
    }
}

/// Browser image loading through `HtmlImageElement`.
#[cfg(feature = "web")]
pub mod web {
    use super::FrameRequest;
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::JsCast;
    use web_sys::HtmlImageElement;

    /// Completion report for one image element.
    pub enum ImageEvent {
        Loaded(HtmlImageElement),
        Failed(String),
    }

    /// An in-flight image fetch.
    ///
    /// Dropping it detaches the element's callbacks and clears its timers,
    /// so no report arrives afterwards.
    pub struct ImageFetch {
        image: HtmlImageElement,
        _onload: Closure<dyn FnMut()>,
        _onerror: Closure<dyn FnMut()>,
        _timeout: Option<Closure<dyn FnMut()>>,
        _start: Option<Closure<dyn FnMut()>>,
        timer_ids: Vec<i32>,
    }

    impl ImageFetch {
        /// Create an image element for `request` and start fetching it.
        ///
        /// `report` is called at most once with the result. A request delay
        /// postpones setting `src`.
        pub fn start<F>(request: &FrameRequest, report: F) -> Result<Self, String>
        where
            F: Fn(ImageEvent) + Clone + 'static,
        {
            let window = web_sys::window().ok_or("No window available")?;
            let image = HtmlImageElement::new().map_err(|_| "Failed to create image element")?;

            let done = std::rc::Rc::new(std::cell::Cell::new(false));

            let onload = {
                let image = image.clone();
                let done = done.clone();
                let report = report.clone();
                Closure::<dyn FnMut()>::new(move || {
                    if !done.replace(true) {
                        report(ImageEvent::Loaded(image.clone()));
                    }
                })
            };
            let onerror = {
                let done = done.clone();
                let report = report.clone();
                Closure::<dyn FnMut()>::new(move || {
                    if !done.replace(true) {
                        report(ImageEvent::Failed("network or decode error".to_string()));
                    }
                })
            };
            image.set_onload(Some(onload.as_ref().unchecked_ref()));
            image.set_onerror(Some(onerror.as_ref().unchecked_ref()));

            let mut timer_ids = Vec::new();

            let timeout = match request.timeout_ms {
                Some(ms) => {
                    let done = done.clone();
                    let closure = Closure::<dyn FnMut()>::new(move || {
                        if !done.replace(true) {
                            report(ImageEvent::Failed("timed out".to_string()));
                        }
                    });
                    let total = ms.saturating_add(request.delay_ms).min(i32::MAX as u32) as i32;
                    let id = window
                        .set_timeout_with_callback_and_timeout_and_arguments_0(
                            closure.as_ref().unchecked_ref::<js_sys::Function>(),
                            total,
                        )
                        .map_err(|_| "Failed to set load timeout")?;
                    timer_ids.push(id);
                    Some(closure)
                }
                None => None,
            };

            let start = if request.delay_ms == 0 {
                image.set_src(&request.url);
                None
            } else {
                let image = image.clone();
                let url = request.url.clone();
                let closure = Closure::<dyn FnMut()>::new(move || image.set_src(&url));
                let id = window
                    .set_timeout_with_callback_and_timeout_and_arguments_0(
                        closure.as_ref().unchecked_ref::<js_sys::Function>(),
                        request.delay_ms.min(i32::MAX as u32) as i32,
                    )
                    .map_err(|_| "Failed to schedule retry")?;
                timer_ids.push(id);
                Some(closure)
            };

            Ok(Self {
                image,
                _onload: onload,
                _onerror: onerror,
                _timeout: timeout,
                _start: start,
                timer_ids,
            })
        }
    }

    impl Drop for ImageFetch {
        fn drop(&mut self) {
            self.image.set_onload(None);
            self.image.set_onerror(None);
            if let Some(window) = web_sys::window() {
                for id in self.timer_ids.drain(..) {
                    window.clear_timeout_with_handle(id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(count: usize, retry: RetryPolicy) -> (Preloader, FrameSet<u32>, Vec<FrameRequest>) {
        let config = SequenceConfig {
            frame_count: count,
            retry: retry.clone(),
            ..Default::default()
        };
        let frames = FrameSet::from_config(&config);
        let mut preloader = Preloader::new(retry);
        let requests = preloader.start(&frames, &config);
        (preloader, frames, requests)
    }

    fn no_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_loading_progress() {
        let mut progress = LoadingProgress::new();
        progress.reset(10);

        assert_eq!(progress.percent(), 0);
        assert!(!progress.complete());

        progress.loaded = 5;
        assert_eq!(progress.percent(), 50);

        progress.failed = 5;
        assert_eq!(progress.percent(), 100);
        assert!(progress.complete());
    }

    #[test]
    fn test_progress_floors() {
        let mut progress = LoadingProgress::new();
        progress.reset(192);
        progress.loaded = 1;
        assert_eq!(progress.percent(), 0);
        progress.loaded = 2;
        assert_eq!(progress.percent(), 1);
        progress.loaded = 191;
        assert_eq!(progress.percent(), 99);
        assert_eq!(progress.message(), "Loading Cinematic Experience... 99%");
    }

    #[test]
    fn test_requests_cover_every_frame() {
        let (preloader, _, requests) = setup(3, RetryPolicy::default());
        assert_eq!(preloader.phase(), LoadingPhase::Loading);
        let urls: Vec<_> = requests.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            ["/lambo/lambo_0001.jpg", "/lambo/lambo_0002.jpg", "/lambo/lambo_0003.jpg"]
        );
        assert!(requests.iter().all(|r| r.attempt == 0 && r.delay_ms == 0));
        assert_eq!(requests[0].timeout_ms, Some(15_000));
    }

    #[test]
    fn test_ready_fires_once_in_any_order() {
        let orders: [[usize; 4]; 3] = [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1]];
        for order in orders {
            let (mut preloader, mut frames, _) = setup(4, RetryPolicy::default());
            let mut ready_count = 0;
            let mut last_progress = 0;
            for &i in &order {
                let outcome = preloader.frame_loaded(&mut frames, i, i as u32, 100, 50);
                if outcome.is_ready() {
                    ready_count += 1;
                }
                let state = preloader.state();
                assert!(state.progress >= last_progress);
                last_progress = state.progress;
            }
            assert_eq!(ready_count, 1, "order {order:?}");
            assert_eq!(
                preloader.state(),
                PreloadState {
                    progress: 100,
                    is_loaded: true
                }
            );
            assert_eq!(preloader.phase(), LoadingPhase::Ready);
        }
    }

    #[test]
    fn test_duplicate_completion_does_not_double_count() {
        let (mut preloader, mut frames, _) = setup(2, RetryPolicy::default());
        preloader.frame_loaded(&mut frames, 0, 0, 10, 10);
        assert_eq!(
            preloader.frame_loaded(&mut frames, 0, 0, 10, 10),
            LoadOutcome::Ignored
        );
        assert_eq!(preloader.state().progress, 50);
        assert!(!preloader.state().is_loaded);
    }

    #[test]
    fn test_failure_is_retried_with_backoff() {
        let (mut preloader, mut frames, _) = setup(2, RetryPolicy::default());

        let LoadOutcome::Retry(first) = preloader.frame_failed(&mut frames, 1, "404") else {
            panic!("expected retry");
        };
        assert_eq!(first.attempt, 1);
        assert_eq!(first.delay_ms, 250);
        assert_eq!(first.url, "/lambo/lambo_0002.jpg");

        let LoadOutcome::Retry(second) = preloader.frame_failed(&mut frames, 1, "404") else {
            panic!("expected retry");
        };
        assert_eq!(second.delay_ms, 500);

        // A retry that succeeds counts normally
        preloader.frame_loaded(&mut frames, 0, 0, 10, 10);
        let outcome = preloader.frame_loaded(&mut frames, 1, 1, 10, 10);
        assert!(matches!(outcome, LoadOutcome::Ready(_)));
    }

    #[test]
    fn test_failed_frame_does_not_block_ready() {
        let (mut preloader, mut frames, _) = setup(3, no_retry());
        preloader.frame_loaded(&mut frames, 0, 0, 10, 10);

        let outcome = preloader.frame_failed(&mut frames, 1, "timed out");
        match outcome {
            LoadOutcome::Failed { error, state, ready } => {
                assert_eq!(error, PlayerError::image_load(1, "timed out"));
                assert_eq!(state.progress, 50);
                assert!(!ready);
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let outcome = preloader.frame_loaded(&mut frames, 2, 2, 10, 10);
        assert!(outcome.is_ready());
        assert!(preloader.state().is_loaded);
        assert_eq!(frames.count(FrameStatus::Failed), 1);
    }

    #[test]
    fn test_last_settled_frame_failing_fires_ready() {
        let (mut preloader, mut frames, _) = setup(2, no_retry());
        preloader.frame_loaded(&mut frames, 0, 0, 10, 10);
        let outcome = preloader.frame_failed(&mut frames, 1, "404");
        assert!(outcome.is_ready());
        assert_eq!(preloader.state().progress, 100);
    }

    #[test]
    fn test_all_frames_failing_still_finishes() {
        let (mut preloader, mut frames, _) = setup(2, no_retry());
        preloader.frame_failed(&mut frames, 0, "404");
        let outcome = preloader.frame_failed(&mut frames, 1, "404");
        assert!(outcome.is_ready());
        assert!(preloader.is_ready());
    }

    #[test]
    fn test_late_events_after_reset_are_ignored() {
        let (mut preloader, mut frames, _) = setup(1, RetryPolicy::default());
        preloader.reset();
        assert_eq!(preloader.phase(), LoadingPhase::Idle);
        assert_eq!(
            preloader.frame_loaded(&mut frames, 0, 0, 10, 10),
            LoadOutcome::Ignored
        );
        assert_eq!(
            preloader.frame_failed(&mut frames, 0, "late"),
            LoadOutcome::Ignored
        );
    }
}
