//! Speedometer intro shown before the page content.
//!
//! The gauge sweeps from rest to top speed while the gear indicator and the
//! arc color follow the needle. When the exit animation has finished the
//! timeline reports completion once, which unlocks page scrolling.

/// Automatic gear shown for a speed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gear {
    Park,
    Drive,
    Low,
    Sport,
}

impl Gear {
    /// Letter shown on the gauge
    pub fn symbol(self) -> char {
        match self {
            Gear::Park => 'P',
            Gear::Drive => 'D',
            Gear::Low => 'L',
            Gear::Sport => 'S',
        }
    }
}

/// Maps a normalized needle position (0.0 - 1.0) to speed, gear and color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedGauge {
    /// Speed shown at full deflection
    pub top_speed: f64,
}

impl Default for SpeedGauge {
    fn default() -> Self {
        Self { top_speed: 355.0 }
    }
}

impl SpeedGauge {
    /// Displayed speed, rounded.
    pub fn real_speed(&self, value: f64) -> u32 {
        (clamp_unit(value) * self.top_speed).round() as u32
    }

    /// ```rust
    /// use frameseq_scroll::{Gear, SpeedGauge};
    ///
    /// let gauge = SpeedGauge::default();
    /// assert_eq!(gauge.gear(0.0), Gear::Park);
    /// assert_eq!(gauge.gear(0.1), Gear::Drive); // 36
    /// assert_eq!(gauge.gear(0.2), Gear::Low);   // 71
    /// assert_eq!(gauge.gear(1.0), Gear::Sport); // 355
    /// ```
    pub fn gear(&self, value: f64) -> Gear {
        match self.real_speed(value) {
            0 => Gear::Park,
            1..=50 => Gear::Drive,
            51..=100 => Gear::Low,
            _ => Gear::Sport,
        }
    }

    /// Arc color: white through green to red.
    pub fn color(&self, value: f64) -> (u8, u8, u8) {
        let v = clamp_unit(value);
        let ch = |base: f64, delta: f64, t: f64| (base + (delta * t).round()) as u8;
        if v < 0.5 {
            let t = v * 2.0;
            (ch(255.0, -233.0, t), 255, ch(255.0, -255.0, t))
        } else {
            let t = (v - 0.5) * 2.0;
            (ch(34.0, 221.0, t), ch(197.0, -153.0, t), ch(94.0, -94.0, t))
        }
    }

    /// Arc color as a CSS `rgb(r,g,b)` string.
    pub fn css_color(&self, value: f64) -> String {
        let (r, g, b) = self.color(value);
        format!("rgb({r},{g},{b})")
    }
}

#[inline]
fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Symmetric quadratic ease.
fn ease_in_out_quad(t: f64) -> f64 {
    let t = clamp_unit(t);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Intro phases in playback order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntroPhase {
    /// Title, logo and gauge fade in
    Reveal,
    /// Needle sweeps to top speed
    Sweep,
    /// Pause at top speed
    Hold,
    /// Elements fade out and the panel collapses
    Exit,
    /// Short delay before completion is signalled
    Settle,
    /// Done; the page may scroll
    Complete,
}

/// Phase durations in seconds.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IntroTimings {
    pub reveal: f64,
    pub sweep: f64,
    pub hold: f64,
    pub exit: f64,
    pub settle: f64,
}

impl Default for IntroTimings {
    fn default() -> Self {
        Self {
            reveal: 4.2,
            sweep: 8.0,
            hold: 0.6,
            exit: 1.3,
            settle: 0.2,
        }
    }
}

impl IntroTimings {
    /// Total running time.
    pub fn total(&self) -> f64 {
        self.reveal + self.sweep + self.hold + self.exit + self.settle
    }
}

/// State of the intro after a time step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntroTick {
    pub phase: IntroPhase,
    /// Needle position 0.0 - 1.0
    pub gauge: f64,
    pub speed: u32,
    pub gear: Gear,
    pub color: (u8, u8, u8),
    /// True on the single tick that finished the intro
    pub completed: bool,
}

/// Time-driven intro sequence.
///
/// The caller advances it from its frame loop; it keeps no clock itself.
#[derive(Clone, Debug)]
pub struct IntroTimeline {
    timings: IntroTimings,
    gauge: SpeedGauge,
    elapsed: f64,
    completion_fired: bool,
    cancelled: bool,
}

impl Default for IntroTimeline {
    fn default() -> Self {
        Self::new(IntroTimings::default(), SpeedGauge::default())
    }
}

impl IntroTimeline {
    pub fn new(timings: IntroTimings, gauge: SpeedGauge) -> Self {
        Self {
            timings,
            gauge,
            elapsed: 0.0,
            completion_fired: false,
            cancelled: false,
        }
    }

    /// Phase at the current time.
    pub fn phase(&self) -> IntroPhase {
        if self.cancelled {
            return IntroPhase::Complete;
        }
        let t = &self.timings;
        let mut end = t.reveal;
        if self.elapsed < end {
            return IntroPhase::Reveal;
        }
        end += t.sweep;
        if self.elapsed < end {
            return IntroPhase::Sweep;
        }
        end += t.hold;
        if self.elapsed < end {
            return IntroPhase::Hold;
        }
        end += t.exit;
        if self.elapsed < end {
            return IntroPhase::Exit;
        }
        end += t.settle;
        if self.elapsed < end {
            return IntroPhase::Settle;
        }
        IntroPhase::Complete
    }

    /// Needle position at the current time.
    pub fn gauge_value(&self) -> f64 {
        match self.phase() {
            IntroPhase::Reveal => 0.0,
            IntroPhase::Sweep => {
                if self.timings.sweep <= 0.0 {
                    1.0
                } else {
                    ease_in_out_quad((self.elapsed - self.timings.reveal) / self.timings.sweep)
                }
            }
            _ => 1.0,
        }
    }

    /// Advance by `dt` seconds.
    pub fn advance(&mut self, dt: f64) -> IntroTick {
        if dt.is_finite() && dt > 0.0 && !self.cancelled {
            self.elapsed += dt;
        }
        let phase = self.phase();
        let completed = phase == IntroPhase::Complete && !self.completion_fired && !self.cancelled;
        if completed {
            self.completion_fired = true;
            tracing::debug!(elapsed = self.elapsed, "intro complete");
        }
        let gauge = self.gauge_value();
        IntroTick {
            phase,
            gauge,
            speed: self.gauge.real_speed(gauge),
            gear: self.gauge.gear(gauge),
            color: self.gauge.color(gauge),
            completed,
        }
    }

    /// Page scrolling stays locked while the intro runs.
    #[inline]
    pub fn scroll_locked(&self) -> bool {
        self.phase() != IntroPhase::Complete
    }

    /// Stop early (teardown). Completion is not signalled.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gear_thresholds() {
        let gauge = SpeedGauge { top_speed: 100.0 };
        assert_eq!(gauge.gear(0.004), Gear::Park);
        assert_eq!(gauge.gear(0.01), Gear::Drive);
        assert_eq!(gauge.gear(0.5), Gear::Drive);
        assert_eq!(gauge.gear(0.51), Gear::Low);
        assert_eq!(gauge.gear(1.0), Gear::Low);
        assert_eq!(SpeedGauge::default().gear(0.29), Gear::Sport);
        assert_eq!(Gear::Sport.symbol(), 'S');
    }

    #[test]
    fn color_ramp_endpoints() {
        let gauge = SpeedGauge::default();
        assert_eq!(gauge.color(0.0), (255, 255, 255));
        assert_eq!(gauge.color(0.5), (34, 197, 94));
        assert_eq!(gauge.color(1.0), (255, 44, 0));
        assert_eq!(gauge.css_color(0.0), "rgb(255,255,255)");
        assert_eq!(gauge.color(0.25), (138, 255, 127));
    }

    #[test]
    fn timeline_phases() {
        let mut intro = IntroTimeline::default();
        assert_eq!(intro.advance(1.0).phase, IntroPhase::Reveal);
        assert!(intro.scroll_locked());

        let tick = intro.advance(3.2 + 4.0);
        assert_eq!(tick.phase, IntroPhase::Sweep);
        assert!((tick.gauge - 0.5).abs() < 1e-9);

        let tick = intro.advance(4.1);
        assert_eq!(tick.phase, IntroPhase::Hold);
        assert_eq!(tick.gauge, 1.0);
        assert_eq!(tick.speed, 355);
        assert_eq!(tick.gear, Gear::Sport);

        assert_eq!(intro.advance(0.6).phase, IntroPhase::Exit);
    }

    #[test]
    fn completion_fires_once() {
        let mut intro = IntroTimeline::default();
        let mut completions = 0;
        for _ in 0..200 {
            if intro.advance(0.1).completed {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);
        assert!(!intro.scroll_locked());
        assert!(intro.elapsed() >= IntroTimings::default().total());
    }

    #[test]
    fn cancel_unlocks_without_completion() {
        let mut intro = IntroTimeline::default();
        intro.advance(2.0);
        intro.cancel();
        assert!(!intro.scroll_locked());
        assert!(!intro.advance(100.0).completed);
        assert_eq!(intro.elapsed(), 2.0);
    }
}
