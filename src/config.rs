//! Player configuration.
//!
//! Every field has a default matching the stock 192-frame sequence, so a
//! config file only needs to name what differs. With the `toml` feature the
//! config can be read from a `sequence.toml` string.

use crate::error::{PlayerError, PlayerResult};

/// Where frame images live and how their file names are built.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SequenceConfig {
    /// Number of frames in the sequence
    pub frame_count: usize,
    /// Number used in the file name of the first frame
    pub first_frame_index: u32,
    /// Directory (or URL prefix) holding the frames, including trailing slash
    pub base_path: String,
    /// File name prefix before the frame number
    pub prefix: String,
    /// File extension without the dot
    pub extension: String,
    /// Zero-padding width of the frame number
    pub pad_width: usize,
    /// Scroll units the pinned region spends on each frame
    pub scroll_units_per_frame: f64,
    /// Seconds the displayed progress takes to catch up with the scroll position
    pub scrub_seconds: f64,
    pub overlay: OverlayConfig,
    pub retry: RetryPolicy,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            frame_count: 192,
            first_frame_index: 1,
            base_path: "/lambo/".to_string(),
            prefix: "lambo_".to_string(),
            extension: "jpg".to_string(),
            pad_width: 4,
            scroll_units_per_frame: 20.0,
            scrub_seconds: 1.0,
            overlay: OverlayConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl SequenceConfig {
    /// Parse a `sequence.toml` string and validate the result.
    #[cfg(feature = "toml")]
    pub fn from_toml_str(s: &str) -> PlayerResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| PlayerError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values the player relies on.
    pub fn validate(&self) -> PlayerResult<()> {
        if self.frame_count == 0 {
            return Err(PlayerError::config("frame_count must be at least 1"));
        }
        if self.pad_width == 0 {
            return Err(PlayerError::config("pad_width must be at least 1"));
        }
        if self.extension.is_empty() {
            return Err(PlayerError::config("extension must not be empty"));
        }
        if !self.scroll_units_per_frame.is_finite() || self.scroll_units_per_frame <= 0.0 {
            return Err(PlayerError::config(
                "scroll_units_per_frame must be a positive number",
            ));
        }
        if !self.scrub_seconds.is_finite() || self.scrub_seconds < 0.0 {
            return Err(PlayerError::config("scrub_seconds must not be negative"));
        }
        self.overlay.validate()
    }

    /// Build the source path for a frame, e.g. `/lambo/lambo_0001.jpg`.
    ///
    /// `index` is the position in the sequence; the file number is offset by
    /// `first_frame_index`.
    ///
    /// ```rust
    /// use frameseq_scroll::SequenceConfig;
    ///
    /// let config = SequenceConfig::default();
    /// assert_eq!(config.frame_path(0), "/lambo/lambo_0001.jpg");
    /// assert_eq!(config.frame_path(191), "/lambo/lambo_0192.jpg");
    /// ```
    pub fn frame_path(&self, index: usize) -> String {
        let number = u64::from(self.first_frame_index) + index as u64;
        format!(
            "{}{}{:0width$}.{}",
            self.base_path,
            self.prefix,
            number,
            self.extension,
            width = self.pad_width
        )
    }

    /// Scroll extent of the pinned region.
    #[inline]
    pub fn pinned_extent(&self) -> f64 {
        self.frame_count as f64 * self.scroll_units_per_frame
    }
}

/// Fade/translate applied to the overlay over the start of the traversal.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OverlayConfig {
    /// Fraction of the traversal (0.0 - 1.0) over which the overlay fades out
    pub fade_end: f64,
    /// Vertical offset in CSS pixels reached when the fade completes
    pub translate_y: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            fade_end: 0.3,
            translate_y: -50.0,
        }
    }
}

impl OverlayConfig {
    fn validate(&self) -> PlayerResult<()> {
        if !self.fade_end.is_finite() || self.fade_end <= 0.0 || self.fade_end > 1.0 {
            return Err(PlayerError::config("overlay.fade_end must be in (0, 1]"));
        }
        if !self.translate_y.is_finite() {
            return Err(PlayerError::config("overlay.translate_y must be finite"));
        }
        Ok(())
    }
}

/// What to do when a frame fails to load or stalls.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RetryPolicy {
    /// Extra attempts after the first failure before the frame is skipped
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each following one
    pub base_delay_ms: u32,
    /// Per-attempt timeout; `None` waits forever
    pub load_timeout_ms: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 250,
            load_timeout_ms: Some(15_000),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> u32 {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay_ms.saturating_mul(1 << shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = SequenceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pinned_extent(), 3840.0);
    }

    #[test]
    fn frame_paths_are_zero_padded() {
        let config = SequenceConfig {
            base_path: "frames/".into(),
            prefix: "shot_".into(),
            extension: "webp".into(),
            first_frame_index: 0,
            pad_width: 3,
            ..Default::default()
        };
        assert_eq!(config.frame_path(0), "frames/shot_000.webp");
        assert_eq!(config.frame_path(42), "frames/shot_042.webp");
        assert_eq!(config.frame_path(1234), "frames/shot_1234.webp");
    }

    #[test]
    fn rejects_empty_sequence() {
        let config = SequenceConfig {
            frame_count: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PlayerError::Config(_))));
    }

    #[test]
    fn rejects_bad_overlay_range() {
        for fade_end in [0.0, -0.1, 1.5, f64::NAN] {
            let config = SequenceConfig {
                overlay: OverlayConfig {
                    fade_end,
                    ..Default::default()
                },
                ..Default::default()
            };
            assert!(config.validate().is_err(), "fade_end {fade_end} accepted");
        }
    }

    #[test]
    fn rejects_negative_scrub() {
        let config = SequenceConfig {
            scrub_seconds: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn retry_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), 250);
        assert_eq!(policy.delay_for(2), 500);
        assert_eq!(policy.delay_for(3), 1000);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn parses_partial_toml() {
        let config = SequenceConfig::from_toml_str(
            r#"
            frame_count = 48
            base_path = "/seq/"

            [overlay]
            fade_end = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.frame_count, 48);
        assert_eq!(config.base_path, "/seq/");
        assert_eq!(config.prefix, "lambo_");
        assert_eq!(config.overlay.fade_end, 0.5);
        assert_eq!(config.overlay.translate_y, -50.0);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn toml_values_are_validated() {
        assert!(SequenceConfig::from_toml_str("frame_count = 0").is_err());
        assert!(SequenceConfig::from_toml_str("frame_count = \"many\"").is_err());
    }
}
