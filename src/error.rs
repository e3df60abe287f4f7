//! Error type shared by the player components.

pub type PlayerResult<T> = Result<T, PlayerError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("frame {index} failed to load: {reason}")]
    ImageLoad { index: usize, reason: String },

    #[error("drawing surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("draw failed: {0}")]
    Draw(String),

    #[error("player has been unmounted")]
    Unmounted,
}

impl PlayerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn image_load(index: usize, reason: impl Into<String>) -> Self {
        Self::ImageLoad {
            index,
            reason: reason.into(),
        }
    }

    pub fn surface_unavailable(msg: impl Into<String>) -> Self {
        Self::SurfaceUnavailable(msg.into())
    }

    pub fn draw(msg: impl Into<String>) -> Self {
        Self::Draw(msg.into())
    }

    /// Errors the render path treats as a skipped draw rather than a failure.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::SurfaceUnavailable(_))
    }
}
