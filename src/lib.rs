//! # frameseq-scroll
//!
//! Scroll-synchronized image-sequence playback for canvas surfaces.
//!
//! This crate provides platform-agnostic data structures and logic for:
//! - Preloading a numbered image sequence with progress and a one-shot ready signal
//! - Mapping scroll progress to frames and coalescing redraws
//! - Cover-fit placement on a device-pixel-ratio aware surface
//! - Fading an overlay over the start of the scroll range
//! - The speedometer intro that gates the page
//!
//! ## Features
//!
//! - `serde` - Enable serialization/deserialization for configuration
//! - `toml` - Load configuration from a `sequence.toml` string
//! - `web` - Enable web/WASM canvas rendering support
//!
//! ## Example
//!
//! ```rust,ignore
//! use frameseq_scroll::{SequenceConfig, SequencePlayer, Viewport};
//!
//! let mut player = SequencePlayer::new(SequenceConfig::default(), surface)?;
//! for request in player.mount(Viewport::new(1280.0, 720.0, 2.0))? {
//!     fetch(request); // report back via frame_loaded / frame_failed
//! }
//!
//! // From the host's scroll handler
//! if player.scroll_progress(progress).request_paint {
//!     request_animation_frame(|| player.paint());
//! }
//! ```

mod animation;
mod config;
mod data;
mod error;
pub mod intro;
mod lifecycle;
pub mod loader;
pub mod player;
pub mod render;
mod sizing;

pub use animation::{
    frame_for_progress, OverlayFade, OverlayStyle, PinnedRange, PlaybackCursor, RedrawSlot,
    ScrollAdapter, ScrollUpdate, ScrubSmoother,
};
pub use config::{OverlayConfig, RetryPolicy, SequenceConfig};
pub use data::{Frame, FrameSet, FrameStatus};
pub use error::{PlayerError, PlayerResult};
pub use intro::{Gear, IntroPhase, IntroTick, IntroTimeline, IntroTimings, SpeedGauge};
pub use lifecycle::HandleScope;
pub use loader::{FrameRequest, LoadOutcome, LoadingPhase, LoadingProgress, PreloadState, Preloader};
pub use player::{MountState, ResizeOutcome, SequencePlayer};
pub use render::{plan_frame, RenderEngine, RenderedFrame, Surface};
pub use sizing::{cover_fit, DrawRect, Viewport};

#[cfg(feature = "web")]
pub use player::web::WebPlayer;
#[cfg(feature = "web")]
pub use render::web::CanvasSurface;
