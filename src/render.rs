//! Rendering of sequence frames onto a drawing surface.

use crate::{cover_fit, DrawRect, FrameSet, PlayerResult, Viewport};

/// A 2D drawing target.
///
/// Coordinates are CSS pixels; implementations scale to their backing store.
pub trait Surface {
    /// Image handle the surface can draw
    type Image;

    /// Size of the visible area in CSS pixels.
    fn client_size(&self) -> (f64, f64);

    /// Resize the backing store for a new viewport.
    fn resize(&mut self, viewport: Viewport) -> PlayerResult<()>;

    /// Clear the whole surface.
    fn clear(&mut self) -> PlayerResult<()>;

    /// Draw `image` scaled into `rect`.
    fn draw_image(&mut self, image: &Self::Image, rect: DrawRect) -> PlayerResult<()>;
}

/// Description of a completed draw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderedFrame {
    /// Frame that was asked for
    pub requested: usize,
    /// Frame actually drawn (differs when falling back from a failed frame)
    pub drawn: usize,
    /// Placement on the surface
    pub rect: DrawRect,
}

/// Compute the placement of a frame without drawing it.
///
/// Returns the index of the frame that would be drawn along with its
/// cover-fit rectangle, or `None` when nothing is drawable yet.
pub fn plan_frame<I>(frames: &FrameSet<I>, index: usize, client_size: (f64, f64)) -> Option<(usize, DrawRect)> {
    let (drawn, frame) = frames.drawable(index)?;
    let (w, h) = frame.natural_size()?;
    let rect = cover_fit(client_size.0, client_size.1, w as f64, h as f64)?;
    Some((drawn, rect))
}

/// Draws frames and counts the draws it makes.
#[derive(Clone, Debug, Default)]
pub struct RenderEngine {
    draw_count: u64,
}

impl RenderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames drawn so far.
    #[inline]
    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }

    /// Clear the surface and draw the frame at `index`.
    ///
    /// Returns `Ok(None)` when the frame is not drawable yet or the surface
    /// is unavailable; those cases skip the draw. Other surface errors are
    /// returned.
    pub fn render<S: Surface>(&mut self, surface: &mut S, frames: &FrameSet<S::Image>, index: usize) -> PlayerResult<Option<RenderedFrame>> {
        let Some((drawn, rect)) = plan_frame(frames, index, surface.client_size()) else {
            tracing::trace!(index, "frame not drawable yet");
            return Ok(None);
        };
        let Some(image) = frames.get(drawn).and_then(|f| f.image()) else {
            return Ok(None);
        };

        match surface.clear().and_then(|_| surface.draw_image(image, rect)) {
            Ok(()) => {}
            Err(err) if err.is_skippable() => {
                tracing::warn!(%err, index, "skipping draw");
                return Ok(None);
            }
            Err(err) => return Err(err),
        }

        self.draw_count += 1;
        if drawn != index {
            tracing::debug!(index, drawn, "drew fallback for failed frame");
        }
        Ok(Some(RenderedFrame {
            requested: index,
            drawn,
            rect,
        }))
    }
}

/// Web-specific rendering implementation.
#[cfg(feature = "web")]
pub mod web {
    use super::*;
    use crate::PlayerError;
    use wasm_bindgen::JsCast;
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

    /// A canvas with a device-pixel-ratio aware backing store.
    #[derive(Clone, Debug)]
    pub struct CanvasSurface {
        canvas: HtmlCanvasElement,
        context: Option<CanvasRenderingContext2d>,
        transform: [f64; 6],
    }

    impl CanvasSurface {
        /// Wrap a canvas. A missing 2d context is tolerated; draws are
        /// skipped until one is available.
        pub fn new(canvas: HtmlCanvasElement) -> Self {
            let context = context_2d(&canvas).ok();
            Self {
                canvas,
                context,
                transform: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            }
        }

        pub fn canvas(&self) -> &HtmlCanvasElement {
            &self.canvas
        }

        fn context(&mut self) -> PlayerResult<&CanvasRenderingContext2d> {
            if self.context.is_none() {
                let context = context_2d(&self.canvas)?;
                // A late context has not seen the last resize
                let [a, b, c, d, e, f] = self.transform;
                context
                    .set_transform(a, b, c, d, e, f)
                    .map_err(|_| PlayerError::draw("Failed to set transform"))?;
                self.context = Some(context);
            }
            self.context
                .as_ref()
                .ok_or_else(|| PlayerError::surface_unavailable("No 2d context available"))
        }
    }

    fn context_2d(canvas: &HtmlCanvasElement) -> PlayerResult<CanvasRenderingContext2d> {
        canvas
            .get_context("2d")
            .map_err(|_| PlayerError::surface_unavailable("Failed to get 2d context"))?
            .ok_or_else(|| PlayerError::surface_unavailable("No 2d context available"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| PlayerError::surface_unavailable("Failed to cast to CanvasRenderingContext2d"))
    }

    impl Surface for CanvasSurface {
        type Image = HtmlImageElement;

        fn client_size(&self) -> (f64, f64) {
            (self.canvas.client_width() as f64, self.canvas.client_height() as f64)
        }

        fn resize(&mut self, viewport: Viewport) -> PlayerResult<()> {
            let (width, height) = viewport.backing_size();
            self.canvas.set_width(width);
            self.canvas.set_height(height);

            let style = self.canvas.style();
            style
                .set_property("width", &format!("{}px", viewport.width))
                .map_err(|_| PlayerError::draw("Failed to set canvas width"))?;
            style
                .set_property("height", &format!("{}px", viewport.height))
                .map_err(|_| PlayerError::draw("Failed to set canvas height"))?;

            // Resizing the canvas resets its transform
            self.transform = viewport.transform();
            let [a, b, c, d, e, f] = self.transform;
            match self.context() {
                Ok(context) => context
                    .set_transform(a, b, c, d, e, f)
                    .map_err(|_| PlayerError::draw("Failed to set transform")),
                Err(err) if err.is_skippable() => {
                    tracing::warn!(%err, "canvas resized without a 2d context");
                    Ok(())
                }
                Err(err) => Err(err),
            }
        }

        fn clear(&mut self) -> PlayerResult<()> {
            let (width, height) = (self.canvas.width() as f64, self.canvas.height() as f64);
            self.context()?.clear_rect(0.0, 0.0, width, height);
            Ok(())
        }

        fn draw_image(&mut self, image: &HtmlImageElement, rect: DrawRect) -> PlayerResult<()> {
            self.context()?
                .draw_image_with_html_image_element_and_dw_and_dh(image, rect.x, rect.y, rect.width, rect.height)
                .map_err(|_| PlayerError::draw("Failed to draw frame image"))
        }
    }
}
