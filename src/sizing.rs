//! Surface sizing and aspect-fit calculations.

/// Viewport size in CSS pixels plus the device pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl Viewport {
    /// Create a viewport. A missing or non-positive ratio is treated as 1.
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        let device_pixel_ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            device_pixel_ratio,
        }
    }

    /// Backing store size in device pixels (CSS size × ratio).
    ///
    /// ```rust
    /// use frameseq_scroll::Viewport;
    ///
    /// let viewport = Viewport::new(1280.0, 720.0, 2.0);
    /// assert_eq!(viewport.backing_size(), (2560, 1440));
    /// ```
    pub fn backing_size(&self) -> (u32, u32) {
        (
            (self.width * self.device_pixel_ratio) as u32,
            (self.height * self.device_pixel_ratio) as u32,
        )
    }

    /// Context transform `(a, b, c, d, e, f)` that keeps draw coordinates
    /// in CSS pixels.
    #[inline]
    pub fn transform(&self) -> [f64; 6] {
        let r = self.device_pixel_ratio;
        [r, 0.0, 0.0, r, 0.0, 0.0]
    }
}

/// Placement of an image on the surface, in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Scale an image to cover the surface, centered, cropping the overflow.
///
/// Images wider than the surface fill its height and are centered
/// horizontally; all others fill its width and are centered vertically.
/// Offsets go negative when the image overflows.
///
/// Returns `None` when any dimension is zero or not finite.
///
/// ## Example
///
/// ```rust
/// use frameseq_scroll::{cover_fit, DrawRect};
///
/// // A square image on a 2:1 surface fills the width and is cropped top and bottom
/// let rect = cover_fit(1000.0, 500.0, 400.0, 400.0).unwrap();
/// assert_eq!(rect, DrawRect { x: 0.0, y: -250.0, width: 1000.0, height: 1000.0 });
/// ```
pub fn cover_fit(
    surface_width: f64,
    surface_height: f64,
    image_width: f64,
    image_height: f64,
) -> Option<DrawRect> {
    let dims = [surface_width, surface_height, image_width, image_height];
    if dims.iter().any(|d| !d.is_finite() || *d <= 0.0) {
        return None;
    }

    let surface_aspect = surface_width / surface_height;
    let image_aspect = image_width / image_height;

    let rect = if image_aspect > surface_aspect {
        let height = surface_height;
        let width = height * image_aspect;
        DrawRect {
            x: (surface_width - width) / 2.0,
            y: 0.0,
            width,
            height,
        }
    } else {
        let width = surface_width;
        let height = width / image_aspect;
        DrawRect {
            x: 0.0,
            y: (surface_height - height) / 2.0,
            width,
            height,
        }
    };
    Some(rect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_image_fills_height() {
        // 16:9 image on a 4:3 surface
        let rect = cover_fit(800.0, 600.0, 1920.0, 1080.0).unwrap();
        assert_eq!(rect.height, 600.0);
        assert!((rect.width - 1066.666).abs() < 0.01);
        assert!((rect.x - (-133.333)).abs() < 0.01);
        assert_eq!(rect.y, 0.0);
    }

    #[test]
    fn tall_image_fills_width() {
        let rect = cover_fit(1000.0, 500.0, 400.0, 400.0).unwrap();
        assert_eq!(rect.x, 0.0);
        assert_eq!(rect.y, -250.0);
        assert_eq!(rect.width, 1000.0);
        assert_eq!(rect.height, 1000.0);
    }

    #[test]
    fn equal_aspect_takes_width_branch() {
        let rect = cover_fit(1920.0, 1080.0, 960.0, 540.0).unwrap();
        assert_eq!(rect, DrawRect { x: 0.0, y: 0.0, width: 1920.0, height: 1080.0 });
    }

    #[test]
    fn degenerate_dimensions() {
        assert!(cover_fit(0.0, 500.0, 10.0, 10.0).is_none());
        assert!(cover_fit(500.0, 500.0, 10.0, 0.0).is_none());
        assert!(cover_fit(f64::NAN, 500.0, 10.0, 10.0).is_none());
    }

    #[test]
    fn viewport_ratio_fallback() {
        let vp = Viewport::new(100.0, 50.0, 0.0);
        assert_eq!(vp.device_pixel_ratio, 1.0);
        assert_eq!(vp.backing_size(), (100, 50));

        let hidpi = Viewport::new(100.5, 50.0, 1.5);
        assert_eq!(hidpi.backing_size(), (150, 75));
        assert_eq!(hidpi.transform(), [1.5, 0.0, 0.0, 1.5, 0.0, 0.0]);
    }
}
