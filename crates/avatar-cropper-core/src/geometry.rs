//! Pure geometry helpers for the crop engine.
//!
//! # Coordinate System
//!
//! - Sizes are in logical (CSS) pixels unless noted otherwise
//! - Offsets are normalized: a fraction of the rendered image size, where
//!   `(0, 0)` centers the image under the mask
//! - Crop rectangles are normalized (0.0 to 1.0) relative to the intrinsic
//!   image dimensions, origin top-left

use serde::{Deserialize, Serialize};

/// A 2D value: either a normalized offset or a point in logical pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Width divided by height.
    ///
    /// Returns `None` for zero or non-finite dimensions, which have no usable
    /// aspect ratio.
    pub fn aspect_ratio(&self) -> Option<f64> {
        let ratio = self.width / self.height;
        (self.width > 0.0 && self.height > 0.0 && ratio.is_finite()).then_some(ratio)
    }
}

/// Crop geometry as applied by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropGeometry {
    /// Zoom factor in `[1, max_scale]`.
    pub scale: f64,
    /// Normalized pan offset.
    pub offset: Position,
}

impl Default for CropGeometry {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Position::ORIGIN,
        }
    }
}

/// Region of the intrinsic image visible through the mask.
///
/// All fields are normalized (0.0 to 1.0) relative to the intrinsic image
/// dimensions, so a caller can crop the source at any resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Bound `value` to `[min, max]`. Callers guarantee `min <= max`.
#[inline]
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Clamp each axis of `value` into `[-range.axis, range.axis]`.
pub fn clamp2(value: Position, range: Position) -> Position {
    Position {
        x: clamp(value.x, -range.x, range.x),
        y: clamp(value.y, -range.y, range.y),
    }
}

/// Multiply both dimensions by `factor`.
pub fn scale_size(size: Size, factor: f64) -> Size {
    Size {
        width: size.width * factor,
        height: size.height * factor,
    }
}

/// Smallest size that covers a `target` square while preserving the aspect
/// ratio of `intrinsic`.
///
/// Landscape images get `target` height; portrait and square images get
/// `target` width. Returns `None` when `intrinsic` has a zero or non-finite
/// dimension.
pub fn cover_fit(intrinsic: Size, target: f64) -> Option<Size> {
    let ratio = intrinsic.aspect_ratio()?;

    let size = if ratio > 1.0 {
        Size::new(target * ratio, target)
    } else {
        Size::new(target, target / ratio)
    };
    Some(size)
}

/// Maximum offset magnitude per axis that keeps the mask fully covered.
///
/// `(render - mask) / (2 * render)` per axis. Axes where the image does not
/// exceed the mask are pinned to zero.
pub fn compute_bounds(render_size: Size, mask_size: f64) -> Position {
    let axis = |render: f64| {
        if render <= 0.0 {
            return 0.0;
        }
        ((render - mask_size) / (2.0 * render)).max(0.0)
    };

    Position {
        x: axis(render_size.width),
        y: axis(render_size.height),
    }
}

/// Normalized source region shown through a `mask_size` mask when the image
/// is rendered at `render_size` and panned by `offset`.
pub fn crop_rect(render_size: Size, mask_size: f64, offset: Position) -> CropRect {
    let width = (mask_size / render_size.width).min(1.0);
    let height = (mask_size / render_size.height).min(1.0);

    CropRect {
        left: clamp(0.5 - offset.x - width / 2.0, 0.0, 1.0 - width),
        top: clamp(0.5 - offset.y - height / 2.0, 0.0, 1.0 - height),
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_clamp_inside_and_outside() {
        assert_eq!(clamp(0.5, 0.0, 1.0), 0.5);
        assert_eq!(clamp(-3.0, 0.0, 1.0), 0.0);
        assert_eq!(clamp(7.0, 0.0, 1.0), 1.0);
    }

    #[test]
    fn test_clamp2_symmetric_range() {
        let clamped = clamp2(Position::new(0.4, -0.4), Position::new(0.25, 0.1));
        assert_eq!(clamped, Position::new(0.25, -0.1));
    }

    #[test]
    fn test_clamp2_zero_range_pins_axis() {
        let clamped = clamp2(Position::new(0.3, 0.3), Position::new(0.0, 0.5));
        assert_eq!(clamped, Position::new(0.0, 0.3));
    }

    #[test]
    fn test_cover_fit_landscape() {
        let size = cover_fit(Size::new(400.0, 200.0), 200.0).unwrap();
        assert_eq!(size, Size::new(400.0, 200.0));
    }

    #[test]
    fn test_cover_fit_portrait() {
        let size = cover_fit(Size::new(300.0, 600.0), 100.0).unwrap();
        assert_eq!(size, Size::new(100.0, 200.0));
    }

    #[test]
    fn test_cover_fit_square() {
        let size = cover_fit(Size::new(300.0, 300.0), 200.0).unwrap();
        assert_eq!(size, Size::new(200.0, 200.0));
    }

    #[test]
    fn test_cover_fit_rejects_zero_dimension() {
        assert!(cover_fit(Size::new(0.0, 100.0), 200.0).is_none());
        assert!(cover_fit(Size::new(100.0, 0.0), 200.0).is_none());
    }

    #[test]
    fn test_cover_fit_extreme_aspect() {
        // 10000:1 panorama still covers without overflow
        let size = cover_fit(Size::new(10_000.0, 1.0), 200.0).unwrap();
        assert_eq!(size.height, 200.0);
        assert_eq!(size.width, 2_000_000.0);

        let size = cover_fit(Size::new(1.0, 10_000.0), 200.0).unwrap();
        assert_eq!(size.width, 200.0);
        assert_eq!(size.height, 2_000_000.0);
    }

    #[test]
    fn test_scale_size() {
        assert_eq!(
            scale_size(Size::new(200.0, 100.0), 1.5),
            Size::new(300.0, 150.0)
        );
    }

    #[test]
    fn test_bounds_landscape_scenario() {
        // 400x200 image under a 200px mask
        let bounds = compute_bounds(Size::new(400.0, 200.0), 200.0);
        assert!(approx(bounds.x, 0.25));
        assert_eq!(bounds.y, 0.0);
    }

    #[test]
    fn test_bounds_square_at_scale_one() {
        let bounds = compute_bounds(Size::new(200.0, 200.0), 200.0);
        assert_eq!(bounds, Position::ORIGIN);
    }

    #[test]
    fn test_bounds_image_smaller_than_mask_is_pinned() {
        let bounds = compute_bounds(Size::new(100.0, 50.0), 200.0);
        assert_eq!(bounds, Position::ORIGIN);
    }

    #[test]
    fn test_bounds_zero_render_size() {
        let bounds = compute_bounds(Size::new(0.0, 0.0), 200.0);
        assert_eq!(bounds, Position::ORIGIN);
    }

    #[test]
    fn test_crop_rect_centered() {
        let rect = crop_rect(Size::new(400.0, 200.0), 200.0, Position::ORIGIN);
        assert!(approx(rect.left, 0.25));
        assert!(approx(rect.top, 0.0));
        assert!(approx(rect.width, 0.5));
        assert!(approx(rect.height, 1.0));
    }

    #[test]
    fn test_crop_rect_at_bounds_touches_edges() {
        let render = Size::new(400.0, 200.0);
        let bounds = compute_bounds(render, 200.0);

        // Positive offset moves the image right, so the crop shows the left edge
        let rect = crop_rect(render, 200.0, bounds);
        assert!(approx(rect.left, 0.0));

        let rect = crop_rect(render, 200.0, Position::new(-bounds.x, 0.0));
        assert!(approx(rect.left + rect.width, 1.0));
    }

    #[test]
    fn test_aspect_ratio_non_finite() {
        assert!(Size::new(f64::INFINITY, 1.0).aspect_ratio().is_none());
        assert!(Size::new(f64::NAN, 1.0).aspect_ratio().is_none());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for intrinsic image dimensions, including very wide and tall.
    fn intrinsic_strategy() -> impl Strategy<Value = Size> {
        (1.0f64..=20_000.0, 1.0f64..=20_000.0).prop_map(|(w, h)| Size::new(w, h))
    }

    proptest! {
        /// Property: clamp never leaves the range.
        #[test]
        fn prop_clamp_within_range(
            value in -1e6f64..=1e6,
            min in -100.0f64..=0.0,
            span in 0.0f64..=200.0,
        ) {
            let max = min + span;
            let result = clamp(value, min, max);
            prop_assert!(result >= min && result <= max);
        }

        /// Property: cover fit always covers the target square.
        #[test]
        fn prop_cover_fit_covers_target(
            intrinsic in intrinsic_strategy(),
            target in 1.0f64..=2000.0,
        ) {
            let size = cover_fit(intrinsic, target).unwrap();
            prop_assert!(size.width >= target - 1e-6);
            prop_assert!(size.height >= target - 1e-6);
            // One side matches the target exactly
            prop_assert!(size.width == target || size.height == target);
        }

        /// Property: re-fitting a fitted size keeps the original aspect ratio.
        #[test]
        fn prop_cover_fit_preserves_aspect_ratio(
            intrinsic in intrinsic_strategy(),
            first in 1.0f64..=2000.0,
            second in 1.0f64..=2000.0,
        ) {
            let original = intrinsic.aspect_ratio().unwrap();
            let fitted = cover_fit(intrinsic, first).unwrap();
            let refitted = cover_fit(fitted, second).unwrap();
            let ratio = refitted.aspect_ratio().unwrap();
            prop_assert!(((ratio - original) / original).abs() < 1e-9);
        }

        /// Property: clamped offsets stay within bounds for any scale.
        #[test]
        fn prop_clamped_offset_within_bounds(
            intrinsic in intrinsic_strategy(),
            mask in 10.0f64..=1000.0,
            scale in 1.0f64..=5.0,
            x in -2.0f64..=2.0,
            y in -2.0f64..=2.0,
        ) {
            let render = scale_size(cover_fit(intrinsic, mask).unwrap(), scale);
            let bounds = compute_bounds(render, mask);
            let offset = clamp2(Position::new(x, y), bounds);

            prop_assert!(bounds.x >= 0.0 && bounds.y >= 0.0);
            prop_assert!(offset.x.abs() <= bounds.x);
            prop_assert!(offset.y.abs() <= bounds.y);
        }

        /// Property: the crop rectangle never leaves the image.
        #[test]
        fn prop_crop_rect_inside_image(
            intrinsic in intrinsic_strategy(),
            mask in 10.0f64..=1000.0,
            scale in 1.0f64..=5.0,
            x in -2.0f64..=2.0,
            y in -2.0f64..=2.0,
        ) {
            let render = scale_size(cover_fit(intrinsic, mask).unwrap(), scale);
            let offset = clamp2(Position::new(x, y), compute_bounds(render, mask));
            let rect = crop_rect(render, mask, offset);

            prop_assert!(rect.left >= -1e-9 && rect.top >= -1e-9);
            prop_assert!(rect.left + rect.width <= 1.0 + 1e-9);
            prop_assert!(rect.top + rect.height <= 1.0 + 1e-9);
        }
    }
}
