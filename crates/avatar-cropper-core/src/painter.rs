//! Rendering: draws the mask, grid, border and image onto a [`Surface`].
//!
//! Draw order per frame:
//! 1. Clear the backing store
//! 2. Scale by the pixel ratio (logical pixels from here on)
//! 3. Rule-of-thirds grid, cut to the mask shape with `destination-in`
//! 4. Translucent mask over the whole canvas with the shape cut out (even-odd)
//! 5. Border around the shape
//! 6. Image behind everything with `destination-over`, so it only shows
//!    through the cutout
//!
//! The painter reads state and writes pixels. It never mutates editor state.

use crate::error::SurfaceError;
use crate::geometry::{Position, Size};
use crate::loader::LoadedImage;
use crate::options::{EditorOptions, Shape};
use crate::surface::{CompositeOp, FillRule, Surface};

/// The image as it should appear this frame.
#[derive(Debug, Clone, Copy)]
pub struct PlacedImage<'a> {
    pub image: &'a LoadedImage,
    /// Rendered size in logical pixels.
    pub render_size: Size,
    /// Clamped normalized offset.
    pub offset: Position,
}

/// Everything needed to paint one frame.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub options: &'a EditorOptions,
    /// Canvas size in logical pixels.
    pub logical_size: Size,
    pub image: Option<PlacedImage<'a>>,
}

impl Scene<'_> {
    /// Mask center: canvas center plus the configured position.
    pub fn mask_center(&self) -> Position {
        Position::new(
            self.logical_size.width / 2.0 + self.options.position.x,
            self.logical_size.height / 2.0 + self.options.position.y,
        )
    }
}

/// Top-left corner of the image for a normalized `offset`.
pub fn image_origin(offset: Position, render_size: Size, mask_center: Position) -> Position {
    Position::new(
        (offset.x - 0.5) * render_size.width + mask_center.x,
        (offset.y - 0.5) * render_size.height + mask_center.y,
    )
}

/// Paint a full frame.
///
/// # Errors
///
/// Returns `Err` if the surface rejects a call (e.g. an invalid radius).
pub fn paint<S: Surface + ?Sized>(surface: &mut S, scene: &Scene<'_>) -> Result<(), SurfaceError> {
    let options = scene.options;
    let center = scene.mask_center();
    let (backing_w, backing_h) = surface.backing_size();

    surface.reset_transform()?;
    surface.clear_rect(0.0, 0.0, f64::from(backing_w), f64::from(backing_h));
    surface.scale(options.pixel_ratio, options.pixel_ratio)?;

    if let Some(grid) = options.grid_style() {
        let size = options.size;
        let thirds = size / 3.0;

        surface.save();
        surface.set_fill_style(&grid.color);
        // vertical bars
        surface.fill_rect(center.x - thirds * 0.5, center.y - thirds * 1.5, grid.width, size);
        surface.fill_rect(center.x + thirds * 0.5, center.y - thirds * 1.5, grid.width, size);
        // horizontal bars
        surface.fill_rect(center.x - thirds * 1.5, center.y - thirds * 0.5, size, grid.width);
        surface.fill_rect(center.x - thirds * 1.5, center.y + thirds * 0.5, size, grid.width);

        surface.set_composite_op(CompositeOp::DestinationIn)?;
        surface.begin_path();
        mask_path(surface, options.shape, center, size)?;
        surface.fill(FillRule::NonZero);
        surface.restore();
    }

    surface.save();
    surface.set_fill_style(&options.mask_color);
    surface.begin_path();
    mask_path(surface, options.shape, center, options.size)?;
    surface.rect(0.0, 0.0, scene.logical_size.width, scene.logical_size.height);
    surface.fill(FillRule::EvenOdd);
    surface.restore();

    if let Some(border) = options.border_style() {
        surface.save();
        surface.set_stroke_style(&border.color);
        surface.set_line_width(border.width);
        surface.begin_path();
        mask_path(surface, options.shape, center, options.size)?;
        surface.stroke();
        surface.restore();
    }

    if let Some(placed) = scene.image {
        let origin = image_origin(placed.offset, placed.render_size, center);
        surface.save();
        surface.set_composite_op(CompositeOp::DestinationOver)?;
        surface.draw_image(
            placed.image,
            origin.x,
            origin.y,
            placed.render_size.width,
            placed.render_size.height,
        )?;
        surface.restore();
    }

    Ok(())
}

/// Append the mask outline to the current path.
fn mask_path<S: Surface + ?Sized>(
    surface: &mut S,
    shape: Shape,
    center: Position,
    size: f64,
) -> Result<(), SurfaceError> {
    match shape {
        Shape::Rect => {
            surface.rect(center.x - size / 2.0, center.y - size / 2.0, size, size);
            Ok(())
        }
        Shape::Circle => surface.arc(center.x, center.y, size / 2.0),
    }
}
