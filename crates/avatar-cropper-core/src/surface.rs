//! Abstract 2D drawing surface.
//!
//! The painter only talks to this trait. It mirrors the subset of the
//! immediate-mode canvas API the editor needs, so the browser binding is a
//! thin forwarding layer over `CanvasRenderingContext2d`.

use crate::error::SurfaceError;
use crate::geometry::Size;
use crate::loader::LoadedImage;

/// Fill rule used when filling the current path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

/// Compositing mode for subsequent draw calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeOp {
    /// Draw over existing content (the default).
    SourceOver,
    /// Keep existing content only where the new shape overlaps it.
    DestinationIn,
    /// Draw only behind existing content.
    DestinationOver,
}

impl CompositeOp {
    /// Name as used by `globalCompositeOperation`.
    pub fn as_str(self) -> &'static str {
        match self {
            CompositeOp::SourceOver => "source-over",
            CompositeOp::DestinationIn => "destination-in",
            CompositeOp::DestinationOver => "destination-over",
        }
    }
}

/// A drawable target with a settable backing pixel size.
///
/// `save`/`restore` must cover fill style, stroke style, line width and
/// composite operation, as on an HTML canvas.
pub trait Surface {
    /// Displayed size in logical (CSS) pixels.
    fn display_size(&self) -> Size;

    /// Backing store size in device pixels.
    fn backing_size(&self) -> (u32, u32);

    fn set_backing_size(&mut self, width: u32, height: u32);

    fn reset_transform(&mut self) -> Result<(), SurfaceError>;
    fn scale(&mut self, x: f64, y: f64) -> Result<(), SurfaceError>;
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    fn save(&mut self);
    fn restore(&mut self);

    fn begin_path(&mut self);
    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn arc(&mut self, x: f64, y: f64, radius: f64) -> Result<(), SurfaceError>;
    fn fill(&mut self, rule: FillRule);
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn stroke(&mut self);

    fn set_fill_style(&mut self, color: &str);
    fn set_stroke_style(&mut self, color: &str);
    fn set_line_width(&mut self, width: f64);
    fn set_composite_op(&mut self, op: CompositeOp) -> Result<(), SurfaceError>;

    /// Blit `image` scaled into the given destination rectangle.
    fn draw_image(
        &mut self,
        image: &LoadedImage,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), SurfaceError>;
}
