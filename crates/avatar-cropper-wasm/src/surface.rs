//! `Surface` implementation over an HTML canvas.
//!
//! Every call forwards to `CanvasRenderingContext2d`. Decoded images are
//! uploaded once into an offscreen canvas and blitted from there, keyed by
//! the image id.

use avatar_cropper_core::geometry::Size;
use avatar_cropper_core::loader::LoadedImage;
use avatar_cropper_core::surface::{CompositeOp, FillRule, Surface};
use avatar_cropper_core::SurfaceError;
use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, CanvasWindingRule, HtmlCanvasElement, ImageData};

/// Map a JS exception to a surface error.
pub(crate) fn surface_error(err: JsValue) -> SurfaceError {
    SurfaceError(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

/// Full circle, used for the circular mask.
const FULL_TURN: f64 = std::f64::consts::PI * 2.0;

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    /// Offscreen copy of the last drawn image.
    cached: Option<(u64, HtmlCanvasElement)>,
}

impl CanvasSurface {
    /// Bind to `canvas`'s 2D context.
    ///
    /// # Errors
    ///
    /// Returns `Err` when the canvas has no 2D context (e.g. it already
    /// holds a WebGL context).
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, SurfaceError> {
        let ctx = canvas
            .get_context("2d")
            .map_err(surface_error)?
            .ok_or_else(|| SurfaceError("2d context unavailable".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| SurfaceError("unexpected context type".to_string()))?;

        Ok(Self {
            canvas,
            ctx,
            cached: None,
        })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    /// Offscreen canvas holding `image`'s pixels, uploading it on first use.
    fn source_for(&mut self, image: &LoadedImage) -> Result<&HtmlCanvasElement, SurfaceError> {
        let stale = self
            .cached
            .as_ref()
            .map_or(true, |(id, _)| *id != image.id());
        if stale {
            let canvas = upload(image)?;
            self.cached = Some((image.id(), canvas));
        }

        self.cached
            .as_ref()
            .map(|(_, canvas)| canvas)
            .ok_or_else(|| SurfaceError("image cache empty".to_string()))
    }
}

/// Copy decoded RGBA pixels into a fresh offscreen canvas.
fn upload(image: &LoadedImage) -> Result<HtmlCanvasElement, SurfaceError> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| SurfaceError("no document".to_string()))?;

    let canvas = document
        .create_element("canvas")
        .map_err(surface_error)?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| SurfaceError("failed to create canvas".to_string()))?;
    canvas.set_width(image.width());
    canvas.set_height(image.height());

    let ctx = canvas
        .get_context("2d")
        .map_err(surface_error)?
        .ok_or_else(|| SurfaceError("2d context unavailable".to_string()))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(|_| SurfaceError("unexpected context type".to_string()))?;

    let data = ImageData::new_with_u8_clamped_array_and_sh(
        Clamped(image.pixels().as_raw().as_slice()),
        image.width(),
        image.height(),
    )
    .map_err(surface_error)?;
    ctx.put_image_data(&data, 0.0, 0.0).map_err(surface_error)?;

    Ok(canvas)
}

impl Surface for CanvasSurface {
    fn display_size(&self) -> Size {
        Size::new(
            f64::from(self.canvas.client_width()),
            f64::from(self.canvas.client_height()),
        )
    }

    fn backing_size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn set_backing_size(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }

    fn reset_transform(&mut self) -> Result<(), SurfaceError> {
        self.ctx.reset_transform().map_err(surface_error)
    }

    fn scale(&mut self, x: f64, y: f64) -> Result<(), SurfaceError> {
        self.ctx.scale(x, y).map_err(surface_error)
    }

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.clear_rect(x, y, width, height);
    }

    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn begin_path(&mut self) {
        self.ctx.begin_path();
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.rect(x, y, width, height);
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64) -> Result<(), SurfaceError> {
        self.ctx
            .arc(x, y, radius, 0.0, FULL_TURN)
            .map_err(surface_error)
    }

    fn fill(&mut self, rule: FillRule) {
        let rule = match rule {
            FillRule::NonZero => CanvasWindingRule::Nonzero,
            FillRule::EvenOdd => CanvasWindingRule::Evenodd,
        };
        self.ctx.fill_with_canvas_winding_rule(rule);
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.fill_rect(x, y, width, height);
    }

    fn stroke(&mut self) {
        self.ctx.stroke();
    }

    fn set_fill_style(&mut self, color: &str) {
        self.ctx.set_fill_style_str(color);
    }

    fn set_stroke_style(&mut self, color: &str) {
        self.ctx.set_stroke_style_str(color);
    }

    fn set_line_width(&mut self, width: f64) {
        self.ctx.set_line_width(width);
    }

    fn set_composite_op(&mut self, op: CompositeOp) -> Result<(), SurfaceError> {
        self.ctx
            .set_global_composite_operation(op.as_str())
            .map_err(surface_error)
    }

    fn draw_image(
        &mut self,
        image: &LoadedImage,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), SurfaceError> {
        let source = self.source_for(image)?.clone();
        self.ctx
            .draw_image_with_html_canvas_element_and_dw_and_dh(&source, x, y, width, height)
            .map_err(surface_error)
    }
}
