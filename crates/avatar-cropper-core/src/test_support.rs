//! Shared fixtures for unit tests: encoded images, fetchers and a surface
//! that records draw calls.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::Cursor;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::error::SurfaceError;
use crate::geometry::Size;
use crate::loader::{to_data_url, Fetch, LoadError, LoadedImage};
use crate::options::CrossOrigin;
use crate::surface::{CompositeOp, FillRule, Surface};

/// Encode a solid red PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn png_data_url(width: u32, height: u32) -> String {
    to_data_url("image/png", &png_bytes(width, height))
}

/// Decoded image without going through a codec.
pub fn loaded_image(width: u32, height: u32) -> LoadedImage {
    LoadedImage::from_rgba(RgbaImage::new(width, height)).unwrap()
}

/// Fetcher serving fixed responses and recording every request.
#[derive(Default)]
pub struct StaticFetch {
    responses: RefCell<HashMap<String, Vec<u8>>>,
    requests: RefCell<Vec<(String, Option<CrossOrigin>)>>,
}

impl StaticFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: &str, bytes: Vec<u8>) {
        self.responses.borrow_mut().insert(url.to_string(), bytes);
    }

    pub fn requests(&self) -> Vec<(String, Option<CrossOrigin>)> {
        self.requests.borrow().clone()
    }
}

impl Fetch for StaticFetch {
    fn fetch(
        &self,
        url: &str,
        cross_origin: Option<CrossOrigin>,
    ) -> LocalBoxFuture<'static, Result<Vec<u8>, LoadError>> {
        self.requests
            .borrow_mut()
            .push((url.to_string(), cross_origin));
        let response = self
            .responses
            .borrow()
            .get(url)
            .cloned()
            .ok_or_else(|| LoadError::Network(format!("404 {url}")));
        async move { response }.boxed_local()
    }
}

/// Fetcher whose responses resolve only when the test releases them.
#[derive(Default)]
pub struct GatedFetch {
    gates: RefCell<HashMap<String, oneshot::Sender<Result<Vec<u8>, LoadError>>>>,
}

impl GatedFetch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the pending fetch for `url`.
    pub fn release(&self, url: &str, response: Result<Vec<u8>, LoadError>) {
        let sender = self
            .gates
            .borrow_mut()
            .remove(url)
            .expect("no pending fetch for url");
        let _ = sender.send(response);
    }
}

impl Fetch for GatedFetch {
    fn fetch(
        &self,
        url: &str,
        _cross_origin: Option<CrossOrigin>,
    ) -> LocalBoxFuture<'static, Result<Vec<u8>, LoadError>> {
        let (sender, receiver) = oneshot::channel();
        self.gates.borrow_mut().insert(url.to_string(), sender);
        async move {
            receiver
                .await
                .unwrap_or_else(|_| Err(LoadError::Network("dropped".to_string())))
        }
        .boxed_local()
    }
}

/// One recorded surface call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    SetBackingSize(u32, u32),
    ResetTransform,
    Scale(f64, f64),
    ClearRect(f64, f64, f64, f64),
    Save,
    Restore,
    BeginPath,
    Rect(f64, f64, f64, f64),
    Arc(f64, f64, f64),
    Fill(FillRule),
    FillRect(f64, f64, f64, f64),
    Stroke,
    FillStyle(String),
    StrokeStyle(String),
    LineWidth(f64),
    Composite(CompositeOp),
    DrawImage {
        id: u64,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

/// Surface that records every call into a shared log.
#[derive(Clone)]
pub struct RecordingSurface {
    pub display: Rc<RefCell<Size>>,
    pub backing: Rc<RefCell<(u32, u32)>>,
    pub calls: Rc<RefCell<Vec<DrawCall>>>,
    /// Layout follows the backing store, like a canvas without a CSS size.
    pub intrinsic_layout: Rc<Cell<bool>>,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            display: Rc::new(RefCell::new(Size::new(width, height))),
            backing: Rc::new(RefCell::new((width as u32, height as u32))),
            calls: Rc::new(RefCell::new(Vec::new())),
            intrinsic_layout: Rc::new(Cell::new(false)),
        }
    }

    /// A surface whose displayed size is its backing size.
    pub fn intrinsic(width: u32, height: u32) -> Self {
        let surface = Self::new(f64::from(width), f64::from(height));
        surface.intrinsic_layout.set(true);
        surface
    }

    /// Drain the recorded calls.
    pub fn take(&self) -> Vec<DrawCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    /// Simulate the element being laid out at a new size.
    pub fn resize_display(&self, width: f64, height: f64) {
        *self.display.borrow_mut() = Size::new(width, height);
    }

    /// Recorded image draws.
    pub fn image_draws(&self) -> Vec<DrawCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, DrawCall::DrawImage { .. }))
            .cloned()
            .collect()
    }

    fn record(&self, call: DrawCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl Surface for RecordingSurface {
    fn display_size(&self) -> Size {
        *self.display.borrow()
    }

    fn backing_size(&self) -> (u32, u32) {
        *self.backing.borrow()
    }

    fn set_backing_size(&mut self, width: u32, height: u32) {
        *self.backing.borrow_mut() = (width, height);
        if self.intrinsic_layout.get() {
            self.resize_display(f64::from(width), f64::from(height));
        }
        self.record(DrawCall::SetBackingSize(width, height));
    }

    fn reset_transform(&mut self) -> Result<(), SurfaceError> {
        self.record(DrawCall::ResetTransform);
        Ok(())
    }

    fn scale(&mut self, x: f64, y: f64) -> Result<(), SurfaceError> {
        self.record(DrawCall::Scale(x, y));
        Ok(())
    }

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.record(DrawCall::ClearRect(x, y, width, height));
    }

    fn save(&mut self) {
        self.record(DrawCall::Save);
    }

    fn restore(&mut self) {
        self.record(DrawCall::Restore);
    }

    fn begin_path(&mut self) {
        self.record(DrawCall::BeginPath);
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.record(DrawCall::Rect(x, y, width, height));
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64) -> Result<(), SurfaceError> {
        if radius < 0.0 {
            return Err(SurfaceError(format!("negative radius {radius}")));
        }
        self.record(DrawCall::Arc(x, y, radius));
        Ok(())
    }

    fn fill(&mut self, rule: FillRule) {
        self.record(DrawCall::Fill(rule));
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.record(DrawCall::FillRect(x, y, width, height));
    }

    fn stroke(&mut self) {
        self.record(DrawCall::Stroke);
    }

    fn set_fill_style(&mut self, color: &str) {
        self.record(DrawCall::FillStyle(color.to_string()));
    }

    fn set_stroke_style(&mut self, color: &str) {
        self.record(DrawCall::StrokeStyle(color.to_string()));
    }

    fn set_line_width(&mut self, width: f64) {
        self.record(DrawCall::LineWidth(width));
    }

    fn set_composite_op(&mut self, op: CompositeOp) -> Result<(), SurfaceError> {
        self.record(DrawCall::Composite(op));
        Ok(())
    }

    fn draw_image(
        &mut self,
        image: &LoadedImage,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), SurfaceError> {
        self.record(DrawCall::DrawImage {
            id: image.id(),
            x,
            y,
            width,
            height,
        });
        Ok(())
    }
}
