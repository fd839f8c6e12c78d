//! Editor options, partial option patches and caller callbacks.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::geometry::Position;
use crate::loader::{FileBlob, LoadedImage};

/// Default mask diameter / side in logical pixels.
pub const DEFAULT_SIZE: f64 = 200.0;
/// Default upper zoom bound.
pub const DEFAULT_MAX_SCALE: f64 = 3.0;
/// Default translucent fill outside the mask.
pub const DEFAULT_MASK_COLOR: &str = "#000000aa";
/// Color used when a grid or border width is set without a color.
pub const DEFAULT_LINE_COLOR: &str = "#fff";
/// Width used when a grid or border color is set without a width.
pub const DEFAULT_LINE_WIDTH: f64 = 1.0;

/// Shape of the crop mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Rect,
    #[default]
    Circle,
}

/// Cross-origin policy applied to remote image fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrossOrigin {
    Anonymous,
    UseCredentials,
}

impl CrossOrigin {
    /// Attribute value as written in HTML.
    pub fn as_str(self) -> &'static str {
        match self {
            CrossOrigin::Anonymous => "anonymous",
            CrossOrigin::UseCredentials => "use-credentials",
        }
    }
}

/// Where the editor's image comes from.
#[derive(Clone)]
pub enum ImageSource {
    /// Remote or data URL.
    Url(String),
    /// In-memory file handed over by the host.
    File(Rc<dyn FileBlob>),
}

impl ImageSource {
    pub fn url(url: impl Into<String>) -> Self {
        ImageSource::Url(url.into())
    }

    pub fn file(file: impl FileBlob + 'static) -> Self {
        ImageSource::File(Rc::new(file))
    }

    /// Whether both sources refer to the same image.
    ///
    /// URLs compare by value. Files compare by identity: a new file handle is
    /// a different image even when its bytes are identical.
    pub fn same_reference(&self, other: &ImageSource) -> bool {
        match (self, other) {
            (ImageSource::Url(a), ImageSource::Url(b)) => a == b,
            (ImageSource::File(a), ImageSource::File(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Empty URLs do not trigger a load.
    pub fn is_empty(&self) -> bool {
        matches!(self, ImageSource::Url(url) if url.is_empty())
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Url(url) if url.len() > 64 => {
                let head: String = url.chars().take(64).collect();
                write!(f, "Url({head}...)")
            }
            ImageSource::Url(url) => write!(f, "Url({url})"),
            ImageSource::File(file) => write!(f, "File({})", file.mime_type()),
        }
    }
}

/// Caller-supplied callback, invoked synchronously by the editor.
pub struct Callback<T: ?Sized>(Rc<dyn Fn(&T)>);

impl<T: ?Sized> Callback<T> {
    pub fn new(f: impl Fn(&T) + 'static) -> Self {
        Callback(Rc::new(f))
    }

    pub fn call(&self, value: &T) {
        (self.0)(value)
    }
}

impl<T: ?Sized> Clone for Callback<T> {
    fn clone(&self) -> Self {
        Callback(Rc::clone(&self.0))
    }
}

impl<T: ?Sized> fmt::Debug for Callback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback")
    }
}

/// Resolved grid or border styling.
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub color: String,
    pub width: f64,
}

/// Full editor configuration.
#[derive(Debug, Clone)]
pub struct EditorOptions {
    pub shape: Shape,
    pub image: Option<ImageSource>,
    pub cross_origin: Option<CrossOrigin>,
    /// Mask diameter (circle) or side (rect) in logical pixels.
    pub size: f64,
    pub max_scale: f64,
    /// Mask center offset from the canvas center, logical pixels.
    pub position: Position,
    pub pixel_ratio: f64,
    pub mask_color: String,
    pub grid_color: Option<String>,
    pub grid_width: Option<f64>,
    pub border_color: Option<String>,
    pub border_width: Option<f64>,
    pub on_load_failure: Option<Callback<()>>,
    pub on_load_success: Option<Callback<LoadedImage>>,
    /// Controlled scale. When set, the editor only proposes new values.
    pub scale: Option<f64>,
    pub on_scale_change: Option<Callback<f64>>,
    /// Controlled offset. When set, the editor only proposes new values.
    pub offset: Option<Position>,
    pub on_offset_change: Option<Callback<Position>>,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            shape: Shape::default(),
            image: None,
            cross_origin: None,
            size: DEFAULT_SIZE,
            max_scale: DEFAULT_MAX_SCALE,
            position: Position::ORIGIN,
            pixel_ratio: 1.0,
            mask_color: DEFAULT_MASK_COLOR.to_string(),
            grid_color: None,
            grid_width: None,
            border_color: None,
            border_width: None,
            on_load_failure: None,
            on_load_success: None,
            scale: None,
            on_scale_change: None,
            offset: None,
            on_offset_change: None,
        }
    }
}

impl EditorOptions {
    /// Grid styling, enabled when either the color or the width is set.
    pub fn grid_style(&self) -> Option<LineStyle> {
        line_style(self.grid_color.as_deref(), self.grid_width)
    }

    /// Border styling, enabled when either the color or the width is set.
    pub fn border_style(&self) -> Option<LineStyle> {
        line_style(self.border_color.as_deref(), self.border_width)
    }

    /// Merge `patch` over these options. Fields absent from the patch are kept.
    pub fn merge(&mut self, patch: OptionsPatch) {
        fn apply<T>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }

        apply(&mut self.shape, patch.shape);
        apply(&mut self.image, patch.image);
        apply(&mut self.cross_origin, patch.cross_origin);
        apply(&mut self.size, patch.size);
        apply(&mut self.max_scale, patch.max_scale);
        apply(&mut self.position, patch.position);
        apply(&mut self.pixel_ratio, patch.pixel_ratio);
        apply(&mut self.mask_color, patch.mask_color);
        apply(&mut self.grid_color, patch.grid_color);
        apply(&mut self.grid_width, patch.grid_width);
        apply(&mut self.border_color, patch.border_color);
        apply(&mut self.border_width, patch.border_width);
        apply(&mut self.on_load_failure, patch.on_load_failure);
        apply(&mut self.on_load_success, patch.on_load_success);
        apply(&mut self.scale, patch.scale);
        apply(&mut self.on_scale_change, patch.on_scale_change);
        apply(&mut self.offset, patch.offset);
        apply(&mut self.on_offset_change, patch.on_offset_change);
    }
}

fn line_style(color: Option<&str>, width: Option<f64>) -> Option<LineStyle> {
    if color.is_none() && width.is_none() {
        return None;
    }
    Some(LineStyle {
        color: color.unwrap_or(DEFAULT_LINE_COLOR).to_string(),
        width: width.unwrap_or(DEFAULT_LINE_WIDTH),
    })
}

/// Partial update for [`EditorOptions`].
///
/// `None` keeps the current value. For nullable fields, `Some(None)` clears
/// the value, e.g. `scale: Some(None)` switches scale back to uncontrolled.
#[derive(Debug, Clone, Default)]
pub struct OptionsPatch {
    pub shape: Option<Shape>,
    pub image: Option<Option<ImageSource>>,
    pub cross_origin: Option<Option<CrossOrigin>>,
    pub size: Option<f64>,
    pub max_scale: Option<f64>,
    pub position: Option<Position>,
    pub pixel_ratio: Option<f64>,
    pub mask_color: Option<String>,
    pub grid_color: Option<Option<String>>,
    pub grid_width: Option<Option<f64>>,
    pub border_color: Option<Option<String>>,
    pub border_width: Option<Option<f64>>,
    pub on_load_failure: Option<Option<Callback<()>>>,
    pub on_load_success: Option<Option<Callback<LoadedImage>>>,
    pub scale: Option<Option<f64>>,
    pub on_scale_change: Option<Option<Callback<f64>>>,
    pub offset: Option<Option<Position>>,
    pub on_offset_change: Option<Option<Callback<Position>>>,
}

impl OptionsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn image(mut self, image: ImageSource) -> Self {
        self.image = Some(Some(image));
        self
    }

    pub fn cross_origin(mut self, policy: CrossOrigin) -> Self {
        self.cross_origin = Some(Some(policy));
        self
    }

    pub fn size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn max_scale(mut self, max_scale: f64) -> Self {
        self.max_scale = Some(max_scale);
        self
    }

    pub fn position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = Some(ratio);
        self
    }

    pub fn grid(mut self, color: &str, width: f64) -> Self {
        self.grid_color = Some(Some(color.to_string()));
        self.grid_width = Some(Some(width));
        self
    }

    pub fn border(mut self, color: &str, width: f64) -> Self {
        self.border_color = Some(Some(color.to_string()));
        self.border_width = Some(Some(width));
        self
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(Some(scale));
        self
    }

    pub fn offset(mut self, offset: Position) -> Self {
        self.offset = Some(Some(offset));
        self
    }

    pub fn on_load_success(mut self, f: impl Fn(&LoadedImage) + 'static) -> Self {
        self.on_load_success = Some(Some(Callback::new(f)));
        self
    }

    pub fn on_load_failure(mut self, f: impl Fn(&()) + 'static) -> Self {
        self.on_load_failure = Some(Some(Callback::new(f)));
        self
    }

    pub fn on_scale_change(mut self, f: impl Fn(&f64) + 'static) -> Self {
        self.on_scale_change = Some(Some(Callback::new(f)));
        self
    }

    pub fn on_offset_change(mut self, f: impl Fn(&Position) + 'static) -> Self {
        self.on_offset_change = Some(Some(Callback::new(f)));
        self
    }
}

impl From<OptionsPatch> for EditorOptions {
    fn from(patch: OptionsPatch) -> Self {
        let mut options = EditorOptions::default();
        options.merge(patch);
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryFile;
    use std::cell::Cell;

    #[test]
    fn test_defaults() {
        let options = EditorOptions::default();
        assert_eq!(options.shape, Shape::Circle);
        assert_eq!(options.size, 200.0);
        assert_eq!(options.max_scale, 3.0);
        assert_eq!(options.position, Position::ORIGIN);
        assert_eq!(options.pixel_ratio, 1.0);
        assert!(options.image.is_none());
        assert!(options.scale.is_none());
        assert!(options.offset.is_none());
    }

    #[test]
    fn test_line_style_enabled_by_either_half() {
        let mut options = EditorOptions::default();
        assert!(options.grid_style().is_none());

        options.grid_width = Some(2.0);
        assert_eq!(
            options.grid_style(),
            Some(LineStyle {
                color: "#fff".to_string(),
                width: 2.0
            })
        );

        options.border_color = Some("red".to_string());
        assert_eq!(
            options.border_style(),
            Some(LineStyle {
                color: "red".to_string(),
                width: 1.0
            })
        );
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let mut options: EditorOptions = OptionsPatch::new().size(300.0).scale(2.0).into();
        options.merge(OptionsPatch::new().shape(Shape::Rect));

        assert_eq!(options.size, 300.0);
        assert_eq!(options.scale, Some(2.0));
        assert_eq!(options.shape, Shape::Rect);
    }

    #[test]
    fn test_merge_clears_nullable_fields() {
        let mut options: EditorOptions = OptionsPatch::new().scale(2.0).into();
        options.merge(OptionsPatch {
            scale: Some(None),
            ..Default::default()
        });
        assert!(options.scale.is_none());
    }

    #[test]
    fn test_url_sources_compare_by_value() {
        let a = ImageSource::url("https://example.com/a.png");
        let b = ImageSource::url("https://example.com/a.png");
        let c = ImageSource::url("https://example.com/c.png");
        assert!(a.same_reference(&b));
        assert!(!a.same_reference(&c));
    }

    #[test]
    fn test_file_sources_compare_by_identity() {
        let a = ImageSource::file(MemoryFile::new("image/png", vec![1, 2, 3]));
        let b = ImageSource::file(MemoryFile::new("image/png", vec![1, 2, 3]));
        assert!(a.same_reference(&a.clone()));
        assert!(!a.same_reference(&b));
        assert!(!a.same_reference(&ImageSource::url("")));
    }

    #[test]
    fn test_empty_url() {
        assert!(ImageSource::url("").is_empty());
        assert!(!ImageSource::url("x.png").is_empty());
    }

    #[test]
    fn test_callback_invocation() {
        let hits = Rc::new(Cell::new(0.0));
        let sink = Rc::clone(&hits);
        let callback = Callback::new(move |scale: &f64| sink.set(*scale));

        callback.clone().call(&1.5);
        assert_eq!(hits.get(), 1.5);
    }

    #[test]
    fn test_cross_origin_attribute_values() {
        assert_eq!(CrossOrigin::UseCredentials.as_str(), "use-credentials");
        assert_eq!(CrossOrigin::Anonymous.as_str(), "anonymous");
    }
}
