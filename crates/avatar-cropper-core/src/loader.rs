//! Asynchronous, cancellable image loading.
//!
//! Loading is split between the engine and its host:
//!
//! - The editor hands out a [`LoadRequest`] whenever the image reference
//!   changes. The request carries a [`CancelToken`].
//! - The host drives [`LoadRequest::run`] on whatever executor it has
//!   (`spawn_local` in the browser, a `LocalPool` in tests).
//! - The host passes the resulting [`LoadOutcome`] back to
//!   [`crate::Editor::finish_load`], which ignores it if the token was
//!   cancelled in the meantime.
//!
//! Network and file access go through the [`Fetch`] and [`FileBlob`] traits,
//! so this module never touches a platform API directly.
//!
//! # Source Paths
//!
//! - Data URLs are decoded inline; no fetch happens and the cross-origin
//!   policy is ignored
//! - Remote URLs are fetched with the configured cross-origin policy
//! - Files are read, embedded into a data URL and decoded from there

use std::cell::Cell;
use std::fmt;
use std::io::Cursor;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use exif::{In, Reader, Tag};
use futures::future::{FutureExt, LocalBoxFuture};
use image::{DynamicImage, ImageReader, RgbaImage};
use thiserror::Error;

use crate::geometry::Size;
use crate::options::{CrossOrigin, ImageSource};

/// Error types for image loading. Always reported via `on_load_failure`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    /// The remote image could not be fetched.
    #[error("Network error: {0}")]
    Network(String),

    /// The file source could not be read or was empty.
    #[error("Unreadable file: {0}")]
    UnreadableFile(String),

    /// The URL looked like a data URL but could not be parsed.
    #[error("Malformed data URL")]
    InvalidDataUrl,

    /// The bytes are not a decodable image.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The image decoded but has no area.
    #[error("Image has zero dimension ({width}x{height})")]
    ZeroDimension { width: u32, height: u32 },
}

/// Fetches remote image bytes for the loader.
pub trait Fetch {
    fn fetch(
        &self,
        url: &str,
        cross_origin: Option<CrossOrigin>,
    ) -> LocalBoxFuture<'static, Result<Vec<u8>, LoadError>>;
}

/// A binary file handed to the editor as an image source.
///
/// Identity matters: [`ImageSource`] compares files by pointer, so hosts
/// should wrap each distinct file handle exactly once.
pub trait FileBlob {
    /// MIME type used when embedding the file into a data URL.
    fn mime_type(&self) -> String;

    /// Read the whole file.
    fn read(&self) -> LocalBoxFuture<'static, Result<Vec<u8>, LoadError>>;
}

/// File source backed by bytes already in memory.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    mime_type: String,
    bytes: Rc<[u8]>,
}

impl MemoryFile {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }
}

impl FileBlob for MemoryFile {
    fn mime_type(&self) -> String {
        self.mime_type.clone()
    }

    fn read(&self) -> LocalBoxFuture<'static, Result<Vec<u8>, LoadError>> {
        let bytes = self.bytes.to_vec();
        async move { Ok(bytes) }.boxed_local()
    }
}

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// A decoded image with its intrinsic dimensions.
///
/// Cloning is cheap: the pixel buffer is shared. Every successful load
/// produces a new id, which surfaces can use to cache uploaded pixels.
#[derive(Clone)]
pub struct LoadedImage {
    id: u64,
    pixels: Rc<RgbaImage>,
}

impl LoadedImage {
    /// Wrap decoded pixels, rejecting images without area.
    pub fn from_rgba(pixels: RgbaImage) -> Result<Self, LoadError> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(LoadError::ZeroDimension { width, height });
        }
        Ok(Self {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
            pixels: Rc::new(pixels),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Intrinsic size in source pixels.
    pub fn intrinsic_size(&self) -> Size {
        Size::new(f64::from(self.width()), f64::from(self.height()))
    }

    /// RGBA pixel data in row-major order.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

impl fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedImage")
            .field("id", &self.id)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Shared cancellation flag for one load.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }

    /// Whether both tokens belong to the same load.
    pub fn same_load(&self, other: &CancelToken) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A load the host must drive to completion.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub token: CancelToken,
    pub source: ImageSource,
    pub cross_origin: Option<CrossOrigin>,
}

/// Completed load, ready to be handed back to the editor.
#[derive(Debug)]
pub struct LoadOutcome {
    pub token: CancelToken,
    pub result: Result<LoadedImage, LoadError>,
}

impl LoadRequest {
    /// Run the load. The decode is never aborted; cancellation only gates
    /// what the editor does with the outcome.
    pub fn run(self, fetcher: Rc<dyn Fetch>) -> LocalBoxFuture<'static, LoadOutcome> {
        async move {
            let result = load_image(self.source, self.cross_origin, fetcher).await;
            LoadOutcome {
                token: self.token,
                result,
            }
        }
        .boxed_local()
    }
}

/// Load and decode an image from `source`.
pub async fn load_image(
    source: ImageSource,
    cross_origin: Option<CrossOrigin>,
    fetcher: Rc<dyn Fetch>,
) -> Result<LoadedImage, LoadError> {
    match source {
        ImageSource::Url(url) if is_data_url(&url) => decode_image(&decode_data_url(&url)?),
        ImageSource::Url(url) => {
            let bytes = fetcher.fetch(&url, cross_origin).await?;
            decode_image(&bytes)
        }
        ImageSource::File(file) => {
            let bytes = file.read().await?;
            if bytes.is_empty() {
                return Err(LoadError::UnreadableFile("No image data".to_string()));
            }
            let url = to_data_url(&file.mime_type(), &bytes);
            decode_image(&decode_data_url(&url)?)
        }
    }
}

/// Whether `url` is an inline `data:` URL.
pub fn is_data_url(url: &str) -> bool {
    let url = url.trim_start();
    url.get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
        && url.contains(',')
}

/// Embed `bytes` into a base64 data URL.
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    let mime_type = if mime_type.is_empty() {
        "application/octet-stream"
    } else {
        mime_type
    };
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

/// Extract the payload bytes of a data URL.
///
/// Base64 payloads are decoded (whitespace tolerated); other payloads are
/// returned as raw bytes.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, LoadError> {
    if !is_data_url(url) {
        return Err(LoadError::InvalidDataUrl);
    }
    let (meta, payload) = url
        .trim()
        .split_once(',')
        .ok_or(LoadError::InvalidDataUrl)?;

    if meta.to_ascii_lowercase().ends_with(";base64") {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        BASE64
            .decode(compact)
            .map_err(|_| LoadError::InvalidDataUrl)
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

/// Decode image bytes into RGBA, applying EXIF orientation the way browsers
/// do for `<img>` elements.
pub fn decode_image(bytes: &[u8]) -> Result<LoadedImage, LoadError> {
    let orientation = extract_orientation(bytes);

    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| LoadError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| LoadError::Decode(e.to_string()))?;

    LoadedImage::from_rgba(apply_orientation(img, orientation).into_rgba8())
}

/// EXIF orientation tag value, 1 when absent.
fn extract_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    Reader::new()
        .read_from_container(&mut cursor)
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .unwrap_or(1)
}

fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
