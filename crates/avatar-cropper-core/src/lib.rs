//! Avatar Cropper Core - Crop engine for the avatar cropper widget
//!
//! This crate provides the platform-independent part of the cropper: crop
//! geometry, image loading, gesture handling and painting against an abstract
//! drawing surface. The browser binding lives in `avatar-cropper-wasm`.
//!
//! # Module Structure
//!
//! - `geometry` - Cover fit, offset bounds and crop rectangle math
//! - `options` - Editor options, option patches and callbacks
//! - `loader` - Cancellable image loading and decoding (EXIF-aware)
//! - `state` - Scale/offset state machine with controlled mode
//! - `interaction` - Wheel and pointer-drag gesture translation
//! - `surface` - The drawing surface trait
//! - `painter` - Mask, grid, border and image rendering
//! - `editor` - The editor tying everything together

pub mod editor;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod loader;
pub mod options;
pub mod painter;
pub mod state;
pub mod surface;

#[cfg(test)]
mod test_support;

pub use editor::Editor;
pub use error::{EditorError, SurfaceError};
pub use geometry::{CropGeometry, CropRect, Position, Size};
pub use interaction::ListenerChange;
pub use loader::{
    CancelToken, Fetch, FileBlob, LoadError, LoadOutcome, LoadRequest, LoadedImage, MemoryFile,
};
pub use options::{Callback, CrossOrigin, EditorOptions, ImageSource, OptionsPatch, Shape};
pub use state::LoadPhase;
pub use surface::{CompositeOp, FillRule, Surface};
