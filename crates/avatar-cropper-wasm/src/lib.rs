//! Avatar Cropper WASM - WebAssembly bindings for the avatar cropper
//!
//! This crate binds `avatar-cropper-core` to the browser: a canvas-backed
//! drawing surface, `fetch`/`File` based image loading, and the
//! `AvatarEditor` class that wires DOM events to the editor.
//!
//! # Module Structure
//!
//! - `editor` - The `AvatarEditor` class and its DOM subscriptions
//! - `options` - JS options object parsing
//! - `surface` - `CanvasRenderingContext2d` drawing surface
//! - `fetch` - Remote and file image sources
//!
//! # Usage
//!
//! ```typescript
//! import init, { AvatarEditor } from 'avatar-cropper-wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const editor = new AvatarEditor(canvas, { image: url, maxScale: 4 });
//! editor.setOptions({ shape: 'rect' });
//! // ...
//! editor.destroy();
//! ```

use wasm_bindgen::prelude::*;

mod editor;
mod fetch;
mod options;
mod surface;

pub use editor::AvatarEditor;
pub use fetch::{BrowserFetch, BrowserFile};
pub use surface::CanvasSurface;

/// Initialize the WASM module (called automatically on load).
///
/// Routes panics and `log` records to the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    // A second init (e.g. hot reload) keeps the first logger
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
