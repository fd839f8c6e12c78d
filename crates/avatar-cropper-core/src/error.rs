//! Error types for editor configuration and rendering.
//!
//! Load failures have their own type, [`crate::loader::LoadError`], because
//! they never escape the editor: they are reported through the
//! `on_load_failure` callback instead.

use thiserror::Error;

/// Failure reported by a drawing surface.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Surface error: {0}")]
pub struct SurfaceError(pub String);

/// Errors surfaced to the caller of the editor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditorError {
    /// The editor was constructed without a drawing surface.
    #[error("Canvas element is required")]
    MissingSurface,

    /// `max_scale` is below 1 or not a finite number.
    #[error("Invalid max scale: {0} (must be a finite number >= 1)")]
    InvalidMaxScale(f64),

    /// Mask `size` is zero, negative or not a finite number.
    #[error("Invalid mask size: {0} (must be a finite number > 0)")]
    InvalidSize(f64),

    /// `pixel_ratio` is zero, negative or not a finite number.
    #[error("Invalid pixel ratio: {0} (must be a finite number > 0)")]
    InvalidPixelRatio(f64),

    /// The drawing surface rejected a paint operation.
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}
