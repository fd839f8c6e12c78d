//! Crop geometry state machine.
//!
//! Owns the loaded image, the current scale and offset, and enforces the
//! geometry invariants:
//!
//! - `1 <= scale <= max_scale`
//! - `|offset.axis| <= bounds.axis`, with bounds recomputed from the applied
//!   scale and the mask size
//!
//! A controlled offset is kept as the caller supplied it and clamped on
//! read, so a value given before the image loads applies once it does.
//!
//! Scale and offset can each be owned by the editor or by the caller
//! (controlled mode). See [`Ownership`].

use crate::error::EditorError;
use crate::geometry::{
    clamp, clamp2, compute_bounds, cover_fit, crop_rect, scale_size, CropGeometry, CropRect,
    Position, Size,
};
use crate::loader::{LoadError, LoadedImage};
use crate::options::{Callback, EditorOptions};

/// Image lifecycle of the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// No image loaded and none in flight.
    NoImage,
    /// A load is in flight.
    Loading,
    /// An image is decoded and geometry is valid.
    Ready,
}

/// Who owns a geometry value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ownership<T> {
    /// The editor stores and mutates the value itself.
    Owned(T),
    /// The caller owns the value and feeds it back through options.
    ///
    /// `applied` is the value last supplied by the caller, unclamped for the
    /// offset; `reported` is the
    /// value last proposed through the change callback, which is the base
    /// for the next gesture.
    External { applied: T, reported: T },
}

impl<T: Copy> Ownership<T> {
    fn controlled(value: T) -> Self {
        Ownership::External {
            applied: value,
            reported: value,
        }
    }

    /// The value geometry and painting use.
    pub fn applied(&self) -> T {
        match *self {
            Ownership::Owned(value) => value,
            Ownership::External { applied, .. } => applied,
        }
    }

    /// Starting point for the next delta.
    fn base(&self) -> T {
        match *self {
            Ownership::Owned(value) => value,
            Ownership::External { reported, .. } => reported,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Ownership::External { .. })
    }
}

/// Result of applying a gesture delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Update<T> {
    /// Clamped proposed value.
    pub value: T,
    /// Whether the proposal differs from the previous value.
    pub changed: bool,
    /// Whether internal geometry changed, i.e. a repaint is needed.
    pub committed: bool,
}

/// Reject option combinations the geometry cannot work with.
pub fn validate(options: &EditorOptions) -> Result<(), EditorError> {
    if !options.max_scale.is_finite() || options.max_scale < 1.0 {
        return Err(EditorError::InvalidMaxScale(options.max_scale));
    }
    if !options.size.is_finite() || options.size <= 0.0 {
        return Err(EditorError::InvalidSize(options.size));
    }
    if !options.pixel_ratio.is_finite() || options.pixel_ratio <= 0.0 {
        return Err(EditorError::InvalidPixelRatio(options.pixel_ratio));
    }
    Ok(())
}

/// Scale, offset and image metadata.
#[derive(Debug, Clone)]
pub struct CropState {
    phase: LoadPhase,
    image: Option<LoadedImage>,
    /// Cover-fit size of the image at scale 1.
    cover_size: Size,
    mask_size: f64,
    max_scale: f64,
    scale: Ownership<f64>,
    offset: Ownership<Position>,
}

impl Default for CropState {
    fn default() -> Self {
        Self {
            phase: LoadPhase::NoImage,
            image: None,
            cover_size: Size::default(),
            mask_size: crate::options::DEFAULT_SIZE,
            max_scale: crate::options::DEFAULT_MAX_SCALE,
            scale: Ownership::Owned(1.0),
            offset: Ownership::Owned(Position::ORIGIN),
        }
    }
}

impl CropState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        self.image.as_ref()
    }

    pub fn scale(&self) -> Ownership<f64> {
        self.scale
    }

    pub fn offset(&self) -> Ownership<Position> {
        self.offset
    }

    /// Applied scale and offset, the offset clamped to the current bounds.
    pub fn geometry(&self) -> CropGeometry {
        CropGeometry {
            scale: self.scale.applied(),
            offset: self.clamped_offset(),
        }
    }

    fn clamped_offset(&self) -> Position {
        clamp2(self.offset.applied(), self.bounds())
    }

    /// Rendered image size in logical pixels at the applied scale.
    pub fn render_size(&self) -> Size {
        scale_size(self.cover_size, self.scale.applied())
    }

    /// Current offset bounds.
    pub fn bounds(&self) -> Position {
        compute_bounds(self.render_size(), self.mask_size)
    }

    /// Visible source region, once an image is loaded.
    pub fn crop(&self) -> Option<CropRect> {
        self.image
            .as_ref()
            .map(|_| crop_rect(self.render_size(), self.mask_size, self.clamped_offset()))
    }

    /// Re-derive geometry after an options merge.
    ///
    /// Scale is resolved first so an owned offset is clamped against the new
    /// bounds. A controlled offset is stored as given.
    pub fn configure(&mut self, options: &EditorOptions) {
        self.mask_size = options.size;
        self.max_scale = options.max_scale;

        let clamp_scale = |value: f64| clamp(value, 1.0, options.max_scale);
        self.scale = match options.scale {
            Some(value) => Ownership::controlled(clamp_scale(value)),
            None => Ownership::Owned(clamp_scale(self.scale.applied())),
        };

        if let Some(cover) = self
            .image
            .as_ref()
            .and_then(|image| cover_fit(image.intrinsic_size(), options.size))
        {
            self.cover_size = cover;
        }

        self.offset = match options.offset {
            Some(value) => Ownership::controlled(value),
            None => Ownership::Owned(self.clamped_offset()),
        };
    }

    /// A new load is in flight.
    pub fn begin_loading(&mut self) {
        self.phase = LoadPhase::Loading;
    }

    /// Install a freshly decoded image, replacing any previous one.
    pub fn set_image(&mut self, image: LoadedImage) -> Result<(), LoadError> {
        let cover = cover_fit(image.intrinsic_size(), self.mask_size).ok_or(
            LoadError::ZeroDimension {
                width: image.width(),
                height: image.height(),
            },
        )?;

        self.cover_size = cover;
        self.image = Some(image);
        self.phase = LoadPhase::Ready;

        if let Ownership::Owned(_) = self.offset {
            self.offset = Ownership::Owned(self.clamped_offset());
        }
        Ok(())
    }

    /// The in-flight load failed. A previously loaded image stays in place.
    pub fn load_failed(&mut self) {
        self.phase = if self.image.is_some() {
            LoadPhase::Ready
        } else {
            LoadPhase::NoImage
        };
    }

    /// Pan by a normalized `delta`.
    ///
    /// Fires `on_change` when the clamped proposal differs from the previous
    /// value; commits only when the offset is owned.
    pub fn apply_offset_delta(
        &mut self,
        delta: Position,
        on_change: Option<&Callback<Position>>,
    ) -> Update<Position> {
        let base = self.offset.base();
        let value = clamp2(base + delta, self.bounds());
        let changed = value != base;

        if changed {
            if let Some(callback) = on_change {
                callback.call(&value);
            }
        }

        let committed = match &mut self.offset {
            Ownership::Owned(current) => {
                let committed = *current != value;
                *current = value;
                committed
            }
            Ownership::External { reported, .. } => {
                *reported = value;
                false
            }
        };

        Update {
            value,
            changed,
            committed,
        }
    }

    /// Zoom by `delta`, then re-validate the offset against the new scale.
    pub fn apply_scale_delta(
        &mut self,
        delta: f64,
        on_scale_change: Option<&Callback<f64>>,
        on_offset_change: Option<&Callback<Position>>,
    ) -> Update<f64> {
        let base = self.scale.base();
        let value = clamp(base + delta, 1.0, self.max_scale);
        let changed = value != base;

        if changed {
            if let Some(callback) = on_scale_change {
                callback.call(&value);
            }
        }

        let committed = match &mut self.scale {
            Ownership::Owned(current) => {
                let committed = *current != value;
                *current = value;
                committed
            }
            Ownership::External { reported, .. } => {
                *reported = value;
                false
            }
        };

        let offset = self.apply_offset_delta(Position::ORIGIN, on_offset_change);

        Update {
            value,
            changed,
            committed: committed || offset.committed,
        }
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
