//! The editor: one owned record tying options, crop state, gestures and the
//! drawing surface together.
//!
//! The editor does no I/O. Image loads are returned to the host as
//! [`LoadRequest`]s; the host drives them and hands the result back through
//! [`Editor::finish_load`]. Superseded or post-destroy outcomes are dropped
//! there, before any state is touched.

use log::{debug, warn};

use crate::error::EditorError;
use crate::geometry::{CropGeometry, CropRect, Size};
use crate::interaction::{wheel_step, DragController, ListenerChange};
use crate::loader::{CancelToken, LoadError, LoadOutcome, LoadRequest, LoadedImage};
use crate::options::{EditorOptions, ImageSource, OptionsPatch};
use crate::painter::{paint, PlacedImage, Scene};
use crate::state::{validate, CropState, LoadPhase};
use crate::surface::Surface;

/// Interactive crop editor bound to one drawing surface.
pub struct Editor<S: Surface> {
    surface: S,
    options: EditorOptions,
    state: CropState,
    drag: DragController,
    /// Surface size in CSS pixels.
    logical_size: Size,
    /// Display size seen after the last backing store write.
    measured_size: Size,
    /// Token of the load in flight, if any.
    pending: Option<CancelToken>,
    destroyed: bool,
}

impl<S: Surface> Editor<S> {
    /// Create an editor and paint the first frame.
    ///
    /// Returns the initial image load when `options.image` is set.
    ///
    /// # Errors
    ///
    /// - [`EditorError::MissingSurface`] when `surface` is `None`
    /// - a validation error for out-of-range options
    /// - a surface error from the first paint
    pub fn new(
        surface: Option<S>,
        options: EditorOptions,
    ) -> Result<(Self, Option<LoadRequest>), EditorError> {
        let surface = surface.ok_or(EditorError::MissingSurface)?;
        validate(&options)?;

        let logical_size = surface.display_size();
        let mut editor = Self {
            surface,
            options,
            state: CropState::new(),
            drag: DragController::new(),
            logical_size,
            measured_size: logical_size,
            pending: None,
            destroyed: false,
        };

        editor.sync_backing_size();
        editor.state.configure(&editor.options);

        let request = match editor.options.image.clone() {
            Some(source) if !source.is_empty() => Some(editor.begin_load(source)),
            _ => None,
        };

        editor.repaint()?;
        Ok((editor, request))
    }

    /// Merge `patch` into the current options.
    ///
    /// A different image reference starts a new load and supersedes any load
    /// in flight. Clearing the image keeps the current one.
    ///
    /// # Errors
    ///
    /// Invalid options are rejected and leave the editor unchanged.
    pub fn set_options(&mut self, patch: OptionsPatch) -> Result<Option<LoadRequest>, EditorError> {
        if self.destroyed {
            return Ok(None);
        }

        let mut next = self.options.clone();
        next.merge(patch);
        validate(&next)?;

        let new_image = match (&self.options.image, &next.image) {
            (_, None) => None,
            (_, Some(source)) if source.is_empty() => None,
            (Some(current), Some(source)) if current.same_reference(source) => None,
            (_, Some(source)) => Some(source.clone()),
        };
        let ratio_changed = next.pixel_ratio != self.options.pixel_ratio;

        self.options = next;
        if ratio_changed {
            self.sync_backing_size();
        }
        self.state.configure(&self.options);

        let request = new_image.map(|source| self.begin_load(source));
        self.repaint()?;
        Ok(request)
    }

    /// Apply the outcome of a load started by this editor.
    ///
    /// Outcomes of superseded loads, and any outcome after [`Editor::destroy`],
    /// are ignored.
    pub fn finish_load(&mut self, outcome: LoadOutcome) -> Result<(), EditorError> {
        let current = self
            .pending
            .as_ref()
            .is_some_and(|token| token.same_load(&outcome.token));
        if self.destroyed || outcome.token.is_cancelled() || !current {
            debug!("Discarding outcome of a superseded image load");
            return Ok(());
        }
        self.pending = None;

        let image = match outcome.result {
            Ok(image) => image,
            Err(err) => {
                self.fail_load(&err);
                return Ok(());
            }
        };

        if let Err(err) = self.state.set_image(image.clone()) {
            self.fail_load(&err);
            return Ok(());
        }
        debug!("Loaded image {}x{}", image.width(), image.height());

        if let Some(callback) = &self.options.on_load_success {
            callback.call(&image);
        }
        self.repaint()
    }

    /// Wheel zoom. Returns whether the geometry changed.
    ///
    /// Ignored without an image and for a zero delta.
    pub fn on_wheel(&mut self, delta_y: f64) -> Result<bool, EditorError> {
        if self.destroyed || self.state.image().is_none() {
            return Ok(false);
        }
        let Some(step) = wheel_step(delta_y) else {
            return Ok(false);
        };

        let update = self.state.apply_scale_delta(
            step,
            self.options.on_scale_change.as_ref(),
            self.options.on_offset_change.as_ref(),
        );
        if update.committed {
            self.repaint()?;
        }
        Ok(update.committed)
    }

    pub fn on_pointer_down(&mut self, x: f64, y: f64) -> ListenerChange {
        if self.destroyed {
            return ListenerChange::Unchanged;
        }
        self.drag.pointer_down(x, y)
    }

    /// Pan by the pointer displacement since the last sample.
    pub fn on_pointer_move(&mut self, x: f64, y: f64) -> Result<(), EditorError> {
        if self.destroyed {
            return Ok(());
        }
        let render_size = self.state.render_size();
        let Some(delta) = self.drag.pointer_move(x, y, render_size) else {
            return Ok(());
        };

        let update = self
            .state
            .apply_offset_delta(delta, self.options.on_offset_change.as_ref());
        if update.committed {
            self.repaint()?;
        }
        Ok(())
    }

    pub fn on_pointer_up(&mut self) -> ListenerChange {
        self.drag.pointer_up()
    }

    /// The surface was laid out at a new size. Geometry is kept as is.
    ///
    /// Ignored while the display size is the one seen right after the
    /// editor's own backing store write.
    pub fn on_resize(&mut self) -> Result<(), EditorError> {
        if self.destroyed {
            return Ok(());
        }
        let display = self.surface.display_size();
        if display == self.measured_size {
            return Ok(());
        }
        self.measured_size = display;
        self.logical_size = display;
        self.sync_backing_size();
        self.repaint()
    }

    /// Stop the editor. Cancels the load in flight and ends any drag; later
    /// calls are no-ops.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
        self.drag.pointer_up();
        debug!("Editor destroyed");
    }

    pub fn geometry(&self) -> CropGeometry {
        self.state.geometry()
    }

    /// Visible region of the source image, in fractions of its size.
    pub fn crop(&self) -> Option<CropRect> {
        self.state.crop()
    }

    pub fn phase(&self) -> LoadPhase {
        self.state.phase()
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        self.state.image()
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn logical_size(&self) -> Size {
        self.logical_size
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn begin_load(&mut self, source: ImageSource) -> LoadRequest {
        if let Some(previous) = self.pending.take() {
            previous.cancel();
            debug!("Superseding pending image load");
        }
        debug!("Loading image {source:?}");

        let token = CancelToken::new();
        self.pending = Some(token.clone());
        self.state.begin_loading();
        LoadRequest {
            token,
            source,
            cross_origin: self.options.cross_origin,
        }
    }

    fn fail_load(&mut self, err: &LoadError) {
        warn!("Image load failed: {err}");
        self.state.load_failed();
        if let Some(callback) = &self.options.on_load_failure {
            callback.call(&());
        }
    }

    fn sync_backing_size(&mut self) {
        let ratio = self.options.pixel_ratio;
        let width = (self.logical_size.width * ratio).round().max(0.0) as u32;
        let height = (self.logical_size.height * ratio).round().max(0.0) as u32;
        if self.surface.backing_size() != (width, height) {
            self.surface.set_backing_size(width, height);
            self.measured_size = self.surface.display_size();
        }
    }

    fn repaint(&mut self) -> Result<(), EditorError> {
        let image = self.state.image().map(|image| PlacedImage {
            image,
            render_size: self.state.render_size(),
            offset: self.state.geometry().offset,
        });
        let scene = Scene {
            options: &self.options,
            logical_size: self.logical_size,
            image,
        };
        paint(&mut self.surface, &scene)?;
        Ok(())
    }
}
