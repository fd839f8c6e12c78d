//! `AvatarEditor`: the JS-facing editor class.
//!
//! Owns the core [`Editor`] plus every DOM subscription it needs: wheel and
//! pointer-down on the canvas, pointer move/up/cancel on the document while a
//! drag is active, and a `ResizeObserver` on the canvas.
//!
//! # Re-entrancy
//!
//! JS callbacks run while the editor is mutably borrowed. `setOptions` and
//! `destroy` calls made from inside a callback are deferred and applied once
//! the current handler returns. The `scale`, `offset` and `crop` getters
//! answer from the geometry recorded after the last completed operation
//! while a callback is running.
//!
//! # Usage
//!
//! ```typescript
//! import init, { AvatarEditor } from 'avatar-cropper-wasm';
//!
//! await init();
//! const editor = new AvatarEditor(canvas, {
//!   image: file,
//!   shape: 'circle',
//!   onScaleChange: (scale) => console.log(scale),
//! });
//! const { left, top, width, height } = editor.crop;
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use avatar_cropper_core::interaction::ListenerChange;
use avatar_cropper_core::loader::{Fetch, LoadRequest};
use avatar_cropper_core::options::OptionsPatch;
use avatar_cropper_core::{CropGeometry, CropRect, Editor, EditorError};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{
    AddEventListenerOptions, Document, HtmlCanvasElement, PointerEvent, ResizeObserver, WheelEvent,
};

use crate::fetch::BrowserFetch;
use crate::options::{has_key, parse_options, FileCache};
use crate::surface::CanvasSurface;

fn to_js(err: EditorError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Shared state reachable from DOM closures.
struct Inner {
    editor: RefCell<Editor<CanvasSurface>>,
    /// `setOptions` patches received while the editor was busy.
    deferred: RefCell<VecDeque<OptionsPatch>>,
    destroy_requested: Cell<bool>,
    files: RefCell<FileCache>,
    fetch: Rc<dyn Fetch>,
    listeners: RefCell<Option<Listeners>>,
    document_attached: Cell<bool>,
    /// Geometry and crop as of the last completed editor operation.
    last_geometry: Cell<(CropGeometry, Option<CropRect>)>,
}

/// DOM subscriptions. Closures stay alive until the editor is dropped so a
/// handler can never outlive its own closure.
struct Listeners {
    canvas: HtmlCanvasElement,
    document: Document,
    wheel: Closure<dyn FnMut(WheelEvent)>,
    pointer_down: Closure<dyn FnMut(PointerEvent)>,
    pointer_move: Closure<dyn FnMut(PointerEvent)>,
    pointer_up: Closure<dyn FnMut(PointerEvent)>,
    _resize: Closure<dyn FnMut(js_sys::Array)>,
    observer: ResizeObserver,
}

impl Inner {
    /// Run `f` against the editor, then apply anything deferred meanwhile.
    fn with_editor<T>(self: &Rc<Self>, f: impl FnOnce(&mut Editor<CanvasSurface>) -> T) -> Option<T> {
        let result = match self.editor.try_borrow_mut() {
            Ok(mut editor) => {
                let result = f(&mut editor);
                self.remember(&editor);
                Some(result)
            }
            Err(_) => {
                log::warn!("Editor event ignored: editor is busy");
                None
            }
        };
        self.flush_deferred();
        result
    }

    fn flush_deferred(self: &Rc<Self>) {
        loop {
            let Ok(mut editor) = self.editor.try_borrow_mut() else {
                return;
            };

            if self.destroy_requested.get() {
                self.deferred.borrow_mut().clear();
                editor.destroy();
                drop(editor);
                self.detach_all();
                return;
            }

            let Some(patch) = self.deferred.borrow_mut().pop_front() else {
                return;
            };
            let result = editor.set_options(patch);
            self.remember(&editor);
            drop(editor);

            match result {
                Ok(Some(request)) => self.spawn_load(request),
                Ok(None) => {}
                Err(err) => log::warn!("Deferred setOptions failed: {err}"),
            }
        }
    }

    fn remember(&self, editor: &Editor<CanvasSurface>) {
        self.last_geometry.set((editor.geometry(), editor.crop()));
    }

    /// Live geometry, or the remembered one while the editor is busy.
    fn geometry(&self) -> (CropGeometry, Option<CropRect>) {
        match self.editor.try_borrow() {
            Ok(editor) => (editor.geometry(), editor.crop()),
            Err(_) => self.last_geometry.get(),
        }
    }

    /// Drive `request` on the browser's microtask queue.
    fn spawn_load(self: &Rc<Self>, request: LoadRequest) {
        let weak = Rc::downgrade(self);
        let load = request.run(Rc::clone(&self.fetch));
        wasm_bindgen_futures::spawn_local(async move {
            let outcome = load.await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if let Some(Err(err)) = inner.with_editor(|editor| editor.finish_load(outcome)) {
                log::error!("Repaint after load failed: {err}");
            }
        });
    }

    fn update_document_listeners(&self, change: ListenerChange) {
        let listeners = self.listeners.borrow();
        let Some(listeners) = listeners.as_ref() else {
            return;
        };

        match change {
            ListenerChange::Attach if !self.document_attached.get() => {
                let attached = listeners
                    .document
                    .add_event_listener_with_callback(
                        "pointermove",
                        listeners.pointer_move.as_ref().unchecked_ref(),
                    )
                    .and_then(|()| {
                        listeners.document.add_event_listener_with_callback(
                            "pointerup",
                            listeners.pointer_up.as_ref().unchecked_ref(),
                        )
                    })
                    .and_then(|()| {
                        listeners.document.add_event_listener_with_callback(
                            "pointercancel",
                            listeners.pointer_up.as_ref().unchecked_ref(),
                        )
                    });
                match attached {
                    Ok(()) => self.document_attached.set(true),
                    Err(err) => log::error!("Failed to attach drag listeners: {err:?}"),
                }
            }
            ListenerChange::Detach if self.document_attached.get() => {
                remove_document_listeners(listeners);
                self.document_attached.set(false);
            }
            _ => {}
        }
    }

    /// Remove every listener this editor added and stop observing resizes.
    fn detach_all(&self) {
        let listeners = self.listeners.borrow();
        let Some(listeners) = listeners.as_ref() else {
            return;
        };

        let _ = listeners
            .canvas
            .remove_event_listener_with_callback("wheel", listeners.wheel.as_ref().unchecked_ref());
        let _ = listeners.canvas.remove_event_listener_with_callback(
            "pointerdown",
            listeners.pointer_down.as_ref().unchecked_ref(),
        );
        if self.document_attached.replace(false) {
            remove_document_listeners(listeners);
        }
        listeners.observer.disconnect();
    }
}

fn remove_document_listeners(listeners: &Listeners) {
    let _ = listeners.document.remove_event_listener_with_callback(
        "pointermove",
        listeners.pointer_move.as_ref().unchecked_ref(),
    );
    let _ = listeners.document.remove_event_listener_with_callback(
        "pointerup",
        listeners.pointer_up.as_ref().unchecked_ref(),
    );
    let _ = listeners.document.remove_event_listener_with_callback(
        "pointercancel",
        listeners.pointer_up.as_ref().unchecked_ref(),
    );
}

/// Report a failed repaint from inside an event handler.
fn log_render_error(result: Option<Result<(), EditorError>>) {
    if let Some(Err(err)) = result {
        log::error!("Render failed: {err}");
    }
}

fn attach(inner: &Rc<Inner>, canvas: HtmlCanvasElement) -> Result<Listeners, JsValue> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("No document available"))?;

    let weak: Weak<Inner> = Rc::downgrade(inner);
    let wheel = {
        let weak = weak.clone();
        Closure::wrap(Box::new(move |event: WheelEvent| {
            event.prevent_default();
            if let Some(inner) = weak.upgrade() {
                let delta_y = event.delta_y();
                log_render_error(inner.with_editor(|editor| editor.on_wheel(delta_y).map(|_| ())));
            }
        }) as Box<dyn FnMut(WheelEvent)>)
    };

    let pointer_down = {
        let weak = weak.clone();
        Closure::wrap(Box::new(move |event: PointerEvent| {
            event.prevent_default();
            if let Some(inner) = weak.upgrade() {
                let x = f64::from(event.client_x());
                let y = f64::from(event.client_y());
                if let Some(change) = inner.with_editor(|editor| editor.on_pointer_down(x, y)) {
                    inner.update_document_listeners(change);
                }
            }
        }) as Box<dyn FnMut(PointerEvent)>)
    };

    let pointer_move = {
        let weak = weak.clone();
        Closure::wrap(Box::new(move |event: PointerEvent| {
            if let Some(inner) = weak.upgrade() {
                let x = f64::from(event.client_x());
                let y = f64::from(event.client_y());
                log_render_error(inner.with_editor(|editor| editor.on_pointer_move(x, y)));
            }
        }) as Box<dyn FnMut(PointerEvent)>)
    };

    // Also handles pointercancel
    let pointer_up = {
        let weak = weak.clone();
        Closure::wrap(Box::new(move |_event: PointerEvent| {
            if let Some(inner) = weak.upgrade() {
                if let Some(change) = inner.with_editor(Editor::on_pointer_up) {
                    inner.update_document_listeners(change);
                }
            }
        }) as Box<dyn FnMut(PointerEvent)>)
    };

    let resize = Closure::wrap(Box::new(move |_entries: js_sys::Array| {
        if let Some(inner) = weak.upgrade() {
            log_render_error(inner.with_editor(Editor::on_resize));
        }
    }) as Box<dyn FnMut(js_sys::Array)>);

    let options = AddEventListenerOptions::new();
    options.set_passive(false);
    canvas.add_event_listener_with_callback_and_add_event_listener_options(
        "wheel",
        wheel.as_ref().unchecked_ref(),
        &options,
    )?;
    canvas.add_event_listener_with_callback("pointerdown", pointer_down.as_ref().unchecked_ref())?;

    let observer = ResizeObserver::new(resize.as_ref().unchecked_ref())?;
    observer.observe(&canvas);

    Ok(Listeners {
        canvas,
        document,
        wheel,
        pointer_down,
        pointer_move,
        pointer_up,
        _resize: resize,
        observer,
    })
}

/// Interactive avatar cropper bound to a canvas element.
#[wasm_bindgen]
pub struct AvatarEditor {
    inner: Rc<Inner>,
}

#[wasm_bindgen]
impl AvatarEditor {
    /// Create an editor on `canvas`.
    ///
    /// `pixelRatio` defaults to `window.devicePixelRatio` when not given.
    ///
    /// # Errors
    ///
    /// Throws when the canvas is missing or has no 2D context, and for
    /// invalid options.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: Option<HtmlCanvasElement>, options: JsValue) -> Result<AvatarEditor, JsValue> {
        let mut files = FileCache::default();
        let mut patch = parse_options(&options, &mut files)?;
        if !has_key(&options, "pixelRatio") {
            patch.pixel_ratio = web_sys::window().map(|window| window.device_pixel_ratio());
        }

        let surface = canvas
            .map(CanvasSurface::new)
            .transpose()
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        let (editor, request) = Editor::new(surface, patch.into()).map_err(to_js)?;
        let canvas = editor.surface().canvas().clone();
        let last_geometry = Cell::new((editor.geometry(), editor.crop()));

        let inner = Rc::new(Inner {
            editor: RefCell::new(editor),
            deferred: RefCell::new(VecDeque::new()),
            destroy_requested: Cell::new(false),
            files: RefCell::new(files),
            fetch: Rc::new(BrowserFetch),
            listeners: RefCell::new(None),
            document_attached: Cell::new(false),
            last_geometry,
        });

        let listeners = attach(&inner, canvas)?;
        *inner.listeners.borrow_mut() = Some(listeners);
        if let Some(request) = request {
            inner.spawn_load(request);
        }

        Ok(AvatarEditor { inner })
    }

    /// Merge `options` into the current options.
    ///
    /// Called from inside an editor callback, the update is applied once the
    /// callback returns.
    #[wasm_bindgen(js_name = setOptions)]
    pub fn set_options(&self, options: JsValue) -> Result<(), JsValue> {
        let patch = parse_options(&options, &mut self.inner.files.borrow_mut())?;

        let Ok(mut editor) = self.inner.editor.try_borrow_mut() else {
            self.inner.deferred.borrow_mut().push_back(patch);
            return Ok(());
        };
        let request = editor.set_options(patch).map_err(to_js);
        self.inner.remember(&editor);
        drop(editor);
        let request = request?;

        if let Some(request) = request {
            self.inner.spawn_load(request);
        }
        self.inner.flush_deferred();
        Ok(())
    }

    /// Detach every listener and cancel the pending load. Idempotent.
    pub fn destroy(&self) {
        self.inner.destroy_requested.set(true);
        self.inner.flush_deferred();
    }

    /// Applied zoom factor.
    #[wasm_bindgen(getter)]
    pub fn scale(&self) -> f64 {
        self.inner.geometry().0.scale
    }

    /// Applied normalized offset as `{ x, y }`.
    #[wasm_bindgen(getter)]
    pub fn offset(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.inner.geometry().0.offset)?)
    }

    /// Visible source region as `{ left, top, width, height }` in fractions
    /// of the image size, or `null` before an image is loaded.
    #[wasm_bindgen(getter)]
    pub fn crop(&self) -> Result<JsValue, JsValue> {
        match self.inner.geometry().1 {
            Some(crop) => Ok(serde_wasm_bindgen::to_value(&crop)?),
            None => Ok(JsValue::NULL),
        }
    }
}

impl Drop for AvatarEditor {
    fn drop(&mut self) {
        self.destroy();
    }
}
