//! Conversion from a JS options object to an [`OptionsPatch`].
//!
//! A key that is absent keeps the current value; a key set to `null` or
//! `undefined` clears it (or keeps it, for options without an "unset"
//! state such as `size`). Plain data goes through `serde-wasm-bindgen`,
//! while `image` and the callbacks are read with `Reflect`.

use std::rc::Rc;

use avatar_cropper_core::options::{Callback, ImageSource, OptionsPatch};
use avatar_cropper_core::{CrossOrigin, LoadedImage, Position};
use js_sys::{Function, Object, Reflect};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::File;

use crate::fetch::BrowserFile;

/// Remembers the last `File` handed over, so passing the same JS object
/// again maps to the same source and does not reload.
#[derive(Default)]
pub struct FileCache(Option<Rc<BrowserFile>>);

impl FileCache {
    fn source_for(&mut self, file: File) -> ImageSource {
        if let Some(cached) = &self.0 {
            if Object::is(cached.file(), &file) {
                return ImageSource::File(cached.clone());
            }
        }
        let blob = Rc::new(BrowserFile::new(file));
        self.0 = Some(Rc::clone(&blob));
        ImageSource::File(blob)
    }
}

/// `None` when `key` is absent, `Some(None)` when it is null or undefined.
fn raw(options: &Object, key: &str) -> Result<Option<Option<JsValue>>, JsValue> {
    let key = JsValue::from_str(key);
    if !Reflect::has(options, &key)? {
        return Ok(None);
    }
    let value = Reflect::get(options, &key)?;
    if value.is_null() || value.is_undefined() {
        return Ok(Some(None));
    }
    Ok(Some(Some(value)))
}

fn field<T: DeserializeOwned>(options: &Object, key: &str) -> Result<Option<Option<T>>, JsValue> {
    match raw(options, key)? {
        Some(Some(value)) => Ok(Some(Some(serde_wasm_bindgen::from_value(value)?))),
        Some(None) => Ok(Some(None)),
        None => Ok(None),
    }
}

fn function(options: &Object, key: &str) -> Result<Option<Option<Function>>, JsValue> {
    match raw(options, key)? {
        Some(Some(value)) => value
            .dyn_into::<Function>()
            .map(|f| Some(Some(f)))
            .map_err(|_| JsValue::from_str(&format!("Option `{key}` must be a function"))),
        Some(None) => Ok(Some(None)),
        None => Ok(None),
    }
}

/// Wrap a JS function as a core callback. The value is passed as the only
/// argument; exceptions are logged and swallowed.
fn js_callback<T: Serialize + ?Sized + 'static>(f: Function) -> Callback<T> {
    Callback::new(move |value: &T| {
        let arg = serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::UNDEFINED);
        if let Err(err) = f.call1(&JsValue::NULL, &arg) {
            log::warn!("Callback threw: {err:?}");
        }
    })
}

fn image(options: &Object, files: &mut FileCache) -> Result<Option<Option<ImageSource>>, JsValue> {
    let Some(value) = raw(options, "image")? else {
        return Ok(None);
    };
    let Some(value) = value else {
        return Ok(Some(None));
    };

    if let Some(url) = value.as_string() {
        return Ok(Some(Some(ImageSource::url(url))));
    }
    match value.dyn_into::<File>() {
        Ok(file) => Ok(Some(Some(files.source_for(file)))),
        Err(_) => Err(JsValue::from_str(
            "Option `image` must be a URL string or a File",
        )),
    }
}

/// `crossOrigin` also accepts `""` for no policy.
fn cross_origin(options: &Object) -> Result<Option<Option<CrossOrigin>>, JsValue> {
    match raw(options, "crossOrigin")? {
        Some(Some(value)) if value.as_string().is_some_and(|s| s.is_empty()) => Ok(Some(None)),
        Some(_) => field(options, "crossOrigin"),
        None => Ok(None),
    }
}

/// Load success is reported with the decoded size.
fn load_success(f: Function) -> Callback<LoadedImage> {
    let size = js_callback(f);
    Callback::new(move |image: &LoadedImage| size.call(&image.intrinsic_size()))
}

/// Load failure is reported without arguments.
fn load_failure(f: Function) -> Callback<()> {
    Callback::new(move |_: &()| {
        if let Err(err) = f.call0(&JsValue::NULL) {
            log::warn!("Callback threw: {err:?}");
        }
    })
}

/// Parse a JS options object. `undefined` and `null` yield an empty patch.
///
/// # Errors
///
/// Returns `Err` for a non-object argument and for values of the wrong type.
pub fn parse_options(value: &JsValue, files: &mut FileCache) -> Result<OptionsPatch, JsValue> {
    if value.is_null() || value.is_undefined() {
        return Ok(OptionsPatch::new());
    }
    let options = value
        .dyn_ref::<Object>()
        .ok_or_else(|| JsValue::from_str("Options must be an object"))?;

    Ok(OptionsPatch {
        shape: field(options, "shape")?.flatten(),
        image: image(options, files)?,
        cross_origin: cross_origin(options)?,
        size: field(options, "size")?.flatten(),
        max_scale: field(options, "maxScale")?.flatten(),
        position: field::<Position>(options, "position")?.flatten(),
        pixel_ratio: field(options, "pixelRatio")?.flatten(),
        mask_color: field(options, "maskColor")?.flatten(),
        grid_color: field(options, "gridColor")?,
        grid_width: field(options, "gridWidth")?,
        border_color: field(options, "borderColor")?,
        border_width: field(options, "borderWidth")?,
        on_load_failure: function(options, "onLoadFailure")?.map(|f| f.map(load_failure)),
        on_load_success: function(options, "onLoadSuccess")?.map(|f| f.map(load_success)),
        scale: field(options, "scale")?,
        on_scale_change: function(options, "onScaleChange")?.map(|f| f.map(js_callback)),
        offset: field(options, "offset")?,
        on_offset_change: function(options, "onOffsetChange")?.map(|f| f.map(js_callback)),
    })
}

/// Whether `value` sets `key` explicitly.
pub fn has_key(value: &JsValue, key: &str) -> bool {
    value
        .dyn_ref::<Object>()
        .is_some_and(|options| Reflect::has(options, &JsValue::from_str(key)).unwrap_or(false))
}
