//! Browser implementations of the loader's I/O traits.

use avatar_cropper_core::loader::{Fetch, FileBlob, LoadError};
use avatar_cropper_core::CrossOrigin;
use futures::future::{FutureExt, LocalBoxFuture};
use js_sys::{ArrayBuffer, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{File, Request, RequestCredentials, RequestInit, RequestMode, Response};

fn js_message(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

/// Request mode and credentials mode for a cross-origin policy.
///
/// Without a policy the fetch defaults apply.
pub fn request_policy(cross_origin: Option<CrossOrigin>) -> (RequestMode, RequestCredentials) {
    match cross_origin {
        None | Some(CrossOrigin::Anonymous) => (RequestMode::Cors, RequestCredentials::SameOrigin),
        Some(CrossOrigin::UseCredentials) => (RequestMode::Cors, RequestCredentials::Include),
    }
}

/// Fetches remote images with `window.fetch`.
#[derive(Debug, Default)]
pub struct BrowserFetch;

impl Fetch for BrowserFetch {
    fn fetch(
        &self,
        url: &str,
        cross_origin: Option<CrossOrigin>,
    ) -> LocalBoxFuture<'static, Result<Vec<u8>, LoadError>> {
        let url = url.to_string();
        async move {
            let window =
                web_sys::window().ok_or_else(|| LoadError::Network("no window".to_string()))?;

            let (mode, credentials) = request_policy(cross_origin);
            let init = RequestInit::new();
            init.set_method("GET");
            init.set_mode(mode);
            init.set_credentials(credentials);
            let request = Request::new_with_str_and_init(&url, &init)
                .map_err(|err| LoadError::Network(js_message(&err)))?;

            let response: Response = JsFuture::from(window.fetch_with_request(&request))
                .await
                .map_err(|err| LoadError::Network(js_message(&err)))?
                .dyn_into()
                .map_err(|_| LoadError::Network("not a Response".to_string()))?;
            if !response.ok() {
                return Err(LoadError::Network(format!(
                    "{} {}",
                    response.status(),
                    response.status_text()
                )));
            }

            let buffer = response
                .array_buffer()
                .map_err(|err| LoadError::Network(js_message(&err)))?;
            let buffer: ArrayBuffer = JsFuture::from(buffer)
                .await
                .map_err(|err| LoadError::Network(js_message(&err)))?
                .dyn_into()
                .map_err(|_| LoadError::Network("not an ArrayBuffer".to_string()))?;
            Ok(Uint8Array::new(&buffer).to_vec())
        }
        .boxed_local()
    }
}

/// A user-picked `File`.
#[derive(Debug, Clone)]
pub struct BrowserFile(File);

impl BrowserFile {
    pub fn new(file: File) -> Self {
        Self(file)
    }

    pub fn file(&self) -> &File {
        &self.0
    }
}

impl FileBlob for BrowserFile {
    fn mime_type(&self) -> String {
        self.0.type_()
    }

    fn read(&self) -> LocalBoxFuture<'static, Result<Vec<u8>, LoadError>> {
        let promise = self.0.array_buffer();
        async move {
            let buffer: ArrayBuffer = JsFuture::from(promise)
                .await
                .map_err(|err| LoadError::UnreadableFile(js_message(&err)))?
                .dyn_into()
                .map_err(|_| LoadError::UnreadableFile("not an ArrayBuffer".to_string()))?;
            Ok(Uint8Array::new(&buffer).to_vec())
        }
        .boxed_local()
    }
}
