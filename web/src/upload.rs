use bottlematch_core::{UploadError, UploadRequest, UploadResponse, Uploader};
use js_sys::{Array, Uint8Array};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, FormData, Headers, Request, RequestInit, Response};

use crate::utils::js_error_message;

fn transport_error(err: JsValue) -> UploadError {
    UploadError::Transport(js_error_message(&err))
}

/// Pins files through `fetch` with a multipart body.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct FetchUploader;

impl Uploader for FetchUploader {
    async fn upload(&self, request: UploadRequest<'_>) -> Result<UploadResponse, UploadError> {
        let parts = Array::of1(&Uint8Array::from(request.bytes));
        let blob_options = BlobPropertyBag::new();
        blob_options.set_type("image/png");
        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &blob_options)
            .map_err(transport_error)?;

        let form = FormData::new().map_err(transport_error)?;
        form.append_with_blob_and_filename("file", &blob, request.file_name)
            .map_err(transport_error)?;

        let headers = Headers::new().map_err(transport_error)?;
        headers
            .set("Authorization", &format!("Bearer {}", request.token))
            .map_err(transport_error)?;

        let init = RequestInit::new();
        init.set_method("POST");
        init.set_headers(&headers);
        init.set_body(&form);
        let http_request =
            Request::new_with_str_and_init(request.endpoint, &init).map_err(transport_error)?;

        let response: Response = JsFuture::from(gloo::utils::window().fetch_with_request(&http_request))
            .await
            .and_then(|response| response.dyn_into())
            .map_err(transport_error)?;
        let status = response.status();
        let body = JsFuture::from(response.text().map_err(transport_error)?)
            .await
            .map_err(transport_error)?
            .as_string()
            .unwrap_or_default();
        log::debug!("pinning service answered {}", status);

        Ok(UploadResponse { status, body })
    }
}
