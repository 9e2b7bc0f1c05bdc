use wander_core::AssetError;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys as web;

/// Map a rejected fetch/decode promise to an asset error; aborts keep their
/// own kind so callers can tell cancellation from failure.
pub fn js_error(e: JsValue) -> AssetError {
    let name = js_sys::Reflect::get(&e, &JsValue::from_str("name"))
        .ok()
        .and_then(|n| n.as_string());
    if name.as_deref() == Some("AbortError") {
        return AssetError::Aborted;
    }
    AssetError::Network(format!("{:?}", e))
}

/// `GET url` into an `ArrayBuffer`. Non-2xx statuses are errors.
pub async fn fetch_array_buffer(
    url: &str,
    signal: Option<&web::AbortSignal>,
) -> Result<js_sys::ArrayBuffer, AssetError> {
    let window = web::window().ok_or_else(|| AssetError::Network("no window".into()))?;
    let init = web::RequestInit::new();
    init.set_method("GET");
    init.set_mode(web::RequestMode::Cors);
    if signal.is_some() {
        init.set_signal(signal);
    }
    let resp = JsFuture::from(window.fetch_with_str_and_init(url, &init))
        .await
        .map_err(js_error)?;
    let resp: web::Response = resp
        .dyn_into()
        .map_err(|_| AssetError::Network(format!("GET {} returned a non-Response", url)))?;
    if !resp.ok() {
        return Err(AssetError::Fetch {
            url: url.to_string(),
            status: resp.status(),
        });
    }
    let body = JsFuture::from(resp.array_buffer().map_err(js_error)?)
        .await
        .map_err(js_error)?;
    body.dyn_into::<js_sys::ArrayBuffer>()
        .map_err(|_| AssetError::Decode(format!("GET {} body is not binary", url)))
}

pub async fn fetch_bytes(url: &str) -> Result<Vec<u8>, AssetError> {
    let buf = fetch_array_buffer(url, None).await?;
    Ok(js_sys::Uint8Array::new(&buf).to_vec())
}
