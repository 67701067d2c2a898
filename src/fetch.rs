use nurie_core::{AssetError, AssetSource};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::Response;

/// Assets served next to the page, fetched relative to its URL.
pub(crate) struct FetchAssets;

impl AssetSource for FetchAssets {
    async fn fetch_text(&self, path: &str) -> Result<String, AssetError> {
        let fail = |reason: JsValue| AssetError::Fetch {
            path: path.to_string(),
            reason: js_reason(&reason),
        };
        let response = fetch_response(path).await.map_err(fail)?;
        if response.status() == 404 {
            return Err(AssetError::NotFound {
                path: path.to_string(),
            });
        }
        if !response.ok() {
            return Err(AssetError::Fetch {
                path: path.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }
        let text = wasm_bindgen_futures::JsFuture::from(response.text().map_err(fail)?)
            .await
            .map_err(fail)?;
        text.as_string().ok_or_else(|| AssetError::Fetch {
            path: path.to_string(),
            reason: "response body is not text".to_string(),
        })
    }
}

pub(crate) async fn fetch_response(url: &str) -> Result<Response, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let value = wasm_bindgen_futures::JsFuture::from(window.fetch_with_str(url)).await?;
    value.dyn_into::<Response>()
}

pub(crate) async fn fetch_bytes(url: &str) -> Result<Vec<u8>, JsValue> {
    let response = fetch_response(url).await?;
    if !response.ok() {
        return Err(JsValue::from_str(&format!("HTTP {}", response.status())));
    }
    let buffer = wasm_bindgen_futures::JsFuture::from(response.array_buffer()?).await?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

pub(crate) fn js_reason(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|err| String::from(err.message()))
        })
        .unwrap_or_else(|| format!("{value:?}"))
}
