//! WASM bindings for in-browser export.
//!
//! The page passes the book record as JSON and receives EPUB bytes, then
//! triggers the download itself under [`export_filename`].

use wasm_bindgen::prelude::*;

use crate::export::ExportFormat;
use crate::packager::Packager;
use crate::settings::UserSettings;

/// Initialize panic hook for better error messages in the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "wasm")]
    console_error_panic_hook::set_once();
}

/// Package a JSON book record as EPUB.
///
/// Takes the record JSON and returns EPUB bytes.
#[wasm_bindgen]
pub fn export_epub(record_json: &str) -> Result<Vec<u8>, JsValue> {
    export(record_json, "epub")
}

/// Package a JSON book record in a named format (`epub`, `azw3`, ...).
///
/// Formats other than EPUB reject with a user-facing message.
#[wasm_bindgen]
pub fn export(record_json: &str, format: &str) -> Result<Vec<u8>, JsValue> {
    let format: ExportFormat = format.parse().map_err(to_js)?;
    let download = Packager::new()
        .export_json(record_json, format)
        .map_err(to_js)?;
    Ok(download.bytes)
}

/// Package a record using the stored user settings document.
#[wasm_bindgen]
pub fn export_with_settings(record_json: &str, settings_json: &str) -> Result<Vec<u8>, JsValue> {
    let settings = UserSettings::from_json(settings_json).map_err(to_js)?;
    let packager = Packager::new().with_settings(&settings);
    let download = packager
        .export_json(record_json, packager.default_format())
        .map_err(to_js)?;
    Ok(download.bytes)
}

/// Suggested download filename for a title.
#[wasm_bindgen]
pub fn export_filename(title: &str) -> String {
    format!("{}.epub", crate::delivery::sanitize_filename(title))
}

fn to_js(e: crate::Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}
