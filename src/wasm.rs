//! WASM bindings for the browser.

use wasm_bindgen::prelude::*;

use crate::database_merge::{merge_databases, MergeInput, MergeOutput};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    pub fn log(s: &str);
}

/// Initialize panic hook for better error messages.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version.
#[wasm_bindgen(js_name = getCoreVersion)]
pub fn get_core_version_js() -> String {
    crate::get_core_version().to_string()
}

/// Merge two user-data databases.
///
/// Takes a JsValue (MergeInput) and returns a JsValue (MergeOutput). When
/// `success` is false, add answers for `conflicts` to `solutions` and call
/// again with the same databases.
#[wasm_bindgen(js_name = mergeDatabases)]
pub fn merge_databases_js(input: JsValue) -> Result<JsValue, JsValue> {
    let input: MergeInput = serde_wasm_bindgen::from_value(input)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse input: {}", e)))?;

    let output: MergeOutput = merge_databases(input)
        .map_err(|e| JsValue::from_str(&format!("Merge failed: {}", e)))?;

    if !output.success {
        if let Some(conflicts) = &output.conflicts {
            log(&format!(
                "merge stopped at {} with {} conflicts",
                conflicts.table(),
                conflicts.len()
            ));
        }
    }

    serde_wasm_bindgen::to_value(&output)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize output: {}", e)))
}

/// Merge databases using JSON strings (alternative API).
///
/// Takes a JSON string and returns a JSON string.
#[wasm_bindgen(js_name = mergeDatabasesJson)]
pub fn merge_databases_json_js(input_json: &str) -> Result<String, JsValue> {
    crate::database_merge::merge_databases_json(input_json)
        .map_err(|e| JsValue::from_str(&format!("Merge failed: {}", e)))
}
