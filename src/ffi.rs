//! C FFI exports for .NET P/Invoke.
//!
//! These functions provide a C-compatible interface for calling Rust functions from C#.
//! All functions use JSON strings for input/output to simplify marshalling.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use crate::database_merge::{merge_databases, MergeInput};

/// Merge two user-data databases.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string containing the JSON result (MergeOutput).
/// Returns null on error.
#[no_mangle]
pub unsafe extern "C" fn merge_databases_ffi(input_json: *const c_char) -> *mut c_char {
    if input_json.is_null() {
        return ptr::null_mut();
    }

    let c_str = match CStr::from_ptr(input_json).to_str() {
        Ok(s) => s,
        Err(_) => return ptr::null_mut(),
    };

    let input: MergeInput = match serde_json::from_str(c_str) {
        Ok(i) => i,
        Err(e) => {
            return create_error_response(&format!("Failed to parse input: {}", e));
        }
    };

    let output = match merge_databases(input) {
        Ok(o) => o,
        Err(e) => {
            return create_error_response(&format!("Merge failed: {}", e));
        }
    };

    match serde_json::to_string(&output) {
        Ok(json) => string_to_c_char(json),
        Err(e) => create_error_response(&format!("Failed to serialize output: {}", e)),
    }
}

/// Get the library version.
///
/// # Safety
///
/// - The returned pointer must be freed by calling `free_string`
#[no_mangle]
pub extern "C" fn get_core_version_ffi() -> *mut c_char {
    string_to_c_char(crate::get_core_version().to_string())
}

/// Free a string that was allocated by Rust.
///
/// # Safety
///
/// - `s` must be a pointer that was returned by one of the FFI functions
/// - This function must only be called once per pointer
/// - After calling this function, the pointer is invalid
#[no_mangle]
pub unsafe extern "C" fn free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Convert a Rust string to a C string pointer.
fn string_to_c_char(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c_string) => c_string.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Create an error response JSON string.
fn create_error_response(message: &str) -> *mut c_char {
    let error_json = serde_json::json!({ "success": false, "error": message }).to_string();
    string_to_c_char(error_json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    unsafe fn take_string(result: *mut c_char) -> String {
        let json = CStr::from_ptr(result).to_str().unwrap().to_string();
        free_string(result);
        json
    }

    #[test]
    fn test_null_input() {
        unsafe {
            let result = merge_databases_ffi(ptr::null());
            assert!(result.is_null());
        }
    }

    #[test]
    fn test_invalid_json_input() {
        let invalid_json = CString::new("not valid json").unwrap();
        unsafe {
            let result = merge_databases_ffi(invalid_json.as_ptr());
            assert!(!result.is_null());

            let output: serde_json::Value = serde_json::from_str(&take_string(result)).unwrap();
            assert_eq!(output["success"], false);
            assert!(output["error"].as_str().unwrap().starts_with("Failed to parse input"));
        }
    }

    #[test]
    fn test_merge_empty_databases() {
        let input = CString::new(r#"{"left": {}, "right": {}}"#).unwrap();
        unsafe {
            let result = merge_databases_ffi(input.as_ptr());
            assert!(!result.is_null());

            let output: serde_json::Value = serde_json::from_str(&take_string(result)).unwrap();
            assert_eq!(output["success"], true);
            assert_eq!(output["stats"]["tables_merged"], 7);
        }
    }

    #[test]
    fn test_version() {
        unsafe {
            let version = take_string(get_core_version_ffi());
            assert_eq!(version, env!("CARGO_PKG_VERSION"));
        }
    }
}
