//! FFI bindings for Synheart Synth
//!
//! This module provides C-compatible functions for calling Synth from the
//! on-device app layer. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `synth_free_string`.
//! Persisting the generated samples into the platform health store stays on
//! the app side.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::catalog::TypeCatalog;
use crate::config::{SynthConfig, DEFAULT_WINDOW_DAYS};
use crate::generator::SampleGenerator;
use crate::pipeline::{generate_samples, survey_export};
use crate::survey::RecordTypeSurveyor;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Serialize `value` into a newly allocated C string, recording failures
fn json_to_cstr<T: Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

fn window_from_c(window_days: i32) -> u32 {
    if window_days <= 0 {
        DEFAULT_WINDOW_DAYS
    } else {
        window_days as u32
    }
}

fn anchor_from_c(anchor_millis: i64) -> Option<DateTime<Utc>> {
    if anchor_millis < 0 {
        Some(Utc::now())
    } else {
        Utc.timestamp_millis_opt(anchor_millis).single()
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Survey an XML export held in memory and return a JSON array of the
/// importable record types it contains.
///
/// # Safety
/// - `xml` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `synth_free_string`.
/// - Returns NULL on error; call `synth_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn synth_survey_xml(xml: *const c_char) -> *mut c_char {
    clear_last_error();

    if xml.is_null() {
        set_last_error("Invalid XML string pointer");
        return ptr::null_mut();
    }
    let bytes = CStr::from_ptr(xml).to_bytes();

    match survey_export(bytes) {
        Ok(types) => json_to_cstr(&types),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Survey an export file and return a JSON array of importable record types.
///
/// # Safety
/// - `path` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `synth_free_string`.
/// - Returns NULL on error; call `synth_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn synth_survey_file(path: *const c_char) -> *mut c_char {
    clear_last_error();

    let path_str = match cstr_to_string(path) {
        Some(s) => s,
        None => {
            set_last_error("Invalid path string pointer");
            return ptr::null_mut();
        }
    };

    match RecordTypeSurveyor::default().report_file(Path::new(&path_str)) {
        Ok(report) => json_to_cstr(&report.importable),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Generate a sample batch for a built-in type and return it as JSON.
///
/// `window_days <= 0` selects the default 90-day window and
/// `anchor_millis < 0` anchors the window at the current time.
///
/// # Safety
/// - `record_type` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `synth_free_string`.
/// - Returns NULL on error; call `synth_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn synth_generate(
    record_type: *const c_char,
    window_days: i32,
    anchor_millis: i64,
) -> *mut c_char {
    clear_last_error();

    let type_str = match cstr_to_string(record_type) {
        Some(s) => s,
        None => {
            set_last_error("Invalid record type string pointer");
            return ptr::null_mut();
        }
    };

    let anchor = match anchor_from_c(anchor_millis) {
        Some(anchor) => anchor,
        None => {
            set_last_error("Anchor timestamp out of range");
            return ptr::null_mut();
        }
    };

    match generate_samples(&type_str, window_from_c(window_days), anchor) {
        Ok(batch) => json_to_cstr(&batch),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Return the built-in importable type catalog as JSON.
///
/// # Safety
/// - Returns a newly allocated string that must be freed with `synth_free_string`.
#[no_mangle]
pub unsafe extern "C" fn synth_catalog() -> *mut c_char {
    clear_last_error();
    json_to_cstr(&TypeCatalog::default().to_types())
}

// ============================================================================
// Configured Generator API
// ============================================================================

/// Opaque handle to a configured SampleGenerator
pub struct SynthGeneratorHandle {
    generator: SampleGenerator,
}

/// Create a generator from a JSON configuration.
///
/// `config_json` may be NULL to use the built-in catalog and defaults.
/// A negative `seed` draws the random source from OS entropy.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Must be freed with `synth_generator_free`.
/// - Returns NULL on error; call `synth_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn synth_generator_new(
    config_json: *const c_char,
    seed: i64,
) -> *mut SynthGeneratorHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        SynthConfig::default()
    } else {
        let json = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match SynthConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    let generator = config.catalog().and_then(|catalog| {
        if seed < 0 {
            SampleGenerator::new(catalog, config.generator.clone())
        } else {
            SampleGenerator::with_seed(catalog, config.generator.clone(), seed as u64)
        }
    });

    match generator {
        Ok(generator) => Box::into_raw(Box::new(SynthGeneratorHandle { generator })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a generator.
///
/// # Safety
/// - `generator` must be a valid pointer returned by `synth_generator_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn synth_generator_free(generator: *mut SynthGeneratorHandle) {
    if !generator.is_null() {
        drop(Box::from_raw(generator));
    }
}

/// Generate a sample batch with a configured generator and return it as JSON.
///
/// `window_days <= 0` selects the configured window.
///
/// # Safety
/// - `generator` must be a valid pointer returned by `synth_generator_new`.
/// - `record_type` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `synth_free_string`.
/// - Returns NULL on error; call `synth_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn synth_generator_generate(
    generator: *mut SynthGeneratorHandle,
    record_type: *const c_char,
    window_days: i32,
    anchor_millis: i64,
) -> *mut c_char {
    clear_last_error();

    if generator.is_null() {
        set_last_error("Null generator pointer");
        return ptr::null_mut();
    }

    let handle = &mut *generator;

    let type_str = match cstr_to_string(record_type) {
        Some(s) => s,
        None => {
            set_last_error("Invalid record type string pointer");
            return ptr::null_mut();
        }
    };

    let anchor = match anchor_from_c(anchor_millis) {
        Some(anchor) => anchor,
        None => {
            set_last_error("Anchor timestamp out of range");
            return ptr::null_mut();
        }
    };

    let window = if window_days <= 0 {
        handle.generator.config().window_days
    } else {
        window_days as u32
    };

    match handle.generator.generate(&type_str, window, anchor) {
        Ok(batch) => json_to_cstr(&batch),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Synth functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Synth function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn synth_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Synth function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn synth_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the Synth library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn synth_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
