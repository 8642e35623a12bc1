//! Node bindings.

use napi_derive::napi;
use std::path::Path;

use crate::config::ConvertOptions;
use crate::convert::convert_source;

/// Convert module text; `options_json` holds `ConvertOptions` fields.
/// Returns the serialized `ConversionOutput`.
#[napi]
pub fn convert_source_native(
    source: String,
    options_json: Option<String>,
) -> napi::Result<serde_json::Value> {
    let options = match options_json {
        Some(json) => serde_json::from_str::<ConvertOptions>(&json)
            .map_err(|e| napi::Error::from_reason(format!("invalid options: {}", e)))?,
        None => ConvertOptions::default(),
    };
    let output = convert_source(&source, Path::new("<input>"), &options)
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    serde_json::to_value(output).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[napi]
pub fn describe_diagnostic_native(code: String) -> String {
    crate::diagnostics::describe_code(&code).to_string()
}
