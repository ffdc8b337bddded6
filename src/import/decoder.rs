//! Turns file text into a list of candidate form values

use log::debug;
use serde_json::Value;

use super::error::ImportError;

/// Parse file text as JSON; an array yields one candidate per element, anything else yields one.
/// A leading byte order mark is ignored.
pub fn decode(text: &str) -> Result<Vec<Value>, ImportError> {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let parsed: Value = serde_json::from_str(text).map_err(ImportError::Decode)?;

    let candidates = match parsed {
        Value::Array(items) => items,
        single => vec![single],
    };
    debug!("Decoded {} form candidate(s)", candidates.len());
    Ok(candidates)
}
