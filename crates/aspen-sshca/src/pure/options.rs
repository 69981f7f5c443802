//! Critical option and extension resolution.

use std::collections::BTreeMap;

/// Resolve the options to embed in a certificate.
///
/// A non-empty request is checked key-by-key against `allowed` (an empty
/// allow-list accepts any key) and used as-is. An empty request falls back
/// to the role `defaults` verbatim; defaults are never filtered.
///
/// Returns the first disallowed key as the error.
pub fn resolve_options(
    requested: &BTreeMap<String, String>,
    allowed: &[String],
    defaults: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, String> {
    if requested.is_empty() {
        return Ok(defaults.clone());
    }

    if !allowed.is_empty()
        && let Some(key) = requested.keys().find(|key| !allowed.iter().any(|a| a == *key))
    {
        return Err(key.clone());
    }

    Ok(requested.clone())
}

/// Coerce a loosely-typed map into string values.
///
/// Strings are kept verbatim and `null` becomes the empty string; every other
/// JSON value is rendered in its JSON text form (`true`, `42`).
pub fn stringify_values(values: BTreeMap<String, serde_json::Value>) -> BTreeMap<String, String> {
    values
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, value)
        })
        .collect()
}
