//! Coercion of loosely-typed request fields into engine requests.
//!
//! Callers submit fields the way a CLI or HTTP form would: lists as
//! comma-separated strings or arrays, booleans as strings, durations as
//! strings or whole seconds. Anything that does not coerce is rejected with
//! [`SshCaError::InvalidField`] naming the field.

use std::collections::BTreeMap;
use std::time::Duration;

use aspen_sshca::CertType;
use aspen_sshca::ConfigureCaRequest;
use aspen_sshca::CreateRoleRequest;
use aspen_sshca::Result;
use aspen_sshca::SignRequest;
use aspen_sshca::SshCaError;
use aspen_sshca::TidyRequest;
use aspen_sshca::pure::parse_optional_duration;
use aspen_sshca::pure::stringify_values;
use serde_json::Value;

use crate::protocol::FieldMap;

fn invalid(field: &str, reason: impl Into<String>) -> SshCaError {
    SshCaError::InvalidField {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Optional string field. Numbers and booleans are rendered as text.
pub fn string_field(fields: &FieldMap, name: &str) -> Result<Option<String>> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(invalid(name, "expected a string")),
    }
}

/// Required, non-empty string field.
pub fn required_string(fields: &FieldMap, name: &str) -> Result<String> {
    match string_field(fields, name)? {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(SshCaError::MissingField {
            field: name.to_string(),
        }),
    }
}

/// List field given as a comma-separated string or an array of strings.
///
/// Entries are trimmed and empty entries dropped.
pub fn comma_list(fields: &FieldMap, name: &str) -> Result<Vec<String>> {
    let raw: Vec<String> = match fields.get(name) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => out.push(s.clone()),
                    _ => return Err(invalid(name, "expected an array of strings")),
                }
            }
            out
        }
        Some(_) => return Err(invalid(name, "expected a comma-separated string or an array")),
    };

    Ok(raw.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
}

/// Map field with values kept as submitted.
pub fn raw_map(fields: &FieldMap, name: &str) -> Result<BTreeMap<String, Value>> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(map)) => Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        Some(_) => Err(invalid(name, "expected an object")),
    }
}

/// Map field with every value rendered as a string.
pub fn string_map(fields: &FieldMap, name: &str) -> Result<BTreeMap<String, String>> {
    raw_map(fields, name).map(stringify_values)
}

/// Boolean field. Accepts `true`/`false`, `"true"`/`"false"` and `0`/`1`.
pub fn bool_field(fields: &FieldMap, name: &str, default: bool) -> Result<bool> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "true" | "1" | "t" => Ok(true),
            "false" | "0" | "f" => Ok(false),
            other => Err(invalid(name, format!("'{}' is not a boolean", other))),
        },
        Some(Value::Number(n)) => match n.as_u64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(invalid(name, format!("'{}' is not a boolean", n))),
        },
        Some(_) => Err(invalid(name, "expected a boolean")),
    }
}

/// Optional duration field, as a duration string or whole seconds.
///
/// An empty string, an explicit zero duration such as `"0s"`, and the number
/// `0` all mean unset. For `ttl` that selects the role TTL; for
/// `safety_buffer` it is reported as a missing field.
pub fn duration_field(fields: &FieldMap, name: &str) -> Result<Option<Duration>> {
    match fields.get(name) {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(0) => Ok(None),
            Some(secs) => Ok(Some(Duration::from_secs(secs))),
            None => Err(SshCaError::InvalidTtl {
                field: name.to_string(),
                reason: format!("'{}' is not a whole number of seconds", n),
            }),
        },
        _ => {
            let value = string_field(fields, name)?;
            Ok(parse_optional_duration(name, value.as_deref())?.filter(|d| !d.is_zero()))
        }
    }
}

/// Duration field kept as text for role storage. Whole seconds become `"<n>s"`.
fn duration_text(fields: &FieldMap, name: &str) -> Result<Option<String>> {
    match fields.get(name) {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(secs) => Ok(Some(format!("{}s", secs))),
            None => Err(SshCaError::InvalidTtl {
                field: name.to_string(),
                reason: format!("'{}' is not a whole number of seconds", n),
            }),
        },
        _ => string_field(fields, name),
    }
}

/// Build a CA configuration request.
pub fn parse_configure_request(fields: &FieldMap) -> Result<ConfigureCaRequest> {
    Ok(ConfigureCaRequest {
        public_key: required_string(fields, "public_key")?,
        private_key: required_string(fields, "private_key")?,
    })
}

/// Build a role write request.
pub fn parse_role_request(name: &str, fields: &FieldMap) -> Result<CreateRoleRequest> {
    Ok(CreateRoleRequest {
        name: name.to_string(),
        ttl: duration_text(fields, "ttl")?,
        max_ttl: duration_text(fields, "max_ttl")?,
        allowed_critical_options: comma_list(fields, "allowed_critical_options")?,
        allowed_extensions: comma_list(fields, "allowed_extensions")?,
        default_critical_options: raw_map(fields, "default_critical_options")?,
        default_extensions: raw_map(fields, "default_extensions")?,
        allow_user_certificates: bool_field(fields, "allow_user_certificates", true)?,
        allow_host_certificates: bool_field(fields, "allow_host_certificates", true)?,
        allowed_valid_principals: comma_list(fields, "allowed_valid_principals")?,
        allow_bare_domains: bool_field(fields, "allow_bare_domains", false)?,
        allow_subdomains: bool_field(fields, "allow_subdomains", false)?,
    })
}

/// Build a signing request.
///
/// An absent or empty `key_id` falls back to `display_name` when one is known.
pub fn parse_sign_request(role: &str, fields: &FieldMap, display_name: Option<&str>) -> Result<SignRequest> {
    let cert_type = match string_field(fields, "cert_type")? {
        Some(value) if !value.trim().is_empty() => value.parse::<CertType>()?,
        _ => CertType::User,
    };

    let key_id = string_field(fields, "key_id")?
        .filter(|id| !id.is_empty())
        .or_else(|| display_name.filter(|n| !n.is_empty()).map(str::to_string));

    Ok(SignRequest {
        role: role.to_string(),
        public_key: required_string(fields, "public_key")?,
        key_id,
        cert_type,
        valid_principals: comma_list(fields, "valid_principals")?,
        critical_options: string_map(fields, "critical_options")?,
        extensions: string_map(fields, "extensions")?,
        ttl: duration_field(fields, "ttl")?,
    })
}

/// Extract the serial number of a revoke request.
pub fn parse_serial_number(fields: &FieldMap) -> Result<String> {
    Ok(string_field(fields, "serial_number")?.unwrap_or_default())
}

/// Build a tidy request. `safety_buffer` is required.
pub fn parse_tidy_request(fields: &FieldMap) -> Result<TidyRequest> {
    let safety_buffer = duration_field(fields, "safety_buffer")?.ok_or_else(|| SshCaError::MissingField {
        field: "safety_buffer".to_string(),
    })?;

    Ok(TidyRequest {
        tidy_cert_store: bool_field(fields, "tidy_cert_store", false)?,
        tidy_revocation_list: bool_field(fields, "tidy_revocation_list", false)?,
        safety_buffer,
        rebuild_crl: bool_field(fields, "rebuild_crl", false)?,
    })
}
