//! Serial number rendering.

/// Render a certificate serial as 16 lowercase hex digits.
///
/// This is the caller-visible serial and the storage key suffix under
/// `certs/` and `revoked/`.
#[inline]
pub fn format_serial(serial: u64) -> String {
    format!("{:016x}", serial)
}
