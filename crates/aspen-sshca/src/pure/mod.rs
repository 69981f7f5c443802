//! Pure policy functions for the SSH CA engine.
//!
//! This module implements the "Functional Core, Imperative Shell" pattern:
//! every decision the signer, policy store, and tidy job make about a request
//! lives here as a deterministic function of its inputs. The async stores
//! around it only load records, call into this module, and persist results.
//!
//! # Module Organization
//!
//! - [`ttl`]: Duration parsing/formatting, role TTL clamping, effective TTL,
//!   validity window
//! - [`principals`]: Principal allow-rule matching
//! - [`options`]: Critical option / extension resolution against allow-lists
//! - [`expiry`]: Tidy eligibility
//! - [`serial`]: Serial number rendering
//!
//! # Tiger Style
//!
//! - Time is passed explicitly (no calls to system time)
//! - Saturating arithmetic on timestamps
//! - No panics - all functions are total

pub mod expiry;
pub mod options;
pub mod principals;
pub mod serial;
pub mod ttl;

pub use expiry::is_past_safety_buffer;
pub use options::resolve_options;
pub use options::stringify_values;
pub use principals::PrincipalPolicy;
pub use principals::find_disallowed_principal;
pub use principals::is_principal_allowed;
pub use serial::format_serial;
pub use ttl::RoleTtls;
pub use ttl::ValidityWindow;
pub use ttl::compute_validity_window;
pub use ttl::effective_ttl;
pub use ttl::format_duration;
pub use ttl::parse_duration;
pub use ttl::parse_optional_duration;
pub use ttl::resolve_role_ttls;
