//! Entities returned by the RadosGW admin API.
//!
//! These are read-only views of remote state, decoded with `serde` and
//! rebuilt from scratch on every collection cycle. Fields the exporter does
//! not publish are kept where the gateway always sends them, everything else
//! is ignored during decoding.

pub mod bucket;
pub mod quota;
pub mod user;
