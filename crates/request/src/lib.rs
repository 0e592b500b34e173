//! Raw HTTP request parsing for the local video proxy.
//!
//! Players talk to the proxy with plain `GET` requests whose path carries the
//! (encoded) upstream resource URL. This crate pulls that path out of the raw
//! request preamble and unpacks it into the upstream URL and its cache key.

pub mod error;
mod line;
mod target;

pub use crate::line::{DEFAULT_BUFFER_SIZE, MAX_PREAMBLE_SIZE, extract_resource_url, extract_resource_url_from_bytes};
pub use crate::target::{PROXY_SEPARATOR, ProxiedTarget};
