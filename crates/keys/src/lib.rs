//! Cache key derivation and filename helpers.
//!
//! Every resource the proxy caches lives in a directory named after a
//! [`compute_key`] digest of its URL. The escaping helpers mirror the URL
//! component encoding used when the proxy rewrites upstream URLs into local
//! request paths, and [`GarbleDetector`] decides whether a decoded URL fragment
//! is presentable as a filename or whether the hashed key should be used
//! instead.

pub mod error;
mod escape;
mod garble;
mod key;

pub use crate::escape::{decode, encode, try_decode};
pub use crate::garble::{DEFAULT_GARBLE_THRESHOLD, GarbleDetector, is_garbled};
pub use crate::key::{KEY_LENGTH, compute_key};
