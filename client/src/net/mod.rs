//! Networking modules for the finance REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `transport` performs raw HTTP, `authorized` layers credentials and 401
//! handling on top, `error` defines the outcome taxonomy, `types` the wire
//! payloads, and `api` the typed endpoint wrappers.

pub mod api;
pub mod authorized;
pub mod error;
pub mod transport;
pub mod types;

#[cfg(test)]
mod mock_transport;
