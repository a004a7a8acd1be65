//! Shared definitions for minemesh peers.
//!
//! Every peer keeps a local replica of the shared board, so the data model
//! ([`models`]), the fixed-width wire codec ([`codec`]) and the broadcast
//! protocol surface ([`protocol`]) live in one crate to keep replicas
//! byte-compatible on the wire.

pub mod codec;
pub mod error;
pub mod models;
pub mod protocol;
