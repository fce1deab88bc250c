//! This crate wires the corridor engine together for a running service: it
//! loads settings, installs the tracing subscriber, builds the immutable
//! domain registry and exposes the [`CorridorEngine`] facade that quotes
//! corridors and composes transfers for every configured source chain.

// Forbid unsafe code outside of tests
#![cfg_attr(not(test), forbid(unsafe_code))]
#![warn(missing_docs)]

pub mod settings;

mod engine;
pub use engine::*;
