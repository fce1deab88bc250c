//! This crate contains the core primitives, traits, and types of the corridor
//! quoting and transfer composition engine.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]
#![forbid(unsafe_code)]

pub use ethers_core::types::{Address, Signature, H160, H256, U256};

/// Typed fixed-point amounts
pub mod amount;
pub use amount::*;

mod chain;
pub use chain::*;

mod corridor;
pub use corridor::*;

mod error;
pub use error::*;

mod fee_adjustment;
pub use fee_adjustment::*;

mod governance;
pub use governance::*;

mod quote;
pub use quote::*;

mod registry;
pub use registry::*;

mod transfer;
pub use transfer::*;

/// Outbound collaborator traits
pub mod traits;
pub use traits::*;

/// Utilities
pub mod utils;

/// A 32 byte address as used by the bridge protocol for any platform.
pub type UniversalAddress = H256;
