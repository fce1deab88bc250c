//! Implementation of the corridor engine traits for EVM chains: the
//! `exec768()` transfer and governance encodings, on-chain relay quotes,
//! Permit2 gasless messages and the contract's storage layout.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub use codec::*;
pub use gasless::*;
pub use governance::*;
pub use provider::*;
pub use quote_relay::*;
pub use signer::*;
pub use storage::*;
pub use transfer::*;

mod codec;
mod gasless;
mod governance;
mod provider;
mod quote_relay;
mod signer;
mod storage;
mod transfer;
