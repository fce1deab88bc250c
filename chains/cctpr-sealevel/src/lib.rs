//! Implementation of the corridor engine for the Solana relayer program:
//! program derived addresses, decoding of the config and price oracle
//! accounts, local computation of the on-chain relay fee, and the
//! `transfer_with_relay` and governance instruction builders.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub use accounts::*;
pub use cctp::*;
pub use client::*;
pub use error::*;
pub use governance::*;
pub use instruction::*;
pub use pda::*;
pub use quote_relay::*;
pub use transfer::*;

mod accounts;
mod cctp;
mod client;
mod error;
mod governance;
mod instruction;
mod pda;
mod quote_relay;
mod transfer;

use cctpr_core::H256;
use solana_program::pubkey::Pubkey;

/// Converts a universal address into a Solana pubkey.
pub fn to_pubkey(address: H256) -> Pubkey {
    Pubkey::new_from_array(address.0)
}

/// Converts a Solana pubkey into a universal address.
pub fn to_universal(pubkey: &Pubkey) -> H256 {
    H256(pubkey.to_bytes())
}
