#![allow(missing_docs)]

use std::fmt::{Debug, Formatter};

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::{utils::many_to_one, CctprError, H160, H256};

/// The two deployments every domain participates in.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    EnumString,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

/// All domains of the bridge protocol, keyed by their wire domain id.
#[derive(
    FromPrimitive,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Clone,
    Copy,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    EnumString,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum KnownDomain {
    Ethereum = 0,
    Avalanche = 1,
    Optimism = 2,
    Arbitrum = 3,
    Noble = 4,
    Solana = 5,
    Base = 6,
    Polygon = 7,
    Sui = 8,
    Aptos = 9,
    Unichain = 10,
    Linea = 11,
    Codex = 12,
    Sonic = 13,
    Worldchain = 14,
}

/// Execution families. `Evm` is the contract-storage/calldata model,
/// `Solana` the account/instruction model.
#[derive(
    FromPrimitive,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Debug,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    EnumString,
    IntoStaticStr,
    EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Platform {
    /// Contract-model chains.
    Evm,
    /// Account-model chain.
    Solana,
    /// Object-model chain, priced by the oracle but not a transfer source.
    Sui,
    /// Move chain, not a transfer source.
    Aptos,
    /// Cosmos chain, not a transfer source.
    Cosmos,
}

impl Platform {
    /// Decimals of the platform's native gas token.
    pub const fn gas_token_decimals(self) -> u32 {
        match self {
            Platform::Evm => 18,
            Platform::Solana | Platform::Sui => 9,
            Platform::Aptos => 8,
            Platform::Cosmos => 6,
        }
    }

    /// Formats a universal address the way the platform displays addresses.
    pub fn fmt_address(&self, addr: H256) -> String {
        match self {
            Platform::Evm => format!("{:?}", H160::from(addr)),
            _ => format!("{:?}", addr),
        }
    }
}

impl KnownDomain {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// The one-byte domain id used by all wire encodings.
    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn platform(self) -> Platform {
        use KnownDomain::*;

        many_to_one!(match self {
            Platform::Evm: [
                Ethereum, Avalanche, Optimism, Arbitrum, Base, Polygon, Unichain, Linea, Codex,
                Sonic, Worldchain,
            ],
            Platform::Solana: [Solana],
            Platform::Sui: [Sui],
            Platform::Aptos: [Aptos],
            Platform::Cosmos: [Noble],
        })
    }

    /// The chain id of EVM domains, as used in EIP-712 signing domains.
    pub const fn evm_chain_id(self, network: Network) -> Option<u64> {
        use KnownDomain::*;
        use Network::*;

        Some(match (network, self) {
            (Mainnet, Ethereum) => 1,
            (Mainnet, Avalanche) => 43114,
            (Mainnet, Optimism) => 10,
            (Mainnet, Arbitrum) => 42161,
            (Mainnet, Base) => 8453,
            (Mainnet, Polygon) => 137,
            (Mainnet, Unichain) => 130,
            (Mainnet, Linea) => 59144,
            (Mainnet, Codex) => 81224,
            (Mainnet, Sonic) => 146,
            (Mainnet, Worldchain) => 480,
            (Testnet, Ethereum) => 11155111,
            (Testnet, Avalanche) => 43113,
            (Testnet, Optimism) => 11155420,
            (Testnet, Arbitrum) => 421614,
            (Testnet, Base) => 84532,
            (Testnet, Polygon) => 80002,
            (Testnet, Unichain) => 1301,
            (Testnet, Linea) => 59141,
            (Testnet, Codex) => 812242,
            (Testnet, Sonic) => 57054,
            (Testnet, Worldchain) => 4801,
            _ => return None,
        })
    }

    /// The chain id the price oracle uses for this domain. Also used as the
    /// registered chain id in the contract-model extra chain table.
    pub const fn oracle_chain_id(self, network: Network) -> Option<u16> {
        use KnownDomain::*;
        use Network::*;

        Some(match (network, self) {
            (Mainnet, Ethereum) => 2,
            (Mainnet, Optimism) => 24,
            (Mainnet, Arbitrum) => 23,
            (Mainnet, Base) => 30,
            (Mainnet, Polygon) => 5,
            (Testnet, Ethereum) => 10002,
            (Testnet, Optimism) => 10005,
            (Testnet, Arbitrum) => 10003,
            (Testnet, Base) => 10004,
            (Testnet, Polygon) => 10007,
            (_, Avalanche) => 6,
            (_, Solana) => 1,
            (_, Sui) => 21,
            (_, Aptos) => 22,
            (_, Unichain) => 44,
            (_, Linea) => 38,
            (_, Codex) => 54,
            (_, Sonic) => 52,
            (_, Worldchain) => 45,
            (_, Noble) => return None,
        })
    }

    /// Reverse lookup of [`KnownDomain::oracle_chain_id`].
    pub fn from_oracle_chain_id(network: Network, chain_id: u16) -> Option<Self> {
        use strum::IntoEnumIterator;

        KnownDomain::iter().find(|d| d.oracle_chain_id(network) == Some(chain_id))
    }
}

impl TryFrom<u32> for KnownDomain {
    type Error = CctprError;

    fn try_from(domain_id: u32) -> Result<Self, Self::Error> {
        FromPrimitive::from_u32(domain_id).ok_or(CctprError::UnknownDomainId(domain_id))
    }
}

impl TryFrom<u8> for KnownDomain {
    type Error = CctprError;

    fn try_from(domain_id: u8) -> Result<Self, Self::Error> {
        Self::try_from(domain_id as u32)
    }
}

impl From<KnownDomain> for u32 {
    fn from(domain: KnownDomain) -> Self {
        domain as u32
    }
}

/// A domain together with the deployment it lives on.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct NetworkDomain {
    pub network: Network,
    pub domain: KnownDomain,
}

impl Debug for NetworkDomain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} ({})", self.network, self.domain, self.domain.id())
    }
}
