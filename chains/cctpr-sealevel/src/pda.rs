use std::collections::HashMap;

use parking_lot::RwLock;
use solana_program::{program_error::ProgramError, pubkey, pubkey::Pubkey};

use cctpr_core::{CctprError, CctprResult, KnownDomain, Network};

/// The price oracle deployment shared by both networks.
pub const DEFAULT_ORACLE_PROGRAM_ID: Pubkey = pubkey!("xpo8sHWHkfS6NpVsYwE2t5pTvvdTHSdWUdxh2RtsT1H");

/// Gets the PDA seeds for the relayer program's config account.
#[macro_export]
macro_rules! cctpr_config_pda_seeds {
    () => {{
        &[b"config"]
    }};

    ($bump_seed:expr) => {{
        &[b"config", &[$bump_seed]]
    }};
}

/// Gets the PDA seeds for the account holding the rent of message accounts.
#[macro_export]
macro_rules! rent_custodian_pda_seeds {
    () => {{
        &[b"rent"]
    }};

    ($bump_seed:expr) => {{
        &[b"rent", &[$bump_seed]]
    }};
}

/// Gets the PDA seeds for the chain config of a destination domain.
#[macro_export]
macro_rules! chain_config_pda_seeds {
    ($domain_id:expr) => {{
        &[b"chain_config", &[$domain_id]]
    }};

    ($domain_id:expr, $bump_seed:expr) => {{
        &[b"chain_config", &[$domain_id], &[$bump_seed]]
    }};
}

/// Gets the PDA seeds for the bridge message account of a transfer.
#[macro_export]
macro_rules! event_data_pda_seeds {
    ($user:expr, $seed:expr) => {{
        &[$user.as_ref(), $seed.as_ref()]
    }};

    ($user:expr, $seed:expr, $bump_seed:expr) => {{
        &[$user.as_ref(), $seed.as_ref(), &[$bump_seed]]
    }};
}

/// Gets the PDA seeds for an Anchor event authority.
#[macro_export]
macro_rules! event_authority_pda_seeds {
    () => {{
        &[b"__event_authority"]
    }};
}

/// Gets the PDA seeds for the price oracle's config account.
#[macro_export]
macro_rules! oracle_config_pda_seeds {
    () => {{
        &[b"config"]
    }};
}

/// Gets the PDA seeds for the prices of a chain, keyed by its oracle chain id.
#[macro_export]
macro_rules! oracle_prices_pda_seeds {
    ($chain_id:expr) => {{
        &[b"prices", &u16::to_be_bytes($chain_id)]
    }};
}

pub(crate) fn find_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8), ProgramError> {
    Pubkey::try_find_program_address(seeds, program_id).ok_or(ProgramError::InvalidSeeds)
}

fn find(seeds: &[&[u8]], program_id: &Pubkey) -> CctprResult<Pubkey> {
    find_address(seeds, program_id)
        .map(|(address, _)| address)
        .map_err(crate::program_error)
}

/// Accounts of one foreign domain.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DomainAccounts {
    /// The relayer program's chain config
    pub chain_config: Pubkey,
    /// The oracle's prices
    pub prices: Pubkey,
}

/// The relayer and oracle programs on one network, with the addresses derived
/// from them memoized.
#[derive(Debug)]
pub struct ProgramAddresses {
    network: Network,
    cctpr: Pubkey,
    oracle: Pubkey,
    config: Pubkey,
    rent_custodian: (Pubkey, u8),
    event_authority: Pubkey,
    oracle_config: Pubkey,
    domains: RwLock<HashMap<KnownDomain, DomainAccounts>>,
}

impl ProgramAddresses {
    /// Derives the fixed addresses of `cctpr` and `oracle`.
    pub fn new(network: Network, cctpr: Pubkey, oracle: Pubkey) -> CctprResult<Self> {
        Ok(Self {
            network,
            cctpr,
            oracle,
            config: find(cctpr_config_pda_seeds!(), &cctpr)?,
            rent_custodian: find_address(rent_custodian_pda_seeds!(), &cctpr)
                .map_err(crate::program_error)?,
            event_authority: find(event_authority_pda_seeds!(), &cctpr)?,
            oracle_config: find(oracle_config_pda_seeds!(), &oracle)?,
            domains: Default::default(),
        })
    }

    /// Network
    pub fn network(&self) -> Network {
        self.network
    }

    /// Relayer program
    pub fn cctpr(&self) -> Pubkey {
        self.cctpr
    }

    /// Price oracle program
    pub fn oracle(&self) -> Pubkey {
        self.oracle
    }

    /// Relayer config
    pub fn config(&self) -> Pubkey {
        self.config
    }

    /// Rent custodian and its bump
    pub fn rent_custodian(&self) -> (Pubkey, u8) {
        self.rent_custodian
    }

    /// Event authority of the relayer program
    pub fn event_authority(&self) -> Pubkey {
        self.event_authority
    }

    /// Oracle config
    pub fn oracle_config(&self) -> Pubkey {
        self.oracle_config
    }

    /// Chain config and prices of `domain`. Domains the oracle does not price
    /// have no accounts.
    pub fn domain(&self, domain: KnownDomain) -> CctprResult<DomainAccounts> {
        if let Some(accounts) = self.domains.read().get(&domain) {
            return Ok(*accounts);
        }
        let chain_id = domain
            .oracle_chain_id(self.network)
            .ok_or(CctprError::NoDeployment(domain))?;
        let accounts = DomainAccounts {
            chain_config: find(chain_config_pda_seeds!(domain.id()), &self.cctpr)?,
            prices: find(oracle_prices_pda_seeds!(chain_id), &self.oracle)?,
        };
        self.domains.write().insert(domain, accounts);
        Ok(accounts)
    }

    /// The message account of a transfer by `user` and its bump.
    pub fn event_data(&self, user: &Pubkey, seed: [u8; 4]) -> CctprResult<(Pubkey, u8)> {
        find_address(event_data_pda_seeds!(user, seed), &self.cctpr).map_err(crate::program_error)
    }
}
