//! Settings of a process hosting the corridor engine.
//!
//! ## Introduction
//!
//! The engine needs to know which network it serves, where the relayer is
//! deployed on every source chain it composes transfers for, and a handful of
//! operational knobs: gas dropoff limits and relay overheads overriding the
//! static domain tables, the lifetime of the off-chain quotes it signs, and
//! how to log. RPC connections are not part of these settings; the host hands
//! the engine its readers when building it.
//!
//! ### Configuration
//!
//! Settings are read from the config files, then from the environment.
//!
//! #### N.B.: Environment variable names correspond 1:1 with cfg file's JSON object hierarchy.
//!
//! Any environment variable prefixed with `CCTPR_` is read as an override of
//! the hierarchical structure of the json config. Keys are matched without
//! regard to case, so multi-word keys are written flat in the environment.
//!
//! For example, if the config file `mainnet.json` is:
//!
//! ```json
//! {
//!   "network": "mainnet",
//!   "overrides": {
//!     "gasDropoffLimits": {
//!       "base": 1510
//!     }
//!   }
//! }
//! ```
//!
//! then `CCTPR_OVERRIDES_GASDROPOFFLIMITS_BASE=2000` overrides the limit of
//! base to `2000`.
//!
//! ### Configuration value precedence
//!
//! Configuration key/value pairs are loaded in the following order, with later
//! sources taking precedence:
//!
//! 1. The files matching `config/*.json`, in lexical order.
//! 2. The order of configs in `CONFIG_FILES` with each sequential one
//!    overwriting previous ones as appropriate.
//! 3. Configuration env vars with the prefix `CCTPR`.
//!    E.g. `export CCTPR_QUOTE_VALIDITYSECS=120`

use std::{
    collections::{BTreeMap, HashMap},
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use eyre::{Context, Result};
use serde::Deserialize;
use solana_program::pubkey::Pubkey;

use cctpr_core::{
    AccountReader, ContractReader, DomainRegistry, FastBurnInfo, KnownDomain, Network,
    RegistryOverrides,
};
use cctpr_ethereum::EvmDeployment;
use cctpr_sealevel::{SealevelDeployment, DEFAULT_ORACLE_PROGRAM_ID};

pub use trace::*;

use crate::CorridorEngine;

pub mod loader;
/// Tracing subscriber management
mod trace;

/// How long a signed off-chain quote stays valid unless configured otherwise.
pub const DEFAULT_QUOTE_VALIDITY_SECS: u64 = 300;

/// Relayer deployments per platform.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractSettings {
    /// Relayer contracts on EVM domains
    #[serde(default)]
    pub evm: BTreeMap<KnownDomain, EvmDeployment>,
    /// The relayer program on Solana
    #[serde(default)]
    pub sealevel: Option<SealevelSettings>,
}

/// Program ids of the Solana deployment, base58.
#[derive(Debug, Clone, Deserialize)]
pub struct SealevelSettings {
    /// The relayer program
    pub cctpr: String,
    /// The price oracle program, the canonical one if unset
    #[serde(default)]
    pub oracle: Option<String>,
}

/// Overrides of the static domain tables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverrideSettings {
    /// Gas dropoff limit per domain, µGasToken
    #[serde(default, rename = "gasdropofflimits", alias = "gasDropoffLimits")]
    pub gas_dropoff_limits: HashMap<KnownDomain, u64>,
    /// Relay overhead per domain, seconds
    #[serde(default, rename = "relayoverheadsecs", alias = "relayOverheadSecs")]
    pub relay_overhead_secs: HashMap<KnownDomain, u64>,
}

impl From<&OverrideSettings> for RegistryOverrides {
    fn from(settings: &OverrideSettings) -> Self {
        RegistryOverrides {
            gas_dropoff_limits: settings.gas_dropoff_limits.clone(),
            relay_overhead_secs: settings.relay_overhead_secs.clone(),
        }
    }
}

/// Off-chain quote settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteSettings {
    /// Lifetime of a signed quote, seconds
    #[serde(
        default = "default_quote_validity",
        rename = "validitysecs",
        alias = "validitySecs"
    )]
    pub validity_secs: u64,
}

fn default_quote_validity() -> u64 {
    DEFAULT_QUOTE_VALIDITY_SECS
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self {
            validity_secs: DEFAULT_QUOTE_VALIDITY_SECS,
        }
    }
}

/// Chain access handed to the engine by its host.
#[derive(Debug, Clone, Default)]
pub struct ChainReaders {
    /// One contract reader per EVM domain
    pub evm: HashMap<KnownDomain, Arc<dyn ContractReader>>,
    /// The Solana account reader
    pub sealevel: Option<Arc<dyn AccountReader>>,
}

/// Settings shared by every process hosting the engine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Mainnet or testnet
    #[serde(default)]
    pub network: Network,
    /// Logging
    #[serde(default)]
    pub tracing: TracingConfig,
    /// Relayer deployments
    #[serde(default)]
    pub contracts: ContractSettings,
    /// Domain table overrides
    #[serde(default)]
    pub overrides: OverrideSettings,
    /// Off-chain quoting
    #[serde(default)]
    pub quote: QuoteSettings,
}

impl Settings {
    /// Load settings from `./config`, `CONFIG_FILES` and `CCTPR_*` env vars.
    pub fn load() -> Result<Self> {
        loader::load_settings()
    }

    /// The domain registry with overrides applied.
    pub fn registry(&self) -> DomainRegistry {
        DomainRegistry::with_overrides(self.network, &(&self.overrides).into())
    }

    /// Lifetime of the off-chain quotes the engine signs.
    pub fn quote_validity(&self) -> Duration {
        Duration::from_secs(self.quote.validity_secs)
    }

    /// The parsed Solana deployment, if configured.
    pub fn sealevel_deployment(&self) -> Result<Option<SealevelDeployment>> {
        let Some(sealevel) = &self.contracts.sealevel else {
            return Ok(None);
        };
        let cctpr = Pubkey::from_str(&sealevel.cctpr)
            .with_context(|| format!("Invalid relayer program id {}", sealevel.cctpr))?;
        let oracle = match &sealevel.oracle {
            Some(oracle) => Pubkey::from_str(oracle)
                .with_context(|| format!("Invalid oracle program id {oracle}"))?,
            None => DEFAULT_ORACLE_PROGRAM_ID,
        };
        Ok(Some(SealevelDeployment { cctpr, oracle }))
    }

    /// Builds the engine for every configured deployment. Each deployment
    /// needs a reader in `readers`.
    pub fn build_engine(
        &self,
        fast_burn: Arc<dyn FastBurnInfo>,
        readers: &ChainReaders,
    ) -> Result<CorridorEngine> {
        let mut engine =
            CorridorEngine::new(Arc::new(self.registry()), fast_burn, self.quote_validity());
        for (domain, deployment) in &self.contracts.evm {
            let reader = readers
                .evm
                .get(domain)
                .cloned()
                .ok_or_else(|| eyre::eyre!("No contract reader for {domain}"))?;
            engine = engine
                .with_evm_deployment(*domain, *deployment, reader)
                .with_context(|| format!("Invalid deployment on {domain}"))?;
        }
        if let Some(deployment) = self.sealevel_deployment()? {
            let reader = readers
                .sealevel
                .clone()
                .ok_or_else(|| eyre::eyre!("No account reader for solana"))?;
            engine = engine
                .with_sealevel_deployment(deployment, reader)
                .context("Invalid deployment on solana")?;
        }
        Ok(engine)
    }
}
