use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::{Amount, CctprError, CctprResult, KnownDomain, Network, Platform};

/// Domain every `avaxHop` transfer is routed through.
pub const HOP_DOMAIN: KnownDomain = KnownDomain::Avalanche;

/// Bridge protocol versions a domain can speak.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// Legacy, slow attestation
    V1,
    /// Fast-transfer capable
    V2,
}

/// Static facts about one domain on one network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainInfo {
    /// The domain
    pub domain: KnownDomain,
    /// Whether the relayer serves this domain at all
    pub relayer_supported: bool,
    /// Whether the legacy protocol is deployed
    pub v1: bool,
    /// Whether the fast protocol is deployed
    pub v2: bool,
    /// Maximum gas dropoff, µGasToken
    pub gas_dropoff_limit: Amount,
    /// Time the relayer needs after attestation
    pub relay_overhead: Duration,
    /// Expected attestation time for a legacy burn on this domain
    pub v1_attestation: Option<Duration>,
    /// Expected attestation time for a fast burn on this domain
    pub v2_attestation: Option<Duration>,
}

impl DomainInfo {
    /// Whether the domain speaks `version`.
    pub fn supports(&self, version: ProtocolVersion) -> bool {
        match version {
            ProtocolVersion::V1 => self.v1,
            ProtocolVersion::V2 => self.v2,
        }
    }
}

/// Settings-level tweaks applied on top of the static tables.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryOverrides {
    /// Gas dropoff limit per domain, µGasToken
    #[serde(default)]
    pub gas_dropoff_limits: HashMap<KnownDomain, u64>,
    /// Relay overhead per domain, seconds
    #[serde(default)]
    pub relay_overhead_secs: HashMap<KnownDomain, u64>,
}

/// The immutable set of domains the engine knows about. Built once at start and
/// shared by reference.
#[derive(Clone, Debug)]
pub struct DomainRegistry {
    network: Network,
    domains: BTreeMap<KnownDomain, DomainInfo>,
}

const fn relayer_supported(domain: KnownDomain) -> bool {
    use KnownDomain::*;

    !matches!(domain, Noble | Sui | Aptos)
}

const fn supports_v1(domain: KnownDomain) -> bool {
    use KnownDomain::*;

    !matches!(domain, Linea | Codex | Sonic | Worldchain)
}

/// Gas dropoff limit in µGasToken.
fn gas_dropoff_limit(network: Network, domain: KnownDomain) -> u64 {
    match (network, domain.platform()) {
        _ if domain == KnownDomain::Ethereum && network == Network::Mainnet => 1_509,
        _ if domain == KnownDomain::Ethereum => 15_090,
        (_, Platform::Solana) => 100_000,
        (_, Platform::Evm) => 1_510,
        _ => 0,
    }
}

/// Legacy attestation estimates in milliseconds. Hard finality on the source.
fn v1_attestation_ms(domain: KnownDomain) -> Option<u64> {
    use KnownDomain::*;

    Some(match domain {
        Ethereum | Optimism | Arbitrum | Base | Unichain => 1_140_000,
        Avalanche => 20_000,
        Polygon => 480_000,
        Solana => 25_000,
        _ => return None,
    })
}

/// Fast attestation estimates in milliseconds.
fn v2_attestation_ms(network: Network, domain: KnownDomain) -> Option<u64> {
    use KnownDomain::*;
    use Network::*;

    if !relayer_supported(domain) {
        return None;
    }
    Some(match (network, domain) {
        (Mainnet, Ethereum) => 13_250,
        (Mainnet, Avalanche) => 100_000,
        (Mainnet, Arbitrum) => 4_710,
        (Mainnet, Base) => 4_990,
        (Mainnet, Linea) => 1_850,
        (Mainnet, Optimism) => 3_290,
        (Mainnet, Unichain) => 3_750,
        (Mainnet, Polygon) => 31_590,
        (Mainnet, Worldchain) => 2_220,
        (Mainnet, Sonic) => 3_320,
        (Mainnet, Codex) => 10_000,
        (Mainnet, Solana) => 8_000,
        (Testnet, Ethereum) => 16_760,
        (Testnet, Avalanche) => 8_190,
        (Testnet, Arbitrum) => 3_180,
        (Testnet, Base) => 1_430,
        (Testnet, Optimism) => 850,
        (Testnet, Polygon) => 9_040,
        _ => 8_000,
    })
}

fn relay_overhead(network: Network) -> Duration {
    match network {
        Network::Mainnet => Duration::from_secs(30),
        Network::Testnet => Duration::from_secs(6),
    }
}

impl DomainRegistry {
    /// The registry of `network` from the static tables.
    pub fn new(network: Network) -> Self {
        Self::with_overrides(network, &RegistryOverrides::default())
    }

    /// The registry of `network` with settings overrides applied.
    pub fn with_overrides(network: Network, overrides: &RegistryOverrides) -> Self {
        let domains = KnownDomain::iter()
            .map(|domain| {
                let relayer_supported = relayer_supported(domain);
                let dropoff = overrides
                    .gas_dropoff_limits
                    .get(&domain)
                    .copied()
                    .unwrap_or_else(|| gas_dropoff_limit(network, domain));
                let overhead = overrides
                    .relay_overhead_secs
                    .get(&domain)
                    .map(|secs| Duration::from_secs(*secs))
                    .unwrap_or_else(|| relay_overhead(network));
                let info = DomainInfo {
                    domain,
                    relayer_supported,
                    v1: supports_v1(domain),
                    v2: relayer_supported,
                    gas_dropoff_limit: Amount::generic_gas_token(dropoff),
                    relay_overhead: overhead,
                    v1_attestation: v1_attestation_ms(domain).map(Duration::from_millis),
                    v2_attestation: v2_attestation_ms(network, domain).map(Duration::from_millis),
                };
                (domain, info)
            })
            .collect();
        Self { network, domains }
    }

    /// The network this registry describes
    pub fn network(&self) -> Network {
        self.network
    }

    /// Static facts about `domain`.
    pub fn info(&self, domain: KnownDomain) -> CctprResult<&DomainInfo> {
        self.domains
            .get(&domain)
            .ok_or(CctprError::UnknownDomainId(domain.into()))
    }

    /// Whether `domain` speaks `version`.
    pub fn supports(&self, domain: KnownDomain, version: ProtocolVersion) -> bool {
        self.domains
            .get(&domain)
            .map_or(false, |info| info.supports(version))
    }

    /// Domains with a legacy attestation fast enough that a v2 corridor buys
    /// nothing when the destination speaks v1.
    pub fn is_fast_domain(&self, domain: KnownDomain) -> bool {
        domain == KnownDomain::Avalanche
    }

    /// All domains the relayer serves.
    pub fn supported_domains(&self) -> impl Iterator<Item = &DomainInfo> {
        self.domains.values().filter(|info| info.relayer_supported)
    }
}
