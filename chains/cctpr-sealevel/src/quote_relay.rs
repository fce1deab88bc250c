//! Local computation of the relay fee the relayer program charges when a
//! transfer is quoted on chain. All accounts are read in one round trip.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use solana_program::rent::Rent;
use tracing::{debug, instrument};

use cctpr_core::{
    AccountReader, Amount, CctprError, CctprResult, Conversion, Corridor, FeeAdjustmentType,
    FeeCurrency, Kind, KnownDomain, Platform, RelayQuery, RelayQuoter, Rounding, HOP_DOMAIN, U256,
};

use crate::{
    accounts::{
        ChainConfigAccount, DiscriminatorData, EvmPrices, OracleConfigAccount, PlatformPrices,
        PricesAccount, SuiPrices,
    },
    client::SealevelClient,
    to_universal,
};

/// Gas of a `v1` delivery on an EVM destination.
pub const EVM_V1_GAS: u64 = 165_000;
/// Gas of a `v2Direct` delivery on an EVM destination.
pub const EVM_V2_GAS: u64 = 175_000;
/// Extra gas of a delivery with gas dropoff.
pub const EVM_GAS_DROPOFF_GAS: u64 = 22_000;
/// Gas of the hop leg on Avalanche.
pub const AVAX_HOP_GAS: u64 = 281_200;
/// Billed transaction bytes of a `v1` delivery.
pub const EVM_V1_TX_BYTES: u64 = 664;
/// Billed transaction bytes of a `v2Direct` delivery.
pub const EVM_V2_TX_BYTES: u64 = 793;

/// Compute units of a Sui delivery.
pub const SUI_COMPUTE_UNITS: u64 = 2_000;
/// Extra compute units with gas dropoff.
pub const SUI_GAS_DROPOFF_COMPUTE_UNITS: u64 = 1_000;
/// Bytes a Sui delivery stores.
pub const SUI_STORAGE_BYTES: u64 = 2_363;
/// Extra bytes stored with gas dropoff.
pub const SUI_GAS_DROPOFF_STORAGE_BYTES: u64 = 260;
/// Bytes a Sui delivery deletes.
pub const SUI_REBATE_BYTES: u64 = 1_979;
/// Extra bytes deleted with gas dropoff.
pub const SUI_GAS_DROPOFF_REBATE_BYTES: u64 = 260;
/// Floor of any Sui transaction, in MIST.
pub const SUI_MIN_TRANSACTION_COST_MIST: u64 = 2_000;

/// Size of the bridge message account of a `v1` burn.
pub const V1_MESSAGE_ACCOUNT_SIZE: usize = 292;
/// Size of the bridge message account of a `v2` burn.
pub const V2_MESSAGE_ACCOUNT_SIZE: usize = 428;
/// Hook data of a hop: final domain, recipient and gas dropoff.
pub const HOP_HOOK_DATA_SIZE: usize = 1 + 32 + 4;

const MICRO_PER_WHOLE: u64 = 1_000_000;
const WEI_PER_MWEI: u64 = 1_000_000;

/// Lamports locked in the bridge message account of a transfer over
/// `corridor`. Refunded to the rent custodian once the message is reclaimed,
/// and not part of [`SealevelRelayQuoter`] quotes.
pub fn cctp_message_rent_cost(corridor: Corridor) -> Amount {
    let size = match corridor {
        Corridor::V1 => V1_MESSAGE_ACCOUNT_SIZE,
        Corridor::V2Direct => V2_MESSAGE_ACCOUNT_SIZE,
        Corridor::AvaxHop => V2_MESSAGE_ACCOUNT_SIZE + HOP_HOOK_DATA_SIZE,
    };
    Amount::new(
        Kind::NativeGasToken(KnownDomain::Solana),
        Rent::default().minimum_balance(size),
    )
}

fn stale(domain: KnownDomain, what: &str) -> CctprError {
    CctprError::StalePriceData(format!("{what} of {domain}"))
}

/// µUSDC per whole gas token of `domain`.
fn gas_token_to_usdc(domain: KnownDomain, prices: &PricesAccount) -> CctprResult<Conversion> {
    let kind = Kind::NativeGasToken(domain);
    Conversion::from_atomic_ratio(
        kind,
        Kind::Usdc,
        prices.gas_token_price.into(),
        U256::exp10(kind.decimals() as usize),
    )
}

/// µUSDC cost of `gas` and `tx_bytes` on an EVM domain.
pub fn evm_execution_fee(
    domain: KnownDomain,
    gas: u64,
    tx_bytes: u64,
    gas_token_price: &Conversion,
    prices: &EvmPrices,
) -> CctprResult<Amount> {
    let token = Kind::NativeGasToken(domain);
    let per_gas = Conversion::from_atomic_ratio(
        Kind::Gas,
        token,
        U256::from(prices.gas_price) * WEI_PER_MWEI,
        U256::one(),
    )?;
    let per_byte = Conversion::from_atomic_ratio(
        Kind::Byte,
        token,
        U256::from(prices.price_per_tx_byte) * WEI_PER_MWEI,
        U256::one(),
    )?;
    let wei = per_gas
        .apply(&Amount::new(Kind::Gas, gas), Rounding::Floor)?
        .checked_add(&per_byte.apply(&Amount::new(Kind::Byte, tx_bytes), Rounding::Floor)?)?;
    wei.convert(gas_token_price, Rounding::Floor)
}

/// µUSDC cost of a Sui transaction. Deleted bytes earn back `rebate_ratio`
/// of their storage price.
pub fn sui_execution_fee(
    compute_units: u64,
    storage_bytes: u64,
    rebate_bytes: u64,
    gas_token_price: &Conversion,
    prices: &SuiPrices,
) -> CctprResult<Amount> {
    let mist = Kind::NativeGasToken(KnownDomain::Sui);
    let rebated = Amount::new(Kind::Byte, rebate_bytes)
        .mul_percentage(&Amount::percent(prices.rebate_ratio.into()), Rounding::Floor)?;
    let billed_bytes = Amount::new(Kind::Byte, storage_bytes).saturating_sub(&rebated)?;
    let per_unit = Conversion::from_atomic_ratio(
        Kind::ComputeUnit,
        mist,
        prices.compute_unit_price.into(),
        U256::one(),
    )?;
    let per_byte =
        Conversion::from_atomic_ratio(Kind::Byte, mist, prices.byte_price.into(), U256::one())?;
    let cost = per_unit
        .apply(&Amount::new(Kind::ComputeUnit, compute_units), Rounding::Floor)?
        .checked_add(&per_byte.apply(&billed_bytes, Rounding::Floor)?)?;
    let minimum = Amount::new(mist, SUI_MIN_TRANSACTION_COST_MIST);
    let cost = if cost.atomic() < minimum.atomic() {
        minimum
    } else {
        cost
    };
    cost.convert(gas_token_price, Rounding::Floor)
}

/// The state one quote depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteSnapshot {
    /// Price oracle config
    pub oracle_config: OracleConfigAccount,
    /// Prices of every involved domain that has them. Only read when a fee
    /// adjustment scales the converted cost.
    pub prices: BTreeMap<KnownDomain, PricesAccount>,
    /// Chain config of every destination
    pub chain_configs: BTreeMap<KnownDomain, ChainConfigAccount>,
}

impl QuoteSnapshot {
    fn prices(&self, domain: KnownDomain) -> CctprResult<&PricesAccount> {
        self.prices
            .get(&domain)
            .ok_or_else(|| CctprError::MissingAccount(format!("prices of {domain}")))
    }

    fn chain_config(&self, domain: KnownDomain) -> CctprResult<&ChainConfigAccount> {
        self.chain_configs
            .get(&domain)
            .ok_or_else(|| CctprError::MissingAccount(format!("chain config of {domain}")))
    }

    /// µUSDC per SOL.
    pub fn sol_price(&self) -> CctprResult<Conversion> {
        if self.oracle_config.sol_price == 0 {
            return Err(stale(KnownDomain::Solana, "gas token price"));
        }
        let lamports = Kind::NativeGasToken(KnownDomain::Solana);
        Conversion::from_atomic_ratio(
            lamports,
            Kind::Usdc,
            self.oracle_config.sol_price.into(),
            U256::exp10(lamports.decimals() as usize),
        )
    }

    fn execution_fee(
        &self,
        domain: KnownDomain,
        corridor: Corridor,
        with_gas_dropoff: bool,
    ) -> CctprResult<Amount> {
        let prices = self.prices(domain)?;
        let gas_token_price = gas_token_to_usdc(domain, prices)?;
        match prices.platform_prices(domain.platform())? {
            PlatformPrices::Evm(evm) => {
                let (gas, tx_bytes) = match corridor {
                    Corridor::V2Direct => (EVM_V2_GAS, EVM_V2_TX_BYTES),
                    Corridor::V1 | Corridor::AvaxHop => (EVM_V1_GAS, EVM_V1_TX_BYTES),
                };
                let gas = if with_gas_dropoff {
                    gas + EVM_GAS_DROPOFF_GAS
                } else {
                    gas
                };
                evm_execution_fee(domain, gas, tx_bytes, &gas_token_price, &evm)
            }
            PlatformPrices::Sui(sui) => {
                let (compute_units, storage_bytes, rebate_bytes) = if with_gas_dropoff {
                    (
                        SUI_COMPUTE_UNITS + SUI_GAS_DROPOFF_COMPUTE_UNITS,
                        SUI_STORAGE_BYTES + SUI_GAS_DROPOFF_STORAGE_BYTES,
                        SUI_REBATE_BYTES + SUI_GAS_DROPOFF_REBATE_BYTES,
                    )
                } else {
                    (SUI_COMPUTE_UNITS, SUI_STORAGE_BYTES, SUI_REBATE_BYTES)
                };
                sui_execution_fee(
                    compute_units,
                    storage_bytes,
                    rebate_bytes,
                    &gas_token_price,
                    &sui,
                )
            }
        }
    }

    fn hop_fee(&self) -> CctprResult<Amount> {
        let prices = self.prices(HOP_DOMAIN)?;
        match prices.platform_prices(HOP_DOMAIN.platform())? {
            PlatformPrices::Evm(evm) => evm_execution_fee(
                HOP_DOMAIN,
                AVAX_HOP_GAS,
                0,
                &gas_token_to_usdc(HOP_DOMAIN, prices)?,
                &evm,
            ),
            PlatformPrices::Sui(_) => Err(stale(HOP_DOMAIN, "evm prices")),
        }
    }

    /// The µUSDC relay fee of `query`, exactly as the program computes it.
    /// Destination prices are only read when the relative part of the matching
    /// adjustment is non-zero, so a flat fee needs no prices.
    pub fn usdc_relay_fee(&self, query: &RelayQuery) -> CctprResult<Amount> {
        query.gas_dropoff.ensure_kind(Kind::GenericGasToken)?;
        let chain_config = self.chain_config(query.destination)?;
        let with_gas_dropoff = !query.gas_dropoff.is_zero();

        let corridor_adjustment = chain_config.fee_adjustment(query.corridor.into())?;
        let mut execution_fee = if corridor_adjustment.relative.is_zero() {
            Amount::usdc(0)
        } else {
            self.execution_fee(query.destination, query.corridor, with_gas_dropoff)?
        };
        if query.corridor == Corridor::AvaxHop {
            execution_fee = execution_fee.checked_add(&self.hop_fee()?)?;
        }
        let fee = corridor_adjustment.apply(&execution_fee)?;
        if !with_gas_dropoff {
            return Ok(fee);
        }

        let dropoff_adjustment = chain_config.fee_adjustment(FeeAdjustmentType::GasDropoff)?;
        let dropoff_cost = if dropoff_adjustment.relative.is_zero() {
            Amount::usdc(0)
        } else {
            let per_gas_token = Conversion::from_atomic_ratio(
                Kind::GenericGasToken,
                Kind::Usdc,
                self.prices(query.destination)?.gas_token_price.into(),
                MICRO_PER_WHOLE.into(),
            )?;
            query.gas_dropoff.convert(&per_gas_token, Rounding::Floor)?
        };
        fee.checked_add(&dropoff_adjustment.apply(&dropoff_cost)?)
    }

    /// The relay fee of `query` in the currency it asks for. Lamports are
    /// floored like the program's own conversion.
    pub fn relay_fee(&self, query: &RelayQuery) -> CctprResult<Amount> {
        let usdc = self.usdc_relay_fee(query)?;
        match query.currency {
            FeeCurrency::Usdc => Ok(usdc),
            FeeCurrency::GasToken => usdc.convert(&self.sol_price()?.inverse()?, Rounding::Floor),
        }
    }
}

/// Quotes relays out of Solana by reading the oracle and relayer accounts.
#[derive(Debug)]
pub struct SealevelRelayQuoter<R> {
    client: Arc<SealevelClient<R>>,
}

impl<R> SealevelRelayQuoter<R>
where
    R: AccountReader,
{
    /// A quoter reading through `client`.
    pub fn new(client: Arc<SealevelClient<R>>) -> Self {
        Self { client }
    }

    /// Fetches everything `queries` depend on in a single multi-account read:
    /// the oracle config, the prices of every involved domain, then the chain
    /// config of every destination. Absent prices are left out of the snapshot.
    #[instrument(err, skip(self, queries), fields(queries = queries.len()))]
    pub async fn snapshot(&self, queries: &[RelayQuery]) -> CctprResult<QuoteSnapshot> {
        let destinations = queries.iter().map(|q| q.destination).collect::<BTreeSet<_>>();
        let mut domains = destinations.clone();
        if queries.iter().any(|q| q.corridor == Corridor::AvaxHop) {
            domains.insert(HOP_DOMAIN);
        }
        if let Some(solana) = domains.iter().find(|d| d.platform() == Platform::Solana) {
            return Err(CctprError::SameDomain(*solana));
        }

        let addresses = self.client.addresses();
        let mut keys = vec![addresses.oracle_config()];
        for domain in &domains {
            keys.push(addresses.domain(*domain)?.prices);
        }
        for domain in &destinations {
            keys.push(addresses.domain(*domain)?.chain_config);
        }
        let universal = keys.iter().map(to_universal).collect::<Vec<_>>();
        let data = self.client.reader().get_multiple_accounts(&universal).await?;
        if data.len() != keys.len() {
            return Err(CctprError::MissingAccount(format!(
                "{} of {} accounts returned",
                data.len(),
                keys.len()
            )));
        }

        let oracle_config = OracleConfigAccount::decode_required(data[0].as_deref(), &keys[0])?;
        let mut snapshot = QuoteSnapshot {
            oracle_config,
            prices: BTreeMap::new(),
            chain_configs: BTreeMap::new(),
        };
        let chain_configs_at = 1 + domains.len();
        for (i, domain) in domains.iter().enumerate() {
            if let Some(data) = data[1 + i].as_deref() {
                snapshot.prices.insert(*domain, PricesAccount::decode(data)?);
            }
        }
        for (i, domain) in destinations.into_iter().enumerate() {
            let at = chain_configs_at + i;
            let chain_config = ChainConfigAccount::decode_required(data[at].as_deref(), &keys[at])?;
            if let Some(prices) = snapshot.prices.get(&domain) {
                if prices.chain_id != chain_config.chain_id {
                    return Err(stale(domain, "chain id"));
                }
            }
            snapshot.chain_configs.insert(domain, chain_config);
        }
        Ok(snapshot)
    }

    /// µUSDC fees of `queries` and the SOL price they were computed against.
    pub async fn quote_on_chain_relay(
        &self,
        queries: &[RelayQuery],
    ) -> CctprResult<(Vec<Amount>, Conversion)> {
        let snapshot = self.snapshot(queries).await?;
        let fees = queries
            .iter()
            .map(|query| snapshot.usdc_relay_fee(query))
            .collect::<CctprResult<Vec<_>>>()?;
        Ok((fees, snapshot.sol_price()?))
    }
}

#[async_trait]
impl<R> RelayQuoter for SealevelRelayQuoter<R>
where
    R: AccountReader + Debug,
{
    fn source(&self) -> KnownDomain {
        KnownDomain::Solana
    }

    #[instrument(err, skip(self), fields(queries = queries.len()))]
    async fn quote_relay(&self, queries: &[RelayQuery]) -> CctprResult<Vec<Amount>> {
        if queries.is_empty() {
            return Ok(vec![]);
        }
        let snapshot = self.snapshot(queries).await?;
        let fees = queries
            .iter()
            .map(|query| snapshot.relay_fee(query))
            .collect::<CctprResult<Vec<_>>>()?;
        debug!(?fees, "Quoted relay from account state");
        Ok(fees)
    }
}
