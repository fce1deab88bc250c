use std::fmt::Debug;

use async_trait::async_trait;
use auto_impl::auto_impl;
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::{Amount, CctprResult, Corridor, KnownDomain};

/// Currency a relay fee is charged in.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FeeCurrency {
    /// USDC taken from the transfer
    Usdc,
    /// Gas token of the source chain, attached to the transaction
    GasToken,
}

/// One relay fee to quote on chain.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, new)]
pub struct RelayQuery {
    /// Where the relay executes
    pub destination: KnownDomain,
    /// Over which corridor
    pub corridor: Corridor,
    /// Requested gas dropoff, µGasToken
    pub gas_dropoff: Amount,
    /// Currency of the fee
    pub currency: FeeCurrency,
}

/// Computes the relay fee the source chain's program would charge right now.
#[async_trait]
#[auto_impl(&, Box, Arc)]
pub trait RelayQuoter: Send + Sync + Debug {
    /// The source domain the quotes are for
    fn source(&self) -> KnownDomain;

    /// Quotes all `queries` against a single consistent state read. The result
    /// has one entry per query, in order. USDC fees are `Kind::Usdc`, gas token
    /// fees are the source's native gas token.
    async fn quote_relay(&self, queries: &[RelayQuery]) -> CctprResult<Vec<Amount>>;
}

/// Fast transfer parameters published by the bridge protocol's attestation
/// service.
#[async_trait]
#[auto_impl(&, Box, Arc)]
pub trait FastBurnInfo: Send + Sync + Debug {
    /// Fast fee rate for burns from `source` minted on `destination`.
    async fn fast_fee_rate(
        &self,
        source: KnownDomain,
        destination: KnownDomain,
    ) -> CctprResult<Amount>;

    /// How much USDC may currently be fast-burned in total.
    async fn fast_burn_allowance(&self) -> CctprResult<Amount>;
}
