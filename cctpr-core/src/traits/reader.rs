use std::fmt::Debug;

use async_trait::async_trait;
use auto_impl::auto_impl;

use crate::{CctprResult, H160, H256};

/// Read access to an account-model chain. Implemented by the RPC client that
/// lives outside this engine.
#[async_trait]
#[auto_impl(&, Box, Arc)]
pub trait AccountReader: Send + Sync + Debug {
    /// Raw data of all `addresses` in one round trip, `None` where an account
    /// does not exist. The result has the same length and order as the input.
    async fn get_multiple_accounts(&self, addresses: &[H256]) -> CctprResult<Vec<Option<Vec<u8>>>>;

    /// Raw data of one account.
    async fn get_account(&self, address: H256) -> CctprResult<Option<Vec<u8>>> {
        Ok(self
            .get_multiple_accounts(&[address])
            .await?
            .into_iter()
            .next()
            .flatten())
    }
}

/// Read access to a contract-model chain.
#[async_trait]
#[auto_impl(&, Box, Arc)]
pub trait ContractReader: Send + Sync + Debug {
    /// `eth_call` of `data` against `to`.
    async fn call(&self, to: H160, data: Vec<u8>) -> CctprResult<Vec<u8>>;

    /// One storage word of `contract`.
    async fn get_storage_at(&self, contract: H160, slot: H256) -> CctprResult<H256>;
}
