use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use ethers_core::types::{transaction::eip2718::TypedTransaction, TransactionRequest};
use ethers_providers::Middleware;
use tracing::instrument;

use cctpr_core::{CctprError, CctprResult, ContractReader, H160, H256};

use crate::codec::ContractTx;

/// Read access to an EVM chain through an ethers middleware.
#[derive(Debug, Clone)]
pub struct EthereumContractReader<M>
where
    M: Middleware,
{
    provider: Arc<M>,
}

impl<M> EthereumContractReader<M>
where
    M: Middleware + 'static,
{
    /// A reader on top of `provider`.
    pub fn new(provider: Arc<M>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<M> ContractReader for EthereumContractReader<M>
where
    M: Middleware + 'static,
{
    #[instrument(err, skip(self, data), fields(len = data.len()))]
    async fn call(&self, to: H160, data: Vec<u8>) -> CctprResult<Vec<u8>> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        let result = self
            .provider
            .call(&tx, None)
            .await
            .map_err(CctprError::from_other)?;
        Ok(result.to_vec())
    }

    #[instrument(err, skip(self))]
    async fn get_storage_at(&self, contract: H160, slot: H256) -> CctprResult<H256> {
        self.provider
            .get_storage_at(contract, slot, None)
            .await
            .map_err(CctprError::from_other)
    }
}

impl From<ContractTx> for TransactionRequest {
    fn from(tx: ContractTx) -> Self {
        TransactionRequest::new()
            .to(tx.to)
            .value(tx.value)
            .data(tx.data)
    }
}

#[cfg(test)]
mod test {
    use ethers_core::types::{Bytes, NameOrAddress, U256};

    use super::*;

    #[test]
    fn transaction_request_carries_everything() {
        let tx = ContractTx::exec(H160::repeat_byte(0xcc), U256::from(7), &[1, 2, 3]);
        let request = <TransactionRequest as From<ContractTx>>::from(tx.clone());
        assert_eq!(request.to, Some(NameOrAddress::Address(tx.to)));
        assert_eq!(request.value, Some(U256::from(7)));
        assert_eq!(request.data, Some(Bytes::from(tx.data.to_vec())));
    }
}
