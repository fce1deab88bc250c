use std::{path::Path, sync::Arc};

use async_trait::async_trait;

use cctpr_base::settings::{loader::load_settings_from, ChainReaders, Settings};
use cctpr_core::{
    AccountReader, Amount, CctprError, CctprResult, ContractReader, FastBurnInfo, KnownDomain,
    Network, H160, H256,
};

/// A chain nobody talks to.
#[derive(Debug)]
struct Offline;

#[async_trait]
impl ContractReader for Offline {
    async fn call(&self, _to: H160, _data: Vec<u8>) -> CctprResult<Vec<u8>> {
        Err(CctprError::MissingAccount("offline".to_owned()))
    }

    async fn get_storage_at(&self, _contract: H160, _slot: H256) -> CctprResult<H256> {
        Err(CctprError::MissingAccount("offline".to_owned()))
    }
}

#[async_trait]
impl AccountReader for Offline {
    async fn get_multiple_accounts(&self, _addresses: &[H256]) -> CctprResult<Vec<Option<Vec<u8>>>> {
        Err(CctprError::MissingAccount("offline".to_owned()))
    }
}

#[async_trait]
impl FastBurnInfo for Offline {
    async fn fast_fee_rate(
        &self,
        _source: KnownDomain,
        _destination: KnownDomain,
    ) -> CctprResult<Amount> {
        Ok(Amount::bps(1))
    }

    async fn fast_burn_allowance(&self) -> CctprResult<Amount> {
        Ok(Amount::usdc(0))
    }
}

fn settings() -> Settings {
    load_settings_from(Path::new("../config"), "CCTPRBUILDTEST").unwrap()
}

fn readers(settings: &Settings) -> ChainReaders {
    ChainReaders {
        evm: settings
            .contracts
            .evm
            .keys()
            .map(|domain| (*domain, Arc::new(Offline) as Arc<dyn ContractReader>))
            .collect(),
        sealevel: Some(Arc::new(Offline)),
    }
}

#[test]
fn shipped_config_builds_an_engine() {
    let settings = settings();
    assert_eq!(settings.network, Network::Mainnet);
    let engine = settings
        .build_engine(Arc::new(Offline), &readers(&settings))
        .unwrap();
    let sources = engine.sources().collect::<Vec<_>>();
    assert_eq!(
        sources,
        vec![
            KnownDomain::Ethereum,
            KnownDomain::Avalanche,
            KnownDomain::Arbitrum,
            KnownDomain::Solana,
            KnownDomain::Base,
        ]
    );
}

#[test]
fn every_deployment_needs_a_reader() {
    let settings = settings();
    let mut readers = readers(&settings);
    readers.evm.remove(&KnownDomain::Base);
    let err = settings
        .build_engine(Arc::new(Offline), &readers)
        .unwrap_err();
    assert!(err.to_string().contains("No contract reader for base"));
}

#[tokio::test]
async fn chain_failures_are_retryable() {
    let settings = settings();
    let engine = settings
        .build_engine(Arc::new(Offline), &readers(&settings))
        .unwrap();
    let err = engine.roles(KnownDomain::Solana).await.unwrap_err();
    assert!(err.is_retryable());
}
