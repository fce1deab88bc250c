use std::time::{Duration, Instant};

use parking_lot::RwLock;
use solana_program::pubkey::Pubkey;
use tracing::{debug, instrument};

use cctpr_core::{AccountReader, CctprResult, GovernanceRoles, Network};

use crate::{
    accounts::{ConfigAccount, DiscriminatorData},
    pda::ProgramAddresses,
    to_universal,
};

/// How long a fetched config account is trusted.
pub const CONFIG_CACHE_TTL: Duration = Duration::from_secs(60);

/// Addresses of the relayer and oracle programs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SealevelDeployment {
    /// The relayer program
    pub cctpr: Pubkey,
    /// The price oracle program
    pub oracle: Pubkey,
}

/// Read access to the relayer program's accounts, shared by the quoter, the
/// transfer composer and governance.
#[derive(Debug)]
pub struct SealevelClient<R> {
    addresses: ProgramAddresses,
    reader: R,
    config: RwLock<Option<(ConfigAccount, Instant)>>,
}

impl<R> SealevelClient<R>
where
    R: AccountReader,
{
    /// A client of `deployment` on `network`.
    pub fn new(network: Network, deployment: SealevelDeployment, reader: R) -> CctprResult<Self> {
        Ok(Self {
            addresses: ProgramAddresses::new(network, deployment.cctpr, deployment.oracle)?,
            reader,
            config: RwLock::new(None),
        })
    }

    /// Derived addresses
    pub fn addresses(&self) -> &ProgramAddresses {
        &self.addresses
    }

    /// The account reader
    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// The config account, from cache when fetched less than
    /// [`CONFIG_CACHE_TTL`] ago.
    #[instrument(err, skip(self))]
    pub async fn config(&self) -> CctprResult<ConfigAccount> {
        let cached = self
            .config
            .read()
            .as_ref()
            .filter(|(_, fetched_at)| fetched_at.elapsed() < CONFIG_CACHE_TTL)
            .map(|(config, _)| config.clone());
        if let Some(config) = cached {
            return Ok(config);
        }
        let address = self.addresses.config();
        let data = self.reader.get_account(to_universal(&address)).await?;
        let config = ConfigAccount::decode_required(data.as_deref(), &address)?;
        debug!(owner = %config.owner, "Fetched relayer config");
        *self.config.write() = Some((config.clone(), Instant::now()));
        Ok(config)
    }

    /// Drops the cached config so the next read hits the chain.
    pub fn invalidate_config(&self) {
        self.config.write().take();
    }

    /// Current roles.
    pub async fn roles(&self) -> CctprResult<GovernanceRoles> {
        Ok(self.config().await?.roles())
    }
}

#[cfg(test)]
mod test {
    use async_trait::async_trait;
    use mockall::mock;

    use cctpr_core::H256;

    use super::*;
    use crate::pda::DEFAULT_ORACLE_PROGRAM_ID;

    impl std::fmt::Debug for MockReader {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("MockReader")
        }
    }

    mock! {
        pub Reader {}

        #[async_trait]
        impl AccountReader for Reader {
            async fn get_multiple_accounts(&self, addresses: &[H256]) -> CctprResult<Vec<Option<Vec<u8>>>>;
        }
    }

    fn config() -> ConfigAccount {
        ConfigAccount {
            owner: Pubkey::new_from_array([1; 32]),
            pending_owner: Pubkey::default(),
            fee_adjuster: Pubkey::new_from_array([3; 32]),
            fee_recipient: Pubkey::new_from_array([4; 32]),
            offchain_quoter: [5; 20],
            rent_bump: 255,
        }
    }

    fn client(reader: MockReader) -> SealevelClient<MockReader> {
        SealevelClient::new(
            Network::Mainnet,
            SealevelDeployment {
                cctpr: Pubkey::new_from_array([7; 32]),
                oracle: DEFAULT_ORACLE_PROGRAM_ID,
            },
            reader,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn config_is_cached_until_invalidated() {
        let mut reader = MockReader::new();
        reader
            .expect_get_multiple_accounts()
            .times(2)
            .returning(|_| Ok(vec![Some(config().encode())]));
        let client = client(reader);
        assert_eq!(client.config().await.unwrap(), config());
        assert_eq!(client.roles().await.unwrap().fee_recipient, H256::repeat_byte(4));
        client.invalidate_config();
        assert_eq!(client.config().await.unwrap(), config());
    }

    #[tokio::test]
    async fn missing_config_is_retryable() {
        let mut reader = MockReader::new();
        reader
            .expect_get_multiple_accounts()
            .returning(|_| Ok(vec![None]));
        let err = client(reader).config().await.unwrap_err();
        assert!(err.is_retryable());
    }
}
