use async_trait::async_trait;
use ethers_core::{types::H256, utils::hash_message};
use ethers_signers::{LocalWallet, Signer};

use cctpr_core::{QuoteSigner, QuoteSignerError, Signature, H160};

/// The off-chain quoter key, held in memory.
#[derive(Debug, Clone)]
pub struct LocalQuoteSigner {
    wallet: LocalWallet,
}

impl LocalQuoteSigner {
    /// Wraps `wallet`.
    pub fn new(wallet: LocalWallet) -> Self {
        Self { wallet }
    }
}

impl From<LocalWallet> for LocalQuoteSigner {
    fn from(wallet: LocalWallet) -> Self {
        Self::new(wallet)
    }
}

#[async_trait]
impl QuoteSigner for LocalQuoteSigner {
    fn eth_address(&self) -> H160 {
        self.wallet.address()
    }

    async fn sign_hash(&self, hash: &H256) -> Result<Signature, QuoteSignerError> {
        self.wallet
            .sign_hash(hash_message(hash))
            .map_err(|e| QuoteSignerError::from(Box::new(e) as Box<dyn std::error::Error + Send + Sync>))
    }
}
