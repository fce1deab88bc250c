use std::fmt::{self, Debug};

use async_trait::async_trait;
use auto_impl::auto_impl;
use ethers_core::utils::hash_message;
use serde::{Deserialize, Serialize};

use crate::{Address, CctprError, CctprResult, Signature, H160, H256};

/// Failure of a quote signer backend
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct QuoteSignerError(#[from] Box<dyn std::error::Error + Send + Sync>);

/// Key of the off-chain quoter. A secp256k1 key on every platform, identified
/// by its ethereum address.
#[async_trait]
#[auto_impl(&, Box, Arc)]
pub trait QuoteSigner: Send + Sync + Debug {
    /// Address the relayer contracts register as off-chain quoter
    fn eth_address(&self) -> H160;

    /// Signs `hash` prefixed as an EIP-191 personal message.
    async fn sign_hash(&self, hash: &H256) -> Result<Signature, QuoteSignerError>;
}

/// Signing helpers available on every [`QuoteSigner`].
#[async_trait]
pub trait QuoteSignerExt {
    /// Signs `value` and bundles it with the signature.
    async fn sign<T: Signable + Send>(&self, value: T) -> Result<SignedType<T>, QuoteSignerError>;

    /// Fails unless `signed` carries a signature of this signer.
    fn verify<T: Signable>(&self, signed: &SignedType<T>) -> CctprResult<()>;
}

#[async_trait]
impl<S: QuoteSigner> QuoteSignerExt for S {
    async fn sign<T: Signable + Send>(&self, value: T) -> Result<SignedType<T>, QuoteSignerError> {
        let signature = self.sign_hash(&value.signing_hash()).await?;
        Ok(SignedType { value, signature })
    }

    fn verify<T: Signable>(&self, signed: &SignedType<T>) -> CctprResult<()> {
        signed.verify(self.eth_address())
    }
}

/// Something a quoter commits to by signature.
pub trait Signable: Sized {
    /// Digest of the canonical encoding.
    fn signing_hash(&self) -> H256;

    /// The digest as an EIP-191 personal message, which is what gets signed.
    fn eth_signed_message_hash(&self) -> H256 {
        hash_message(self.signing_hash())
    }
}

/// A value and the quoter's signature over it.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SignedType<T: Signable> {
    /// Signed value
    #[serde(alias = "quote")]
    pub value: T,
    /// Signature over [`Signable::eth_signed_message_hash`]
    pub signature: Signature,
}

impl<T: Signable> SignedType<T> {
    /// Address whose key produced the signature.
    pub fn recover(&self) -> CctprResult<Address> {
        Ok(self
            .signature
            .recover(self.value.eth_signed_message_hash())?)
    }

    /// Fails with `BadSignature` unless `signer` produced the signature.
    pub fn verify(&self, signer: Address) -> CctprResult<()> {
        match self.recover()? {
            recovered if recovered == signer => Ok(()),
            _ => Err(CctprError::BadSignature),
        }
    }
}

impl<T: Signable + Debug> Debug for SignedType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedType")
            .field("value", &self.value)
            .field("signature", &format_args!("0x{}", self.signature))
            .finish()
    }
}
