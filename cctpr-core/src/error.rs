use std::error::Error as StdError;
use std::fmt::{Debug, Display, Formatter};

use ethers_core::types::SignatureError;

use crate::{Corridor, Kind, KnownDomain, Platform};

/// The result of any engine operation.
pub type CctprResult<T> = Result<T, CctprError>;

/// Thin wrapper around a boxed error coming from an outbound collaborator
/// (RPC client, fast-burn api, ...).
#[repr(transparent)]
pub struct CollaboratorError(Box<dyn StdError + Send + Sync>);

impl Debug for CollaboratorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Display for CollaboratorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for CollaboratorError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// Errors raised by the quoting and composition engine.
#[derive(Debug, thiserror::Error)]
pub enum CctprError {
    /// Two amounts of different kinds were combined without a conversion
    #[error("Amount kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        /// the kind the operation required
        expected: Kind,
        /// the kind that was supplied
        actual: Kind,
    },
    /// The corridor cannot connect the given source and destination
    #[error("Corridor {corridor} is incoherent for {source_domain} -> {destination}: {reason}")]
    CorridorDestinationIncoherent {
        /// the requested corridor, if any
        corridor: Corridor,
        /// the source domain
        source_domain: KnownDomain,
        /// the destination domain
        destination: KnownDomain,
        /// what rule was violated
        reason: &'static str,
    },
    /// Source and destination are the same domain
    #[error("Source and destination are both {0}")]
    SameDomain(KnownDomain),
    /// The platform of the source domain cannot compose this transfer
    #[error("Corridor {corridor} is not supported on platform {platform}")]
    UnsupportedCorridorForPlatform {
        /// the requested corridor
        corridor: Corridor,
        /// the source platform
        platform: Platform,
    },
    /// The approval method cannot be used from the source platform
    #[error("Approval method {approval} is not supported on platform {platform}")]
    UnsupportedApprovalForPlatform {
        /// the requested approval method
        approval: &'static str,
        /// the source platform
        platform: Platform,
    },
    /// The quote cannot be combined with the rest of the request
    #[error("Invalid quote: {0}")]
    InvalidQuote(&'static str),
    /// The requested amount cannot cover the fees
    #[error("Insufficient amount: {0}")]
    InsufficientAmount(String),
    /// An off-chain quote is past its expiration time
    #[error("Off-chain quote expired at {expiration} (now {now})")]
    Expired {
        /// the quote's expiration time (unix seconds)
        expiration: u32,
        /// the time at which validation ran (unix seconds)
        now: u32,
    },
    /// An off-chain quote was not signed by the registered quoter
    #[error("Off-chain quote signature does not verify under the registered quoter")]
    BadSignature,
    /// A price record exists but holds no usable data
    #[error("Stale or uninitialized price data for {0}")]
    StalePriceData(String),
    /// An account or storage value that the quote requires is missing
    #[error("Missing account: {0}")]
    MissingAccount(String),
    /// The meta-transfer nonce has the wrong length
    #[error("Nonce must be {expected} bytes, got {actual}")]
    NonceLengthMismatch {
        /// the required length
        expected: usize,
        /// the supplied length
        actual: usize,
    },
    /// The requested gas dropoff exceeds the destination's limit
    #[error("Gas dropoff limit exceeded: requested {requested} µGasToken, limit {limit} µGasToken")]
    GasDropoffLimitExceeded {
        /// the requested dropoff
        requested: u64,
        /// the domain's limit
        limit: u64,
    },
    /// The relayer program is not deployed on, or not configured for, a domain
    #[error("No relayer deployment configured for {0}")]
    NoDeployment(KnownDomain),
    /// An unknown or invalid domain id was encountered
    #[error("Unknown or invalid domain ID ({0})")]
    UnknownDomainId(u32),
    /// A governance action was attempted by a role that may not perform it
    #[error("Signer {signer} is not authorized to {action}")]
    Unauthorized {
        /// the address attempting the action
        signer: String,
        /// the attempted action
        action: &'static str,
    },
    /// A value does not fit into its wire representation
    #[error("Value {value} does not fit into {field}")]
    Overflow {
        /// the offending field
        field: &'static str,
        /// the value rendered as a string
        value: String,
    },
    /// Bytes could not be decoded
    #[error("Decoding error: {0}")]
    Decode(String),
    /// Signature Error passthrough
    #[error(transparent)]
    Signature(#[from] SignatureError),
    /// An outbound collaborator failed
    #[error(transparent)]
    Collaborator(CollaboratorError),
}

impl CctprError {
    /// Wrap any collaborator error
    pub fn from_other<E: StdError + Send + Sync + 'static>(err: E) -> Self {
        Self::Collaborator(CollaboratorError(Box::new(err)))
    }

    /// Shorthand for a decoding error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Whether the whole quote may be retried after a backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StalePriceData(_) | Self::MissingAccount(_) | Self::Collaborator(_)
        )
    }
}

impl From<std::io::Error> for CctprError {
    fn from(err: std::io::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
