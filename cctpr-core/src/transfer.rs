use serde::{Deserialize, Serialize};

use crate::{
    calc_usdc_amounts, Amount, CctprError, CctprResult, CorridorParams, DomainRegistry, InOrOut,
    Kind, KnownDomain, OffChainQuote, Platform, Quote, Signature, SignedType, UniversalAddress,
    UsdcAmounts, H160, U256,
};

/// How the source program obtains the user's USDC.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ApprovalMethod {
    /// The user already granted an allowance
    Preapproval,
    /// A single-use signed ERC-2612 allowance bundled with the transfer
    Permit {
        /// Permitted amount
        value: U256,
        /// Permit deadline, unix seconds
        deadline: U256,
        /// The user's permit signature
        signature: Signature,
    },
    /// A relayer submits on the user's behalf and charges `gasless_fee`
    Gasless {
        /// USDC charged for submitting the transaction
        gasless_fee: Amount,
        /// Platform specific authorization of the meta-transfer
        authorization: GaslessAuthorization,
    },
}

impl ApprovalMethod {
    /// Name for error messages
    pub fn name(&self) -> &'static str {
        match self {
            ApprovalMethod::Preapproval => "preapproval",
            ApprovalMethod::Permit { .. } => "permit",
            ApprovalMethod::Gasless { .. } => "gasless",
        }
    }

    /// The gasless fee, zero unless gasless.
    pub fn gasless_fee(&self) -> Amount {
        match self {
            ApprovalMethod::Gasless { gasless_fee, .. } => *gasless_fee,
            _ => Amount::zero(Kind::Usdc),
        }
    }
}

/// What authorizes a gasless transfer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum GaslessAuthorization {
    /// A signed Permit2 witness transfer
    Permit2 {
        /// The user
        owner: H160,
        /// Permit2 nonce, exactly one word
        nonce: Vec<u8>,
        /// Deadline, unix seconds
        deadline: u32,
        /// The user's signature over the typed data
        signature: Signature,
    },
    /// The user co-signs the transaction; the relayer pays for it
    CoSigned {
        /// Unix seconds after which the relayer may no longer submit
        expiration_time: u32,
    },
}

/// A fully specified transfer. Consumed once to compose one payload.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Where USDC is burned
    pub source: KnownDomain,
    /// Where USDC is minted
    pub destination: KnownDomain,
    /// Meaning of `amount`
    pub in_or_out: InOrOut,
    /// µUSDC
    pub amount: Amount,
    /// Recipient on the destination
    pub recipient: UniversalAddress,
    /// Gas token delivered with the USDC, µGasToken
    pub gas_dropoff: Amount,
    /// Corridor and its fast fee rate
    pub corridor: CorridorParams,
    /// Relay fee terms
    pub quote: Quote,
    /// How the user's USDC is obtained
    pub approval: ApprovalMethod,
}

impl TransferRequest {
    /// Checks everything that can be checked without chain state.
    pub fn validate(&self, registry: &DomainRegistry) -> CctprResult<()> {
        self.amount.ensure_kind(Kind::Usdc)?;
        self.gas_dropoff.ensure_kind(Kind::GenericGasToken)?;
        self.approval.gasless_fee().ensure_kind(Kind::Usdc)?;
        self.quote.relay_fee().ensure_for_source(self.source)?;

        let platform = self.source.platform();
        if !matches!(platform, Platform::Evm | Platform::Solana) {
            return Err(CctprError::UnsupportedCorridorForPlatform {
                corridor: self.corridor.corridor(),
                platform,
            });
        }
        registry.check_is_sensible_corridor(
            self.source,
            self.destination,
            self.corridor.corridor(),
        )?;

        let limit = registry.info(self.destination)?.gas_dropoff_limit;
        if self.gas_dropoff.atomic() > limit.atomic() {
            return Err(CctprError::GasDropoffLimitExceeded {
                requested: self.gas_dropoff.to_u64().unwrap_or(u64::MAX),
                limit: limit.to_u64()?,
            });
        }
        Ok(())
    }

    /// Resolves the USDC the transfer debits, burns and pays in fees.
    pub fn usdc_amounts(&self) -> CctprResult<UsdcAmounts> {
        calc_usdc_amounts(
            self.in_or_out,
            &self.amount,
            &self.corridor,
            &self.quote,
            &self.approval.gasless_fee(),
        )
    }

    /// The canonical quote an off-chain quote of this request must be signed
    /// over, `None` for on-chain quotes.
    pub fn off_chain_quote(&self) -> CctprResult<Option<SignedType<OffChainQuote>>> {
        match &self.quote {
            Quote::OnChain { .. } => Ok(None),
            Quote::OffChain {
                expiration_time,
                relay_fee,
                quoter_signature,
            } => Ok(Some(
                OffChainQuote::new(
                    self.source,
                    self.destination,
                    self.corridor.corridor(),
                    self.gas_dropoff,
                    *expiration_time,
                    *relay_fee,
                )?
                .with_signature(*quoter_signature),
            )),
        }
    }
}
