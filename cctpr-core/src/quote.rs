//! Relay quotes and the USDC amounts they imply.
//!
//! On-chain quotes are an upper bound the program charges at most. When sizing
//! the burn of an `in` transfer they count as a zero fee, so the burn never
//! falls short whatever the live fee turns out to be. Off-chain quotes are a
//! fixed fee signed by the registered quoter and are used exactly.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    utils::keccak256_concat, Amount, CctprError, CctprResult, Corridor, CorridorParams, Decode,
    Encode, Kind, KnownDomain, Platform, Rounding, Signable, Signature, SignedType, H160, H256,
};

/// Whether the requested amount is what the user spends or what the
/// recipient receives.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InOrOut {
    /// The amount is the exact input
    In,
    /// The amount is the minimum output
    Out,
}

/// A relay fee in exactly one currency.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum RelayFee {
    /// µUSDC taken from the transfer
    Usdc(Amount),
    /// Native gas token of the source chain
    GasToken(Amount),
}

impl RelayFee {
    /// The fee amount
    pub fn amount(&self) -> &Amount {
        match self {
            RelayFee::Usdc(amount) | RelayFee::GasToken(amount) => amount,
        }
    }

    /// The fee if it is charged in USDC
    pub fn usdc(&self) -> Option<&Amount> {
        match self {
            RelayFee::Usdc(amount) => Some(amount),
            RelayFee::GasToken(_) => None,
        }
    }

    /// The fee if it is charged in the source's gas token
    pub fn gas_token(&self) -> Option<&Amount> {
        match self {
            RelayFee::GasToken(amount) => Some(amount),
            RelayFee::Usdc(_) => None,
        }
    }

    /// Checks the fee's kind against the currency it claims.
    pub fn ensure_for_source(&self, source: KnownDomain) -> CctprResult<()> {
        match self {
            RelayFee::Usdc(amount) => amount.ensure_kind(Kind::Usdc),
            RelayFee::GasToken(amount) => amount.ensure_kind(Kind::NativeGasToken(source)),
        }
    }
}

/// How the relay fee of a transfer is determined.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Quote {
    /// The program computes the fee at execution time, bounded above.
    OnChain {
        /// The most the user is willing to pay
        max_relay_fee: RelayFee,
    },
    /// A fixed fee pre-committed by the off-chain quoter.
    OffChain {
        /// Unix seconds after which the quote is void
        expiration_time: u32,
        /// The committed fee
        relay_fee: RelayFee,
        /// The quoter's signature over the canonical serialized quote
        quoter_signature: Signature,
    },
}

impl Quote {
    /// The bound of an on-chain quote or the fee of an off-chain one.
    pub fn relay_fee(&self) -> &RelayFee {
        match self {
            Quote::OnChain { max_relay_fee } => max_relay_fee,
            Quote::OffChain { relay_fee, .. } => relay_fee,
        }
    }

    /// Whether the quote was issued off chain
    pub fn is_off_chain(&self) -> bool {
        matches!(self, Quote::OffChain { .. })
    }

    /// The USDC fee that is known before execution. Zero for on-chain quotes.
    pub fn committed_usdc_fee(&self) -> Amount {
        match self {
            Quote::OffChain {
                relay_fee: RelayFee::Usdc(fee),
                ..
            } => *fee,
            _ => Amount::zero(Kind::Usdc),
        }
    }

    /// The most USDC the relay may cost. The bound for on-chain quotes.
    pub fn max_usdc_fee(&self) -> Amount {
        self.relay_fee()
            .usdc()
            .copied()
            .unwrap_or_else(|| Amount::zero(Kind::Usdc))
    }
}

/// The canonical quote the off-chain quoter signs.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OffChainQuote {
    source_domain: KnownDomain,
    destination_domain: KnownDomain,
    corridor: Corridor,
    gas_dropoff: Amount,
    expiration_time: u32,
    relay_fee: RelayFee,
}

impl OffChainQuote {
    /// A quote for the given transfer parameters. Fails if a value does not fit
    /// its wire field.
    pub fn new(
        source_domain: KnownDomain,
        destination_domain: KnownDomain,
        corridor: Corridor,
        gas_dropoff: Amount,
        expiration_time: u32,
        relay_fee: RelayFee,
    ) -> CctprResult<Self> {
        gas_dropoff.ensure_kind(Kind::GenericGasToken)?;
        relay_fee.ensure_for_source(source_domain)?;
        let quote = Self {
            source_domain,
            destination_domain,
            corridor,
            gas_dropoff,
            expiration_time,
            relay_fee,
        };
        quote.check_widths()?;
        Ok(quote)
    }

    fn gas_token_is_wide(&self) -> bool {
        self.source_domain.platform() == Platform::Evm
    }

    fn check_widths(&self) -> CctprResult<()> {
        let fits = |amount: &Amount, bytes: usize| amount.atomic().bits() <= bytes * 8;
        let overflow = |field| CctprError::Overflow {
            field,
            value: self.relay_fee.amount().to_string(),
        };
        if !fits(&self.gas_dropoff, 4) {
            return Err(CctprError::Overflow {
                field: "gas dropoff",
                value: self.gas_dropoff.to_string(),
            });
        }
        match &self.relay_fee {
            RelayFee::Usdc(fee) if !fits(fee, 8) => Err(overflow("usdc relay fee")),
            RelayFee::GasToken(fee) if !fits(fee, if self.gas_token_is_wide() { 16 } else { 8 }) => {
                Err(overflow("gas token relay fee"))
            }
            _ => Ok(()),
        }
    }

    /// Source domain
    pub fn source_domain(&self) -> KnownDomain {
        self.source_domain
    }

    /// Destination domain
    pub fn destination_domain(&self) -> KnownDomain {
        self.destination_domain
    }

    /// Corridor
    pub fn corridor(&self) -> Corridor {
        self.corridor
    }

    /// Gas dropoff, µGasToken
    pub fn gas_dropoff(&self) -> &Amount {
        &self.gas_dropoff
    }

    /// Expiration, unix seconds
    pub fn expiration_time(&self) -> u32 {
        self.expiration_time
    }

    /// Committed fee
    pub fn relay_fee(&self) -> &RelayFee {
        &self.relay_fee
    }

    /// Attaches a signature.
    pub fn with_signature(self, signature: Signature) -> SignedType<Self> {
        SignedType {
            value: self,
            signature,
        }
    }
}

impl Encode for OffChainQuote {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: Write,
    {
        let mut written = 0;
        written += self.source_domain.id().write_to(writer)?;
        written += self.destination_domain.id().write_to(writer)?;
        written += self.corridor.id().write_to(writer)?;
        written += (self.gas_dropoff.atomic().low_u32()).write_to(writer)?;
        written += self.expiration_time.write_to(writer)?;
        written += match &self.relay_fee {
            RelayFee::Usdc(fee) => 0u8.write_to(writer)? + fee.atomic().low_u64().write_to(writer)?,
            RelayFee::GasToken(fee) if self.gas_token_is_wide() => {
                1u8.write_to(writer)? + fee.atomic().low_u128().write_to(writer)?
            }
            RelayFee::GasToken(fee) => 1u8.write_to(writer)? + fee.atomic().low_u64().write_to(writer)?,
        };
        Ok(written)
    }
}

impl Decode for OffChainQuote {
    fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
    where
        R: Read,
        Self: Sized,
    {
        let source_domain = KnownDomain::try_from(u8::read_from(reader)?)?;
        let destination_domain = KnownDomain::try_from(u8::read_from(reader)?)?;
        let corridor = Corridor::from_id(u8::read_from(reader)?)?;
        let gas_dropoff = Amount::generic_gas_token(u32::read_from(reader)?.into());
        let expiration_time = u32::read_from(reader)?;
        let relay_fee = match u8::read_from(reader)? {
            0 => RelayFee::Usdc(Amount::usdc(u64::read_from(reader)?)),
            1 => {
                let kind = Kind::NativeGasToken(source_domain);
                if source_domain.platform() == Platform::Evm {
                    RelayFee::GasToken(Amount::new(kind, u128::read_from(reader)?))
                } else {
                    RelayFee::GasToken(Amount::new(kind, u64::read_from(reader)?))
                }
            }
            other => return Err(CctprError::decode(format!("relay fee currency {other}"))),
        };
        Ok(Self {
            source_domain,
            destination_domain,
            corridor,
            gas_dropoff,
            expiration_time,
            relay_fee,
        })
    }
}

impl Signable for OffChainQuote {
    fn signing_hash(&self) -> H256 {
        keccak256_concat([self.to_vec().as_slice()])
    }
}

/// Validates an off-chain quote against the registered quoter at `now`. Expiry
/// is checked before the signature.
pub fn verify_off_chain_quote(
    quote: &SignedType<OffChainQuote>,
    quoter: H160,
    now: u32,
) -> CctprResult<()> {
    let expiration = quote.value.expiration_time;
    if now >= expiration {
        warn!(expiration, now, "Rejecting expired off-chain quote");
        return Err(CctprError::Expired { expiration, now });
    }
    quote.verify(quoter).map_err(|error| {
        warn!(?error, %quoter, "Rejecting off-chain quote with invalid signature");
        CctprError::BadSignature
    })
}

/// USDC flows of one transfer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UsdcAmounts {
    /// Debited from the user. An upper bound for `out` transfers quoted on chain.
    pub total_amount: Amount,
    /// The input amount of the transfer payload. The programs charge the
    /// gasless fee and the USDC relay fee on top of it, except for an on-chain
    /// fee taken from the input of an `in` transfer.
    pub input_amount: Amount,
    /// Handed to the bridge protocol.
    pub burn_amount: Amount,
    /// Gasless fee plus the USDC relay fee, or its bound
    pub total_fees: Amount,
}

/// The amount to burn for a transfer.
pub fn calc_burn_amount(
    in_or_out: InOrOut,
    amount: &Amount,
    corridor: &CorridorParams,
    quote: &Quote,
    gasless_fee: &Amount,
) -> CctprResult<Amount> {
    amount.ensure_kind(Kind::Usdc)?;
    gasless_fee.ensure_kind(Kind::Usdc)?;
    let burn_amount = match in_or_out {
        InOrOut::In => amount
            .checked_sub(gasless_fee)?
            .checked_sub(&quote.committed_usdc_fee())?,
        InOrOut::Out => match corridor.fast_fee_rate() {
            Some(rate) => amount.div_complement(rate, Rounding::Ceil)?,
            None => *amount,
        },
    };
    if burn_amount.is_zero() {
        return Err(CctprError::InsufficientAmount(format!(
            "{amount} leaves nothing to burn after fees"
        )));
    }
    Ok(burn_amount)
}

/// Resolves a request into the USDC it debits, burns and pays in fees.
pub fn calc_usdc_amounts(
    in_or_out: InOrOut,
    amount: &Amount,
    corridor: &CorridorParams,
    quote: &Quote,
    gasless_fee: &Amount,
) -> CctprResult<UsdcAmounts> {
    if !gasless_fee.is_zero() && quote.relay_fee().usdc().is_none() {
        return Err(CctprError::InvalidQuote(
            "gasless transfers must pay the relay fee in USDC",
        ));
    }
    let burn_amount = calc_burn_amount(in_or_out, amount, corridor, quote, gasless_fee)?;
    let total_fees = gasless_fee.checked_add(&quote.max_usdc_fee())?;
    let (total_amount, input_amount) = match in_or_out {
        InOrOut::In => (
            *amount,
            amount
                .checked_sub(gasless_fee)?
                .checked_sub(&quote.committed_usdc_fee())?,
        ),
        InOrOut::Out => (burn_amount.checked_add(&total_fees)?, burn_amount),
    };
    if input_amount.is_zero() {
        return Err(CctprError::InsufficientAmount(format!(
            "{amount} leaves no input after fees"
        )));
    }
    Ok(UsdcAmounts {
        total_amount,
        input_amount,
        burn_amount,
        total_fees,
    })
}
