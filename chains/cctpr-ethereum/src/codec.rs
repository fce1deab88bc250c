//! The `exec768()` transfer body.
//!
//! Every record is a fixed field order, big-endian, with one tag byte in front
//! of each variant. Amounts travel in their atomic unit except for the gas
//! token relay fee of off-chain quotes, which is carried in gwei.

use std::io::{Read, Write};

use ethers_core::types::Bytes;
use serde::{Deserialize, Serialize};

use cctpr_core::{
    CctprError, CctprResult, CorridorVariant, Decode, Encode, KnownDomain, Signature, H160, H256,
    U256,
};

/// Length of a function selector
pub const SELECTOR_LEN: usize = 4;

/// Selector of the single state-changing entry point. Transfers and governance
/// commands are appended to it.
pub fn exec_selector() -> [u8; SELECTOR_LEN] {
    ethers_core::utils::id("exec768()")
}

/// Selector of the read-only entry point used for on-chain relay quotes.
pub fn get_selector() -> [u8; SELECTOR_LEN] {
    ethers_core::utils::id("get1959()")
}

/// Strips and checks `selector` off the front of `calldata`.
pub fn strip_selector(calldata: &[u8], selector: [u8; SELECTOR_LEN]) -> CctprResult<&[u8]> {
    if calldata.len() < SELECTOR_LEN || calldata[..SELECTOR_LEN] != selector {
        return Err(CctprError::decode(format!(
            "invalid selector: expected 0x{}, got 0x{}",
            hex::encode(selector),
            hex::encode(&calldata[..calldata.len().min(SELECTOR_LEN)])
        )));
    }
    Ok(&calldata[SELECTOR_LEN..])
}

/// A transaction against the relayer contract, ready to be signed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContractTx {
    /// The relayer contract
    pub to: H160,
    /// Wei attached to the call
    pub value: U256,
    /// Selector and body
    pub data: Bytes,
}

impl ContractTx {
    /// An `exec768()` call carrying `body`.
    pub fn exec(to: H160, value: U256, body: &[u8]) -> Self {
        let mut data = exec_selector().to_vec();
        data.extend_from_slice(body);
        Self {
            to,
            value,
            data: data.into(),
        }
    }
}

pub(crate) fn write_domain<W: Write>(domain: KnownDomain, writer: &mut W) -> std::io::Result<usize> {
    domain.id().write_to(writer)
}

pub(crate) fn read_domain<R: Read>(reader: &mut R) -> CctprResult<KnownDomain> {
    KnownDomain::try_from(u8::read_from(reader)?)
}

/// Corridor as carried on the wire, with the fast fee bound in µUSDC.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum EvmCorridorVariant {
    /// `0x00`
    V1,
    /// `0x01`
    V2Direct {
        /// Most fast fee the burn may be charged
        max_fast_fee_usdc: u64,
    },
    /// `0x02`
    AvaxHop {
        /// Most fast fee the burn may be charged
        max_fast_fee_usdc: u64,
    },
}

impl TryFrom<&CorridorVariant> for EvmCorridorVariant {
    type Error = CctprError;

    fn try_from(variant: &CorridorVariant) -> Result<Self, Self::Error> {
        Ok(match variant {
            CorridorVariant::V1 => Self::V1,
            CorridorVariant::V2Direct { max_fast_fee } => Self::V2Direct {
                max_fast_fee_usdc: max_fast_fee.to_u64()?,
            },
            CorridorVariant::AvaxHop { max_fast_fee } => Self::AvaxHop {
                max_fast_fee_usdc: max_fast_fee.to_u64()?,
            },
        })
    }
}

impl Encode for EvmCorridorVariant {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: Write,
    {
        Ok(match self {
            Self::V1 => 0u8.write_to(writer)?,
            Self::V2Direct { max_fast_fee_usdc } => {
                1u8.write_to(writer)? + max_fast_fee_usdc.write_to(writer)?
            }
            Self::AvaxHop { max_fast_fee_usdc } => {
                2u8.write_to(writer)? + max_fast_fee_usdc.write_to(writer)?
            }
        })
    }
}

impl Decode for EvmCorridorVariant {
    fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
    where
        R: Read,
        Self: Sized,
    {
        Ok(match u8::read_from(reader)? {
            0 => Self::V1,
            1 => Self::V2Direct {
                max_fast_fee_usdc: u64::read_from(reader)?,
            },
            2 => Self::AvaxHop {
                max_fast_fee_usdc: u64::read_from(reader)?,
            },
            other => return Err(CctprError::decode(format!("corridor variant {other}"))),
        })
    }
}

/// Relay fee of an off-chain quote. Both variants are 8 bytes wide.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum OffChainRelayFee {
    /// `0x00`, µUSDC
    Usdc(u64),
    /// `0x01`, gwei
    GasTokenGwei(u64),
}

impl Encode for OffChainRelayFee {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: Write,
    {
        Ok(match self {
            Self::Usdc(amount) => 0u8.write_to(writer)? + amount.write_to(writer)?,
            Self::GasTokenGwei(amount) => 1u8.write_to(writer)? + amount.write_to(writer)?,
        })
    }
}

impl Decode for OffChainRelayFee {
    fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
    where
        R: Read,
        Self: Sized,
    {
        Ok(match u8::read_from(reader)? {
            0 => Self::Usdc(u64::read_from(reader)?),
            1 => Self::GasTokenGwei(u64::read_from(reader)?),
            other => return Err(CctprError::decode(format!("relay fee currency {other}"))),
        })
    }
}

/// Quote of a transfer the user submits.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum UserQuoteVariant {
    /// `0x00`
    OffChain {
        /// Unix seconds
        expiration_time: u32,
        /// The committed fee
        relay_fee: OffChainRelayFee,
        /// The quoter's signature
        quoter_signature: Signature,
    },
    /// `0x01`
    OnChainUsdc {
        /// Bound on the fee, µUSDC
        max_relay_fee_usdc: u64,
        /// Whether the fee comes out of the input amount
        take_relay_fee_from_input: bool,
    },
    /// `0x02`, the bound is the transaction value
    OnChainGas,
}

impl Encode for UserQuoteVariant {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: Write,
    {
        Ok(match self {
            Self::OffChain {
                expiration_time,
                relay_fee,
                quoter_signature,
            } => {
                0u8.write_to(writer)?
                    + expiration_time.write_to(writer)?
                    + relay_fee.write_to(writer)?
                    + quoter_signature.write_to(writer)?
            }
            Self::OnChainUsdc {
                max_relay_fee_usdc,
                take_relay_fee_from_input,
            } => {
                1u8.write_to(writer)?
                    + max_relay_fee_usdc.write_to(writer)?
                    + take_relay_fee_from_input.write_to(writer)?
            }
            Self::OnChainGas => 2u8.write_to(writer)?,
        })
    }
}

impl Decode for UserQuoteVariant {
    fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
    where
        R: Read,
        Self: Sized,
    {
        Ok(match u8::read_from(reader)? {
            0 => Self::OffChain {
                expiration_time: u32::read_from(reader)?,
                relay_fee: OffChainRelayFee::read_from(reader)?,
                quoter_signature: Signature::read_from(reader)?,
            },
            1 => Self::OnChainUsdc {
                max_relay_fee_usdc: u64::read_from(reader)?,
                take_relay_fee_from_input: bool::read_from(reader)?,
            },
            2 => Self::OnChainGas,
            other => return Err(CctprError::decode(format!("quote variant {other}"))),
        })
    }
}

/// Quote of a gasless transfer. The relay fee is always USDC.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum GaslessQuoteVariant {
    /// `0x00`
    OffChain {
        /// Unix seconds
        expiration_time: u32,
        /// The committed fee, µUSDC
        relay_fee_usdc: u64,
        /// The quoter's signature
        quoter_signature: Signature,
    },
    /// `0x01`
    OnChainUsdc {
        /// Bound on the fee, µUSDC
        max_relay_fee_usdc: u64,
        /// Whether the fee comes out of the input amount
        take_relay_fee_from_input: bool,
    },
}

// The off-chain fee keeps the pay-in byte of the user variant but fixed to 1.
const GASLESS_PAY_IN_USDC: u8 = 1;

impl Encode for GaslessQuoteVariant {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: Write,
    {
        Ok(match self {
            Self::OffChain {
                expiration_time,
                relay_fee_usdc,
                quoter_signature,
            } => {
                0u8.write_to(writer)?
                    + expiration_time.write_to(writer)?
                    + GASLESS_PAY_IN_USDC.write_to(writer)?
                    + relay_fee_usdc.write_to(writer)?
                    + quoter_signature.write_to(writer)?
            }
            Self::OnChainUsdc {
                max_relay_fee_usdc,
                take_relay_fee_from_input,
            } => {
                1u8.write_to(writer)?
                    + max_relay_fee_usdc.write_to(writer)?
                    + take_relay_fee_from_input.write_to(writer)?
            }
        })
    }
}

impl Decode for GaslessQuoteVariant {
    fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
    where
        R: Read,
        Self: Sized,
    {
        Ok(match u8::read_from(reader)? {
            0 => {
                let expiration_time = u32::read_from(reader)?;
                let pay_in = u8::read_from(reader)?;
                if pay_in != GASLESS_PAY_IN_USDC {
                    return Err(CctprError::decode(format!("gasless pay-in {pay_in}")));
                }
                Self::OffChain {
                    expiration_time,
                    relay_fee_usdc: u64::read_from(reader)?,
                    quoter_signature: Signature::read_from(reader)?,
                }
            }
            1 => Self::OnChainUsdc {
                max_relay_fee_usdc: u64::read_from(reader)?,
                take_relay_fee_from_input: bool::read_from(reader)?,
            },
            other => return Err(CctprError::decode(format!("gasless quote variant {other}"))),
        })
    }
}

/// Fields shared by all approval methods.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TransferCommon<Q> {
    /// µUSDC pulled from the user (the base amount for gasless transfers)
    pub input_amount_usdc: u64,
    /// Destination
    pub destination_domain: KnownDomain,
    /// Recipient on the destination
    pub mint_recipient: H256,
    /// µGasToken
    pub gas_dropoff: u32,
    /// Corridor and its fast fee bound
    pub corridor: EvmCorridorVariant,
    /// Relay fee terms
    pub quote: Q,
}

impl<Q: Encode> Encode for TransferCommon<Q> {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: Write,
    {
        let mut written = 0;
        written += self.input_amount_usdc.write_to(writer)?;
        written += write_domain(self.destination_domain, writer)?;
        written += self.mint_recipient.write_to(writer)?;
        written += self.gas_dropoff.write_to(writer)?;
        written += self.corridor.write_to(writer)?;
        written += self.quote.write_to(writer)?;
        Ok(written)
    }
}

impl<Q: Decode> Decode for TransferCommon<Q> {
    fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
    where
        R: Read,
        Self: Sized,
    {
        Ok(Self {
            input_amount_usdc: u64::read_from(reader)?,
            destination_domain: read_domain(reader)?,
            mint_recipient: H256::read_from(reader)?,
            gas_dropoff: u32::read_from(reader)?,
            corridor: EvmCorridorVariant::read_from(reader)?,
            quote: Q::read_from(reader)?,
        })
    }
}

/// ERC-2612 permit bundled with a transfer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Permit {
    /// Permitted amount
    pub value: U256,
    /// Unix seconds
    pub deadline: U256,
    /// The owner's signature
    pub signature: Signature,
}

impl Encode for Permit {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: Write,
    {
        Ok(self.value.write_to(writer)?
            + self.deadline.write_to(writer)?
            + self.signature.write_to(writer)?)
    }
}

impl Decode for Permit {
    fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
    where
        R: Read,
        Self: Sized,
    {
        Ok(Self {
            value: U256::read_from(reader)?,
            deadline: U256::read_from(reader)?,
            signature: Signature::read_from(reader)?,
        })
    }
}

/// The signed Permit2 witness transfer of a gasless transfer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Permit2Data {
    /// The user
    pub owner: H160,
    /// µUSDC the user permitted
    pub amount: u64,
    /// Permit2 nonce
    pub nonce: H256,
    /// Unix seconds
    pub deadline: u32,
    /// The user's signature over the typed data
    pub signature: Signature,
}

impl Encode for Permit2Data {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: Write,
    {
        Ok(self.owner.write_to(writer)?
            + self.amount.write_to(writer)?
            + self.nonce.write_to(writer)?
            + self.deadline.write_to(writer)?
            + self.signature.write_to(writer)?)
    }
}

impl Decode for Permit2Data {
    fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
    where
        R: Read,
        Self: Sized,
    {
        Ok(Self {
            owner: H160::read_from(reader)?,
            amount: u64::read_from(reader)?,
            nonce: H256::read_from(reader)?,
            deadline: u32::read_from(reader)?,
            signature: Signature::read_from(reader)?,
        })
    }
}

/// A complete transfer body, tagged by approval method.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum EvmTransfer {
    /// `0x01`
    Permit {
        /// The bundled permit
        permit: Permit,
        /// The transfer
        common: TransferCommon<UserQuoteVariant>,
    },
    /// `0x02`
    Preapproval(TransferCommon<UserQuoteVariant>),
    /// `0x03`
    Gasless {
        /// The user's witness transfer
        permit2: Permit2Data,
        /// µUSDC for the submitting relayer
        gasless_fee_usdc: u64,
        /// The transfer
        common: TransferCommon<GaslessQuoteVariant>,
    },
}

impl EvmTransfer {
    /// The approval tag byte
    pub fn approval_type(&self) -> u8 {
        match self {
            EvmTransfer::Permit { .. } => 0x01,
            EvmTransfer::Preapproval(_) => 0x02,
            EvmTransfer::Gasless { .. } => 0x03,
        }
    }

    /// Selector followed by the body.
    pub fn to_calldata(&self) -> Vec<u8> {
        let mut calldata = exec_selector().to_vec();
        calldata.extend(self.to_vec());
        calldata
    }

    /// Inverse of [`EvmTransfer::to_calldata`].
    pub fn from_calldata(calldata: &[u8]) -> CctprResult<Self> {
        Self::from_slice(strip_selector(calldata, exec_selector())?)
    }
}

impl Encode for EvmTransfer {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: Write,
    {
        let mut written = self.approval_type().write_to(writer)?;
        written += match self {
            EvmTransfer::Permit { permit, common } => {
                permit.write_to(writer)? + common.write_to(writer)?
            }
            EvmTransfer::Preapproval(common) => common.write_to(writer)?,
            EvmTransfer::Gasless {
                permit2,
                gasless_fee_usdc,
                common,
            } => {
                permit2.write_to(writer)?
                    + gasless_fee_usdc.write_to(writer)?
                    + common.write_to(writer)?
            }
        };
        Ok(written)
    }
}

impl Decode for EvmTransfer {
    fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
    where
        R: Read,
        Self: Sized,
    {
        Ok(match u8::read_from(reader)? {
            0x01 => EvmTransfer::Permit {
                permit: Permit::read_from(reader)?,
                common: TransferCommon::read_from(reader)?,
            },
            0x02 => EvmTransfer::Preapproval(TransferCommon::read_from(reader)?),
            0x03 => EvmTransfer::Gasless {
                permit2: Permit2Data::read_from(reader)?,
                gasless_fee_usdc: u64::read_from(reader)?,
                common: TransferCommon::read_from(reader)?,
            },
            other => return Err(CctprError::decode(format!("approval type {other:#04x}"))),
        })
    }
}
