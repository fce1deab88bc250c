//! Accounts of the relayer program and the price oracle.

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_program::pubkey::Pubkey;

use cctpr_core::{
    Amount, CctprError, CctprResult, FeeAdjustment, FeeAdjustmentType, GovernanceRoles, Platform,
    H160,
};

use crate::to_universal;

/// Length of an Anchor discriminator.
pub const DISCRIMINATOR_LENGTH: usize = 8;

/// `sha256(namespace ":" name)[..8]`, the way Anchor tags accounts and
/// instructions.
pub fn anchor_discriminator(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LENGTH] {
    let digest = Sha256::new()
        .chain_update(namespace.as_bytes())
        .chain_update(b":")
        .chain_update(name.as_bytes())
        .finalize();
    let mut discriminator = [0; DISCRIMINATOR_LENGTH];
    discriminator.copy_from_slice(&digest[..DISCRIMINATOR_LENGTH]);
    discriminator
}

/// Borsh data behind an 8 byte discriminator.
pub trait DiscriminatorData: BorshDeserialize + BorshSerialize {
    /// Account type name, for errors
    const NAME: &'static str;
    /// The discriminator
    const DISCRIMINATOR: [u8; DISCRIMINATOR_LENGTH];

    /// Decodes account data. Trailing bytes are allowed since accounts may be
    /// allocated larger than their data.
    fn decode(data: &[u8]) -> CctprResult<Self> {
        if data.len() < DISCRIMINATOR_LENGTH || data[..DISCRIMINATOR_LENGTH] != Self::DISCRIMINATOR
        {
            return Err(CctprError::decode(format!(
                "{} account has an invalid discriminator",
                Self::NAME
            )));
        }
        let mut body = &data[DISCRIMINATOR_LENGTH..];
        Self::deserialize(&mut body)
            .map_err(|err| CctprError::decode(format!("{} account: {err}", Self::NAME)))
    }

    /// Decodes an account that must exist.
    fn decode_required(data: Option<&[u8]>, address: &Pubkey) -> CctprResult<Self> {
        let data = data.ok_or_else(|| {
            CctprError::MissingAccount(format!("{} account {address}", Self::NAME))
        })?;
        Self::decode(data)
    }

    /// Discriminator followed by the data.
    fn encode(&self) -> Vec<u8> {
        let mut data = Self::DISCRIMINATOR.to_vec();
        data.extend(borsh::to_vec(self).unwrap_or_default());
        data
    }
}

/// The relayer program's singleton config.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct ConfigAccount {
    /// The owner.
    pub owner: Pubkey,
    /// The owner-elect, zero when no transfer is pending.
    pub pending_owner: Pubkey,
    /// May update fee adjustments.
    pub fee_adjuster: Pubkey,
    /// Receives the fees.
    pub fee_recipient: Pubkey,
    /// Ethereum address of the off-chain quoter.
    pub offchain_quoter: [u8; 20],
    /// Bump of the rent custodian.
    pub rent_bump: u8,
}

impl DiscriminatorData for ConfigAccount {
    const NAME: &'static str = "Config";
    const DISCRIMINATOR: [u8; DISCRIMINATOR_LENGTH] = [0x9b, 0x0c, 0xaa, 0xe0, 0x1e, 0xfa, 0xcc, 0x82];
}

impl ConfigAccount {
    /// The roles as the engine sees them.
    pub fn roles(&self) -> GovernanceRoles {
        GovernanceRoles {
            owner: to_universal(&self.owner),
            pending_owner: (self.pending_owner != Pubkey::default())
                .then(|| to_universal(&self.pending_owner)),
            fee_adjuster: to_universal(&self.fee_adjuster),
            fee_recipient: to_universal(&self.fee_recipient),
            off_chain_quoter: H160(self.offchain_quoter),
        }
    }
}

/// A fee adjustment as stored on chain.
#[derive(BorshDeserialize, BorshSerialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeeAdjustmentEntry {
    /// µUSDC added after scaling.
    pub absolute_usd: i32,
    /// Scale in basis points.
    pub relative_percent_bps: u32,
}

impl FeeAdjustmentEntry {
    /// Converts into the engine's representation.
    pub fn to_adjustment(self) -> CctprResult<FeeAdjustment> {
        FeeAdjustment::new(
            self.absolute_usd.into(),
            Amount::bps(self.relative_percent_bps.into()),
        )
    }
}

impl TryFrom<&FeeAdjustment> for FeeAdjustmentEntry {
    type Error = CctprError;

    fn try_from(adjustment: &FeeAdjustment) -> Result<Self, Self::Error> {
        let bps = adjustment.relative_bps()?;
        let overflow = |field| CctprError::Overflow {
            field,
            value: format!("{adjustment:?}"),
        };
        Ok(Self {
            absolute_usd: i32::try_from(adjustment.absolute_usdc)
                .map_err(|_| overflow("absolute fee adjustment"))?,
            relative_percent_bps: u32::try_from(bps)
                .map_err(|_| overflow("relative fee adjustment"))?,
        })
    }
}

/// Configuration of one registered destination.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct ChainConfigAccount {
    /// Bridge domain id.
    pub domain_id: u8,
    /// Oracle chain id.
    pub chain_id: u16,
    /// Indexed by fee adjustment type.
    pub fee_adjustments: [FeeAdjustmentEntry; 4],
}

impl DiscriminatorData for ChainConfigAccount {
    const NAME: &'static str = "ChainConfig";
    const DISCRIMINATOR: [u8; DISCRIMINATOR_LENGTH] = [0x0d, 0xb1, 0xe9, 0x8d, 0xd4, 0x1d, 0x94, 0x38];
}

impl ChainConfigAccount {
    /// The adjustment of one type.
    pub fn fee_adjustment(&self, ty: FeeAdjustmentType) -> CctprResult<FeeAdjustment> {
        self.fee_adjustments[usize::from(ty.id())].to_adjustment()
    }
}

/// The price oracle's singleton config.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct OracleConfigAccount {
    /// The owner.
    pub owner: Pubkey,
    /// The owner-elect.
    pub pending_owner: Option<Pubkey>,
    /// µUSDC per SOL.
    pub sol_price: u64,
}

impl DiscriminatorData for OracleConfigAccount {
    const NAME: &'static str = "PriceOracleConfigState";
    const DISCRIMINATOR: [u8; DISCRIMINATOR_LENGTH] = [0x56, 0x25, 0xad, 0x45, 0xaa, 0xe6, 0x7f, 0x96];
}

/// Gas prices of an EVM chain.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmPrices {
    /// Mwei per gas.
    pub gas_price: u32,
    /// Mwei per transaction byte.
    pub price_per_tx_byte: u32,
}

/// Gas prices of Sui.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiPrices {
    /// MIST per compute unit.
    pub compute_unit_price: u32,
    /// MIST per storage byte.
    pub byte_price: u32,
    /// Share of the storage deposit refunded on deletion, in percent.
    pub rebate_ratio: u8,
}

/// Platform specific part of a prices account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformPrices {
    /// EVM
    Evm(EvmPrices),
    /// Sui
    Sui(SuiPrices),
}

/// The prices of one chain.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct PricesAccount {
    /// Oracle chain id, zero until the oracle first writes prices.
    pub chain_id: u16,
    /// µUSDC per whole gas token.
    pub gas_token_price: u64,
    /// Layout depends on the chain's platform.
    pub prices: [u8; 16],
}

impl DiscriminatorData for PricesAccount {
    const NAME: &'static str = "PricesState";
    const DISCRIMINATOR: [u8; DISCRIMINATOR_LENGTH] = [0x37, 0x89, 0x31, 0xbb, 0x0f, 0x63, 0x01, 0x1e];
}

impl PricesAccount {
    /// Decodes the platform prices, failing for records the oracle never
    /// wrote.
    pub fn platform_prices(&self, platform: Platform) -> CctprResult<PlatformPrices> {
        if self.chain_id == 0 {
            return Err(CctprError::StalePriceData(
                "prices account was never written".to_owned(),
            ));
        }
        let mut prices = self.prices.as_slice();
        let decoded = match platform {
            Platform::Evm => EvmPrices::deserialize(&mut prices).map(PlatformPrices::Evm),
            Platform::Sui => SuiPrices::deserialize(&mut prices).map(PlatformPrices::Sui),
            other => {
                return Err(CctprError::StalePriceData(format!(
                    "no prices for platform {other} on chain {}",
                    self.chain_id
                )))
            }
        };
        decoded.map_err(|err| CctprError::decode(format!("platform prices: {err}")))
    }
}
