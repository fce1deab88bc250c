//! Storage layout of the relayer contract.
//!
//! Slots 0..=4 are mappings from a mapping index to one packed word: the extra
//! chain id table and the fee adjustments of each type. Slots 5..=9 hold the
//! role addresses. Packed words store their entries from the low end, so entry
//! `i` occupies the `i`-th lowest group of bytes.

use std::collections::BTreeMap;
use std::fmt::Debug;

use futures::future::try_join_all;
use strum::IntoEnumIterator;
use tracing::{debug, instrument};

use cctpr_core::{
    utils::keccak256_concat, Amount, CctprError, CctprResult, ContractReader, Encode,
    FeeAdjustment, FeeAdjustmentTable, FeeAdjustmentType, GovernanceRoles, KnownDomain, Network,
    Platform, Role, H160, H256, U256,
};

/// Fee adjustments packed into one word
pub const FEE_ADJUSTMENTS_PER_SLOT: usize = 8;
/// Extra chain ids packed into one word
pub const CHAIN_IDS_PER_SLOT: usize = 12;
/// Mapping slot of the extra chain id table
pub const EXTRA_CHAIN_IDS_SLOT: u8 = 0;

const CENTI_USDC: i64 = 10_000;
const PERCENT: u64 = 10_000;

/// Mapping slot of the fee adjustments of `ty`.
pub fn fee_adjustments_slot(ty: FeeAdjustmentType) -> u8 {
    ty.id() + 1
}

/// Storage slot of a role address.
pub fn role_slot(role: Role) -> u8 {
    match role {
        Role::FeeRecipient => 5,
        Role::OffChainQuoter => 6,
        Role::Owner => 7,
        Role::PendingOwner => 8,
        Role::FeeAdjuster => 9,
    }
}

/// Solidity storage location of `mapping[key]` for a mapping at `slot`.
pub fn slot_of_key_in_mapping(key: U256, slot: U256) -> H256 {
    let (mut key_word, mut slot_word) = ([0u8; 32], [0u8; 32]);
    key.to_big_endian(&mut key_word);
    slot.to_big_endian(&mut slot_word);
    keccak256_concat([key_word.as_slice(), slot_word.as_slice()])
}

fn domain_count() -> usize {
    KnownDomain::iter().count()
}

/// Words per fee adjustment type needed to cover every domain id.
pub fn fee_adjustment_slot_count() -> usize {
    (domain_count() + FEE_ADJUSTMENTS_PER_SLOT - 1) / FEE_ADJUSTMENTS_PER_SLOT
}

/// Domains whose chain id is not compiled into the contract, and thus lives
/// in the extra chain id table.
pub fn extra_domains(network: Network) -> impl Iterator<Item = KnownDomain> {
    KnownDomain::iter().filter(move |domain| {
        domain.id() as usize >= CHAIN_IDS_PER_SLOT
            && domain.platform() == Platform::Evm
            && domain.oracle_chain_id(network).is_some()
    })
}

fn extra_chain_id_slot_count() -> usize {
    (domain_count() + CHAIN_IDS_PER_SLOT - 1) / CHAIN_IDS_PER_SLOT - 1
}

/// A fee adjustment as stored: whole centi-USDC and whole percent.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EvmFeeAdjustment {
    /// Absolute markup, 10⁻² USDC
    pub absolute_centi_usdc: i16,
    /// Relative markup, percent
    pub relative_percent: u16,
}

impl Default for EvmFeeAdjustment {
    fn default() -> Self {
        Self {
            absolute_centi_usdc: 0,
            relative_percent: 100,
        }
    }
}

impl TryFrom<&FeeAdjustment> for EvmFeeAdjustment {
    type Error = CctprError;

    fn try_from(adjustment: &FeeAdjustment) -> Result<Self, Self::Error> {
        let absolute = adjustment.absolute_usdc;
        let absolute_centi_usdc = (absolute % CENTI_USDC == 0)
            .then(|| i16::try_from(absolute / CENTI_USDC).ok())
            .flatten()
            .ok_or_else(|| CctprError::Overflow {
                field: "absolute fee adjustment in centi-USDC",
                value: Amount::usdc(absolute.unsigned_abs()).to_string(),
            })?;
        let relative = adjustment.relative.atomic();
        let relative_percent = (relative % U256::from(PERCENT)).is_zero()
            .then(|| u16::try_from(relative / U256::from(PERCENT)).ok())
            .flatten()
            .ok_or_else(|| CctprError::Overflow {
                field: "relative fee adjustment in percent",
                value: adjustment.relative.to_string(),
            })?;
        Ok(Self {
            absolute_centi_usdc,
            relative_percent,
        })
    }
}

impl From<EvmFeeAdjustment> for FeeAdjustment {
    fn from(adjustment: EvmFeeAdjustment) -> Self {
        Self {
            absolute_usdc: i64::from(adjustment.absolute_centi_usdc) * CENTI_USDC,
            relative: Amount::percent(adjustment.relative_percent.into()),
        }
    }
}

/// One word of fee adjustments.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FeeAdjustmentsSlot(pub [EvmFeeAdjustment; FEE_ADJUSTMENTS_PER_SLOT]);

impl FeeAdjustmentsSlot {
    /// The stored word
    pub fn to_word(&self) -> H256 {
        let mut word = [0u8; 32];
        for (i, entry) in self.0.iter().enumerate() {
            let end = 32 - 4 * i;
            word[end - 4..end - 2].copy_from_slice(&entry.absolute_centi_usdc.to_be_bytes());
            word[end - 2..end].copy_from_slice(&entry.relative_percent.to_be_bytes());
        }
        H256(word)
    }

    /// Inverse of [`FeeAdjustmentsSlot::to_word`].
    pub fn from_word(word: H256) -> Self {
        let mut slot = Self::default();
        for (i, entry) in slot.0.iter_mut().enumerate() {
            let end = 32 - 4 * i;
            entry.absolute_centi_usdc = i16::from_be_bytes([word[end - 4], word[end - 3]]);
            entry.relative_percent = u16::from_be_bytes([word[end - 2], word[end - 1]]);
        }
        slot
    }
}

impl Encode for FeeAdjustmentsSlot {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: std::io::Write,
    {
        self.to_word().write_to(writer)
    }
}

/// One word of extra chain ids.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ChainIdsSlot(pub [u16; CHAIN_IDS_PER_SLOT]);

impl ChainIdsSlot {
    /// The stored word
    pub fn to_word(&self) -> H256 {
        let mut word = [0u8; 32];
        for (i, chain_id) in self.0.iter().enumerate() {
            let end = 32 - 2 * i;
            word[end - 2..end].copy_from_slice(&chain_id.to_be_bytes());
        }
        H256(word)
    }

    /// Inverse of [`ChainIdsSlot::to_word`].
    pub fn from_word(word: H256) -> Self {
        let mut slot = Self::default();
        for (i, chain_id) in slot.0.iter_mut().enumerate() {
            let end = 32 - 2 * i;
            *chain_id = u16::from_be_bytes([word[end - 2], word[end - 1]]);
        }
        slot
    }
}

impl Encode for ChainIdsSlot {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: std::io::Write,
    {
        self.to_word().write_to(writer)
    }
}

/// Packs the adjustments of `ty` into words, indexed by mapping index.
pub fn pack_fee_adjustments(
    table: &FeeAdjustmentTable,
    ty: FeeAdjustmentType,
) -> CctprResult<Vec<FeeAdjustmentsSlot>> {
    let mut slots = vec![FeeAdjustmentsSlot::default(); fee_adjustment_slot_count()];
    for domain in KnownDomain::iter() {
        let index = domain.id() as usize;
        slots[index / FEE_ADJUSTMENTS_PER_SLOT].0[index % FEE_ADJUSTMENTS_PER_SLOT] =
            EvmFeeAdjustment::try_from(&table.get(ty, domain))?;
    }
    Ok(slots)
}

/// Adds the adjustments of `ty` held in `slots` to `table`.
pub fn unpack_fee_adjustments(
    ty: FeeAdjustmentType,
    slots: &[FeeAdjustmentsSlot],
    table: &mut FeeAdjustmentTable,
) {
    for domain in KnownDomain::iter() {
        let index = domain.id() as usize;
        if let Some(slot) = slots.get(index / FEE_ADJUSTMENTS_PER_SLOT) {
            table.insert(ty, domain, slot.0[index % FEE_ADJUSTMENTS_PER_SLOT].into());
        }
    }
}

/// Packs extra chain ids into words. The first word is mapping index 1,
/// index 0 being compiled into the contract.
pub fn pack_extra_chain_ids(chain_ids: &BTreeMap<KnownDomain, u16>) -> CctprResult<Vec<ChainIdsSlot>> {
    let mut slots = vec![ChainIdsSlot::default(); extra_chain_id_slot_count()];
    for (domain, chain_id) in chain_ids {
        let index = domain.id() as usize;
        let slot = (index / CHAIN_IDS_PER_SLOT)
            .checked_sub(1)
            .and_then(|mapping_index| slots.get_mut(mapping_index))
            .ok_or(CctprError::UnknownDomainId(domain.id().into()))?;
        slot.0[index % CHAIN_IDS_PER_SLOT] = *chain_id;
    }
    Ok(slots)
}

/// Inverse of [`pack_extra_chain_ids`]. Zero entries are unregistered.
pub fn unpack_extra_chain_ids(slots: &[ChainIdsSlot]) -> BTreeMap<KnownDomain, u16> {
    let mut chain_ids = BTreeMap::new();
    for (mapping_index, slot) in slots.iter().enumerate() {
        for (position, chain_id) in slot.0.iter().enumerate() {
            let id = (mapping_index + 1) * CHAIN_IDS_PER_SLOT + position;
            if *chain_id == 0 {
                continue;
            }
            if let Ok(domain) = KnownDomain::try_from(id as u32) {
                chain_ids.insert(domain, *chain_id);
            }
        }
    }
    chain_ids
}

/// The chain data appended to the constructor arguments: extra chain id
/// words, then for each mapping index the fee adjustment word of every type.
pub fn chain_data(network: Network, table: &FeeAdjustmentTable) -> CctprResult<Vec<u8>> {
    let chain_ids = extra_domains(network)
        .filter_map(|domain| Some((domain, domain.oracle_chain_id(network)?)))
        .collect();
    let mut data = vec![];
    for slot in pack_extra_chain_ids(&chain_ids)? {
        data.extend(slot.to_vec());
    }
    let by_type = FeeAdjustmentType::iter()
        .map(|ty| pack_fee_adjustments(table, ty))
        .collect::<CctprResult<Vec<_>>>()?;
    for mapping_index in 0..fee_adjustment_slot_count() {
        for slots in &by_type {
            data.extend(slots[mapping_index].to_vec());
        }
    }
    Ok(data)
}

/// Reads governance state from the relayer contract's storage.
#[derive(Debug, Clone)]
pub struct EthereumStorageReader<R> {
    address: H160,
    reader: R,
}

impl<R> EthereumStorageReader<R>
where
    R: ContractReader + Debug,
{
    /// A reader of the contract at `address`.
    pub fn new(address: H160, reader: R) -> Self {
        Self { address, reader }
    }

    async fn word(&self, slot: H256) -> CctprResult<H256> {
        self.reader.get_storage_at(self.address, slot).await
    }

    async fn role(&self, role: Role) -> CctprResult<H160> {
        let word = self.word(H256::from_low_u64_be(role_slot(role).into())).await?;
        Ok(H160::from_slice(&word[12..]))
    }

    /// All role addresses.
    #[instrument(err, skip(self), fields(contract = ?self.address))]
    pub async fn roles(&self) -> CctprResult<GovernanceRoles> {
        let (fee_recipient, off_chain_quoter, owner, pending_owner, fee_adjuster) = futures::try_join!(
            self.role(Role::FeeRecipient),
            self.role(Role::OffChainQuoter),
            self.role(Role::Owner),
            self.role(Role::PendingOwner),
            self.role(Role::FeeAdjuster),
        )?;
        Ok(GovernanceRoles {
            owner: owner.into(),
            pending_owner: (!pending_owner.is_zero()).then(|| pending_owner.into()),
            fee_adjuster: fee_adjuster.into(),
            fee_recipient: fee_recipient.into(),
            off_chain_quoter,
        })
    }

    /// The full fee adjustment table.
    #[instrument(err, skip(self), fields(contract = ?self.address))]
    pub async fn fee_adjustments(&self) -> CctprResult<FeeAdjustmentTable> {
        let slot_count = fee_adjustment_slot_count();
        let locations = FeeAdjustmentType::iter().flat_map(|ty| {
            (0..slot_count).map(move |mapping_index| {
                slot_of_key_in_mapping(mapping_index.into(), fee_adjustments_slot(ty).into())
            })
        });
        let words = try_join_all(locations.map(|slot| self.word(slot))).await?;

        let mut table = FeeAdjustmentTable::new();
        for (ty, words) in FeeAdjustmentType::iter().zip(words.chunks(slot_count)) {
            let slots = words
                .iter()
                .copied()
                .map(FeeAdjustmentsSlot::from_word)
                .collect::<Vec<_>>();
            unpack_fee_adjustments(ty, &slots, &mut table);
        }
        debug!(?table, "Read fee adjustments");
        Ok(table)
    }

    /// Registered extra chain ids.
    #[instrument(err, skip(self), fields(contract = ?self.address))]
    pub async fn extra_chain_ids(&self) -> CctprResult<BTreeMap<KnownDomain, u16>> {
        let words = try_join_all((1..=extra_chain_id_slot_count()).map(|mapping_index| {
            self.word(slot_of_key_in_mapping(
                mapping_index.into(),
                EXTRA_CHAIN_IDS_SLOT.into(),
            ))
        }))
        .await?;
        Ok(unpack_extra_chain_ids(
            &words.into_iter().map(ChainIdsSlot::from_word).collect::<Vec<_>>(),
        ))
    }
}

#[cfg(test)]
mod test {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn mapping_slot_matches_solidity() {
        // keccak256(abi.encode(uint256(0), uint256(1)))
        assert_eq!(
            slot_of_key_in_mapping(U256::zero(), U256::one()),
            H256(hex!(
                "a6eef7e35abe7026729641147f7915573c7e97b47efa546f5f6e3230263bcb49"
            ))
        );
    }

    #[test]
    fn slot_counts() {
        assert_eq!(fee_adjustment_slot_count(), 2);
        assert_eq!(extra_chain_id_slot_count(), 1);
        assert_eq!(
            extra_domains(Network::Mainnet).collect::<Vec<_>>(),
            vec![KnownDomain::Codex, KnownDomain::Sonic, KnownDomain::Worldchain]
        );
    }

    #[test]
    fn fee_adjustment_word_layout() {
        let mut slot = FeeAdjustmentsSlot::default();
        slot.0[0] = EvmFeeAdjustment {
            absolute_centi_usdc: -2,
            relative_percent: 110,
        };
        let word = slot.to_word();
        assert_eq!(word[28..32], hex!("fffe 006e"));
        assert_eq!(word[24..28], hex!("0000 0064"));
        assert_eq!(FeeAdjustmentsSlot::from_word(word), slot);
    }

    #[test]
    fn fee_adjustment_conversion() {
        let adjustment = FeeAdjustment::new(250_000, Amount::percent(105)).unwrap();
        let stored = EvmFeeAdjustment::try_from(&adjustment).unwrap();
        assert_eq!(stored.absolute_centi_usdc, 25);
        assert_eq!(stored.relative_percent, 105);
        assert_eq!(FeeAdjustment::from(stored), adjustment);

        let too_fine = FeeAdjustment::new(1, Amount::percent(100)).unwrap();
        assert!(matches!(
            EvmFeeAdjustment::try_from(&too_fine),
            Err(CctprError::Overflow { .. })
        ));
        let basis_points = FeeAdjustment::new(0, Amount::bps(10_050)).unwrap();
        assert!(EvmFeeAdjustment::try_from(&basis_points).is_err());
    }

    #[test]
    fn table_packing_is_reversible() {
        let table = FeeAdjustmentTable::new()
            .with(
                FeeAdjustmentType::V2Direct,
                KnownDomain::Worldchain,
                FeeAdjustment::new(-10_000, Amount::percent(90)).unwrap(),
            )
            .with(
                FeeAdjustmentType::V2Direct,
                KnownDomain::Ethereum,
                FeeAdjustment::new(1_000_000, Amount::percent(120)).unwrap(),
            );
        let slots = pack_fee_adjustments(&table, FeeAdjustmentType::V2Direct).unwrap();
        assert_eq!(slots.len(), 2);
        // Worldchain is domain 14: second word, position 6
        assert_eq!(slots[1].0[6].absolute_centi_usdc, -1);

        let mut unpacked = FeeAdjustmentTable::new();
        unpack_fee_adjustments(FeeAdjustmentType::V2Direct, &slots, &mut unpacked);
        for domain in KnownDomain::iter() {
            assert_eq!(
                unpacked.get(FeeAdjustmentType::V2Direct, domain),
                table.get(FeeAdjustmentType::V2Direct, domain)
            );
        }
    }

    #[test]
    fn extra_chain_id_packing() {
        let ids = BTreeMap::from([(KnownDomain::Codex, 54), (KnownDomain::Worldchain, 45)]);
        let slots = pack_extra_chain_ids(&ids).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].to_word()[30..32], 54u16.to_be_bytes());
        assert_eq!(unpack_extra_chain_ids(&slots), ids);
        assert_eq!(
            ChainIdsSlot::from_word(slots[0].to_word()),
            slots[0],
        );

        let baked_in = BTreeMap::from([(KnownDomain::Base, 30)]);
        assert!(pack_extra_chain_ids(&baked_in).is_err());
    }

    #[test]
    fn chain_data_layout() {
        let data = chain_data(Network::Mainnet, &FeeAdjustmentTable::new()).unwrap();
        // one chain id word, then two mapping indices of four types
        assert_eq!(data.len(), 32 * (1 + 2 * 4));
        let chain_ids = ChainIdsSlot::from_word(H256::from_slice(&data[..32]));
        assert_eq!(chain_ids.0[0..3], [54, 52, 45]);
        let at_cost = FeeAdjustmentsSlot::from_word(H256::from_slice(&data[32..64]));
        assert_eq!(at_cost, FeeAdjustmentsSlot::default());
    }
}
