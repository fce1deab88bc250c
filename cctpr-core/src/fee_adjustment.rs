use std::collections::HashMap;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::{Amount, CctprError, CctprResult, Corridor, Kind, KnownDomain, Rounding, U256};

/// What a fee adjustment applies to. The discriminant is the wire id.
#[derive(
    FromPrimitive,
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    EnumString,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum FeeAdjustmentType {
    /// Execution cost of a `v1` corridor
    V1 = 0,
    /// Execution cost of a `v2Direct` corridor
    V2Direct = 1,
    /// Execution cost of an `avaxHop` corridor, hop leg included
    AvaxHop = 2,
    /// Cost of the requested gas dropoff
    GasDropoff = 3,
}

impl FeeAdjustmentType {
    /// Wire id
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Decodes the wire id.
    pub fn from_id(id: u8) -> CctprResult<Self> {
        FromPrimitive::from_u8(id)
            .ok_or_else(|| CctprError::decode(format!("fee adjustment type {id}")))
    }
}

impl From<Corridor> for FeeAdjustmentType {
    fn from(corridor: Corridor) -> Self {
        match corridor {
            Corridor::V1 => FeeAdjustmentType::V1,
            Corridor::V2Direct => FeeAdjustmentType::V2Direct,
            Corridor::AvaxHop => FeeAdjustmentType::AvaxHop,
        }
    }
}

/// A markup `fee * relative + absolute`, clamped at zero.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FeeAdjustment {
    /// µUSDC added after scaling, may be negative
    pub absolute_usdc: i64,
    /// Scale applied to the raw fee
    pub relative: Amount,
}

impl Default for FeeAdjustment {
    fn default() -> Self {
        Self::at_cost()
    }
}

impl FeeAdjustment {
    /// A markup from its parts.
    pub fn new(absolute_usdc: i64, relative: Amount) -> CctprResult<Self> {
        relative.ensure_kind(Kind::Percentage)?;
        Ok(Self {
            absolute_usdc,
            relative,
        })
    }

    /// The neutral markup, `{0, 100 %}`.
    pub fn at_cost() -> Self {
        Self {
            absolute_usdc: 0,
            relative: Amount::percent(100),
        }
    }

    /// Applies the markup to a raw USDC fee.
    pub fn apply(&self, fee: &Amount) -> CctprResult<Amount> {
        fee.ensure_kind(Kind::Usdc)?;
        let scaled = fee.mul_percentage(&self.relative, Rounding::Floor)?;
        let absolute = Amount::usdc(self.absolute_usdc.unsigned_abs());
        if self.absolute_usdc >= 0 {
            scaled.checked_add(&absolute)
        } else {
            scaled.saturating_sub(&absolute)
        }
    }

    /// Relative part in basis points, for the storage encodings.
    pub fn relative_bps(&self) -> CctprResult<u64> {
        let bps = self.relative.atomic() / U256::from(100);
        u64::try_from(bps).map_err(|_| CctprError::Overflow {
            field: "relative bps",
            value: self.relative.to_string(),
        })
    }
}

/// Fee adjustments by type and domain, read from one storage snapshot. Missing
/// entries are at cost.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeAdjustmentTable {
    entries: HashMap<FeeAdjustmentType, HashMap<KnownDomain, FeeAdjustment>>,
}

impl FeeAdjustmentTable {
    /// An empty, all-at-cost table
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the adjustment of `(ty, domain)`.
    pub fn insert(&mut self, ty: FeeAdjustmentType, domain: KnownDomain, adjustment: FeeAdjustment) {
        self.entries.entry(ty).or_default().insert(domain, adjustment);
    }

    /// Builder variant of [`FeeAdjustmentTable::insert`].
    pub fn with(mut self, ty: FeeAdjustmentType, domain: KnownDomain, adjustment: FeeAdjustment) -> Self {
        self.insert(ty, domain, adjustment);
        self
    }

    /// The adjustment of `(ty, domain)`.
    pub fn get(&self, ty: FeeAdjustmentType, domain: KnownDomain) -> FeeAdjustment {
        self.entries
            .get(&ty)
            .and_then(|by_domain| by_domain.get(&domain))
            .copied()
            .unwrap_or_default()
    }

    /// Applies the adjustment of `(ty, domain)` to a raw USDC fee.
    pub fn apply(&self, ty: FeeAdjustmentType, domain: KnownDomain, fee: &Amount) -> CctprResult<Amount> {
        self.get(ty, domain).apply(fee)
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 100, 1_000, 1_000)]
    #[case(500, 100, 1_000, 1_500)]
    #[case(0, 150, 1_000, 1_500)]
    #[case(-200, 100, 1_000, 800)]
    #[case(-2_000, 100, 1_000, 0)]
    #[case(250_000, 0, 1_000, 250_000)]
    fn applies_markup(
        #[case] absolute: i64,
        #[case] percent: u64,
        #[case] fee: u64,
        #[case] expected: u64,
    ) {
        let adjustment = FeeAdjustment::new(absolute, Amount::percent(percent)).unwrap();
        assert_eq!(
            adjustment.apply(&Amount::usdc(fee)).unwrap(),
            Amount::usdc(expected)
        );
    }

    #[test]
    fn relative_part_floors() {
        let adjustment = FeeAdjustment::new(0, Amount::bps(10_050)).unwrap();
        assert_eq!(adjustment.apply(&Amount::usdc(3)).unwrap(), Amount::usdc(3));
        assert_eq!(adjustment.relative_bps().unwrap(), 10_050);
    }

    #[test]
    fn monotone_in_both_parts() {
        let fees = [0u64, 1, 7, 999, 1_000_000, 123_456_789];
        let absolutes = [-1_000i64, -1, 0, 1, 1_000];
        let bps = [0u64, 5_000, 10_000, 10_001, 25_000];
        for fee in fees.map(Amount::usdc) {
            for window in absolutes.windows(2) {
                for b in bps {
                    let lo = FeeAdjustment::new(window[0], Amount::bps(b)).unwrap();
                    let hi = FeeAdjustment::new(window[1], Amount::bps(b)).unwrap();
                    assert!(lo.apply(&fee).unwrap() <= hi.apply(&fee).unwrap());
                }
            }
            for window in bps.windows(2) {
                for a in absolutes {
                    let lo = FeeAdjustment::new(a, Amount::bps(window[0])).unwrap();
                    let hi = FeeAdjustment::new(a, Amount::bps(window[1])).unwrap();
                    assert!(lo.apply(&fee).unwrap() <= hi.apply(&fee).unwrap());
                }
            }
        }
    }

    #[test]
    fn table_falls_back_to_at_cost() {
        let markup = FeeAdjustment::new(100, Amount::percent(110)).unwrap();
        let table = FeeAdjustmentTable::new().with(FeeAdjustmentType::V1, KnownDomain::Base, markup);
        assert_eq!(table.get(FeeAdjustmentType::V1, KnownDomain::Base), markup);
        assert_eq!(
            table.get(FeeAdjustmentType::V2Direct, KnownDomain::Base),
            FeeAdjustment::at_cost()
        );
        assert_eq!(
            table
                .apply(FeeAdjustmentType::V1, KnownDomain::Base, &Amount::usdc(1_000))
                .unwrap(),
            Amount::usdc(1_200)
        );
        assert!(table
            .apply(FeeAdjustmentType::V1, KnownDomain::Base, &Amount::percent(1))
            .is_err());
    }
}
