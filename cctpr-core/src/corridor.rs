use std::time::Duration;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::{
    Amount, CctprError, CctprResult, DomainRegistry, KnownDomain, ProtocolVersion, Rounding,
    HOP_DOMAIN,
};

/// Routing and versioning strategy of one transfer.
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
pub enum Corridor {
    /// Legacy protocol end to end
    V1 = 0,
    /// Fast protocol end to end
    V2Direct = 1,
    /// Fast protocol into the hop domain, legacy protocol out of it
    AvaxHop = 2,
}

impl Corridor {
    /// Wire id
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Decodes the wire id.
    pub fn from_id(id: u8) -> CctprResult<Self> {
        FromPrimitive::from_u8(id).ok_or_else(|| CctprError::decode(format!("corridor id {id}")))
    }

    /// Whether the protocol charges a fast fee on this corridor.
    pub const fn is_fast(self) -> bool {
        !matches!(self, Corridor::V1)
    }

    /// Name used in the gasless witness.
    pub const fn witness_name(self) -> &'static str {
        match self {
            Corridor::V1 => "CCTPv1",
            Corridor::V2Direct => "CCTPv2",
            Corridor::AvaxHop => "CCTPv2->Avalanche->CCTPv1",
        }
    }
}

/// A corridor together with the fast fee rate that applies to it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CorridorParams {
    /// Legacy corridor, no fast fee
    V1,
    /// Direct fast corridor
    V2Direct {
        /// Fast fee charged by the protocol on the burned amount
        fast_fee_rate: Amount,
    },
    /// Hop corridor
    AvaxHop {
        /// Fast fee charged by the protocol on the burned amount
        fast_fee_rate: Amount,
    },
}

impl CorridorParams {
    /// Pairs a corridor with its fast fee rate, ignored for `v1`.
    pub fn new(corridor: Corridor, fast_fee_rate: Amount) -> CctprResult<Self> {
        fast_fee_rate.ensure_kind(crate::Kind::Percentage)?;
        Ok(match corridor {
            Corridor::V1 => CorridorParams::V1,
            Corridor::V2Direct => CorridorParams::V2Direct { fast_fee_rate },
            Corridor::AvaxHop => CorridorParams::AvaxHop { fast_fee_rate },
        })
    }

    /// The corridor
    pub fn corridor(&self) -> Corridor {
        match self {
            CorridorParams::V1 => Corridor::V1,
            CorridorParams::V2Direct { .. } => Corridor::V2Direct,
            CorridorParams::AvaxHop { .. } => Corridor::AvaxHop,
        }
    }

    /// Fast fee rate, `None` for `v1`.
    pub fn fast_fee_rate(&self) -> Option<&Amount> {
        match self {
            CorridorParams::V1 => None,
            CorridorParams::V2Direct { fast_fee_rate } | CorridorParams::AvaxHop { fast_fee_rate } => {
                Some(fast_fee_rate)
            }
        }
    }

    /// The wire variant with the maximum fast fee for `burn_amount` embedded.
    pub fn to_variant(&self, burn_amount: &Amount) -> CctprResult<CorridorVariant> {
        Ok(match self {
            CorridorParams::V1 => CorridorVariant::V1,
            CorridorParams::V2Direct { fast_fee_rate } => CorridorVariant::V2Direct {
                max_fast_fee: calc_fast_fee(burn_amount, fast_fee_rate)?,
            },
            CorridorParams::AvaxHop { fast_fee_rate } => CorridorVariant::AvaxHop {
                max_fast_fee: calc_fast_fee(burn_amount, fast_fee_rate)?,
            },
        })
    }
}

/// The corridor as it appears in a transfer payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CorridorVariant {
    /// Legacy corridor
    V1,
    /// Direct fast corridor
    V2Direct {
        /// Upper bound on the fast fee, µUSDC
        max_fast_fee: Amount,
    },
    /// Hop corridor
    AvaxHop {
        /// Upper bound on the fast fee, µUSDC
        max_fast_fee: Amount,
    },
}

impl CorridorVariant {
    /// The corridor
    pub fn corridor(&self) -> Corridor {
        match self {
            CorridorVariant::V1 => Corridor::V1,
            CorridorVariant::V2Direct { .. } => Corridor::V2Direct,
            CorridorVariant::AvaxHop { .. } => Corridor::AvaxHop,
        }
    }

    /// The embedded fast fee bound, zero for `v1`.
    pub fn max_fast_fee(&self) -> Amount {
        match self {
            CorridorVariant::V1 => Amount::zero(crate::Kind::Usdc),
            CorridorVariant::V2Direct { max_fast_fee } | CorridorVariant::AvaxHop { max_fast_fee } => {
                *max_fast_fee
            }
        }
    }
}

/// Fast fee of `burn_amount`, rounded up to µUSDC.
pub fn calc_fast_fee(burn_amount: &Amount, fast_fee_rate: &Amount) -> CctprResult<Amount> {
    burn_amount.ensure_kind(crate::Kind::Usdc)?;
    burn_amount.mul_percentage(fast_fee_rate, Rounding::Ceil)
}

/// Relay cost of a corridor in both currencies it can be paid in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelayCost {
    /// Cost when paid in USDC
    pub usdc: Amount,
    /// Cost when paid in the source's gas token
    pub gas_token: Amount,
}

/// Total cost of a corridor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorridorCost {
    /// Relay cost
    pub relay: RelayCost,
    /// Fast fee rate, `None` for `v1`
    pub fast: Option<Amount>,
}

/// Cost and speed of one corridor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorridorStats {
    /// The corridor
    pub corridor: Corridor,
    /// Its cost
    pub cost: CorridorCost,
    /// Expected time from burn to mint
    pub transfer_time: Duration,
}

/// Result of corridor enumeration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Corridors {
    /// Remaining fast-burn allowance of the protocol, µUSDC
    pub fast_burn_allowance: Amount,
    /// One entry per sensible corridor
    pub stats: Vec<CorridorStats>,
}

impl DomainRegistry {
    fn incoherent(
        corridor: Corridor,
        source: KnownDomain,
        destination: KnownDomain,
        reason: &'static str,
    ) -> CctprError {
        CctprError::CorridorDestinationIncoherent {
            corridor,
            source_domain: source,
            destination,
            reason,
        }
    }

    /// The corridors worth offering between `source` and `destination`.
    pub fn sensible_corridors(
        &self,
        source: KnownDomain,
        destination: KnownDomain,
    ) -> CctprResult<Vec<Corridor>> {
        if source == destination {
            return Err(CctprError::SameDomain(source));
        }
        let v1 = |d| self.supports(d, ProtocolVersion::V1);
        let v2 = |d| self.supports(d, ProtocolVersion::V2);

        let mut corridors = Vec::with_capacity(2);
        if v1(source) && v1(destination) {
            corridors.push(Corridor::V1);
        }
        if v2(source) && !(self.is_fast_domain(source) && v1(destination)) {
            corridors.push(if v2(destination) {
                Corridor::V2Direct
            } else {
                Corridor::AvaxHop
            });
        }
        Ok(corridors)
    }

    /// Hard precondition before composing a transfer over `corridor`.
    pub fn check_is_sensible_corridor(
        &self,
        source: KnownDomain,
        destination: KnownDomain,
        corridor: Corridor,
    ) -> CctprResult<()> {
        if source == destination {
            return Err(CctprError::SameDomain(source));
        }
        let v1 = |d| self.supports(d, ProtocolVersion::V1);
        let v2 = |d| self.supports(d, ProtocolVersion::V2);
        let fail = |reason| Err(Self::incoherent(corridor, source, destination, reason));

        match corridor {
            Corridor::V1 if !(v1(source) && v1(destination)) => {
                fail("both endpoints must support v1")
            }
            Corridor::V2Direct if !(v2(source) && v2(destination)) => {
                fail("both endpoints must support v2")
            }
            Corridor::AvaxHop if source == HOP_DOMAIN || destination == HOP_DOMAIN => {
                fail("hop corridor cannot start or end on the hop domain")
            }
            Corridor::AvaxHop if !v2(source) => fail("hop corridor requires a v2 source"),
            Corridor::AvaxHop if v2(destination) => {
                fail("destination supports v2, use v2Direct instead")
            }
            Corridor::AvaxHop if !v1(destination) => fail("hop corridor requires a v1 destination"),
            _ => Ok(()),
        }
    }

    /// Expected time from burn to mint over `corridor`.
    pub fn transfer_time(
        &self,
        source: KnownDomain,
        destination: KnownDomain,
        corridor: Corridor,
    ) -> CctprResult<Duration> {
        let attestation = |domain, version| -> CctprResult<Duration> {
            let info = self.info(domain)?;
            match version {
                ProtocolVersion::V1 => info.v1_attestation,
                ProtocolVersion::V2 => info.v2_attestation,
            }
            .ok_or_else(|| Self::incoherent(corridor, source, destination, "no attestation estimate"))
        };
        let leg = |from, to, version| -> CctprResult<Duration> {
            Ok(attestation(from, version)? + self.info(to)?.relay_overhead)
        };

        match corridor {
            Corridor::V1 => leg(source, destination, ProtocolVersion::V1),
            Corridor::V2Direct => leg(source, destination, ProtocolVersion::V2),
            Corridor::AvaxHop => Ok(leg(source, HOP_DOMAIN, ProtocolVersion::V2)?
                + leg(HOP_DOMAIN, destination, ProtocolVersion::V1)?),
        }
    }
}
