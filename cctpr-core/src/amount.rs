//! Fixed-point amounts tagged by the currency or unit of work they count.
//!
//! Arithmetic only combines amounts of the same [`Kind`]. Crossing kinds
//! requires a [`Conversion`] and every place that can lose precision takes an
//! explicit [`Rounding`].

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{CctprError, CctprResult, KnownDomain, U256};

/// What an [`Amount`] counts.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// USDC, atomic unit µUSDC
    Usdc,
    /// The native gas token of a specific domain
    NativeGasToken(KnownDomain),
    /// A gas token amount that is not bound to a domain yet, atomic unit
    /// µGasToken. Converted into the destination's token on chain.
    GenericGasToken,
    /// A dimensionless ratio, atomic unit 10⁻⁶ (1 % = 10 000)
    Percentage,
    /// EVM gas
    Gas,
    /// Transaction or storage bytes
    Byte,
    /// Compute units of object-model chains
    ComputeUnit,
}

impl Kind {
    /// Number of decimals between the atomic and the human unit.
    pub const fn decimals(self) -> u32 {
        match self {
            Kind::Usdc | Kind::GenericGasToken | Kind::Percentage => 6,
            Kind::NativeGasToken(domain) => domain.platform().gas_token_decimals(),
            Kind::Gas | Kind::Byte | Kind::ComputeUnit => 0,
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Usdc => write!(f, "USDC"),
            Kind::NativeGasToken(domain) => write!(f, "GasToken<{domain}>"),
            Kind::GenericGasToken => write!(f, "GasToken"),
            Kind::Percentage => write!(f, "%"),
            Kind::Gas => write!(f, "gas"),
            Kind::Byte => write!(f, "bytes"),
            Kind::ComputeUnit => write!(f, "CU"),
        }
    }
}

/// Direction in which a lossy operation rounds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Rounding {
    /// Towards zero
    Floor,
    /// Away from zero
    Ceil,
}

/// Named units an amount can be expressed in.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Unit {
    /// The kind's smallest unit
    Atomic,
    /// 10⁰ of the human unit
    Human,
    /// 10⁻³ of the human unit
    Milli,
    /// 10⁻⁶ of the human unit
    Micro,
    /// 10⁻⁹ of the human unit (gwei for EVM gas tokens)
    Nano,
    /// 10⁻¹² of the human unit (Mwei for EVM gas tokens)
    Pico,
    /// 10⁻² of a ratio
    Percent,
    /// 10⁻⁴ of a ratio
    BasisPoints,
}

impl Unit {
    /// How many of this unit make up one human unit, as a power of ten.
    const fn exponent(self, kind: Kind) -> u32 {
        match self {
            Unit::Atomic => kind.decimals(),
            Unit::Human => 0,
            Unit::Milli => 3,
            Unit::Micro => 6,
            Unit::Nano => 9,
            Unit::Pico => 12,
            Unit::Percent => 2,
            Unit::BasisPoints => 4,
        }
    }
}

fn pow10(exp: u32) -> U256 {
    U256::exp10(exp as usize)
}

/// `value * numerator / denominator` with explicit rounding.
pub fn mul_div(
    value: U256,
    numerator: U256,
    denominator: U256,
    rounding: Rounding,
) -> CctprResult<U256> {
    if denominator.is_zero() {
        return Err(CctprError::decode("division by zero"));
    }
    let product = value.checked_mul(numerator).ok_or_else(|| CctprError::Overflow {
        field: "amount",
        value: format!("{value} * {numerator}"),
    })?;
    let (quotient, remainder) = product.div_mod(denominator);
    Ok(match rounding {
        Rounding::Ceil if !remainder.is_zero() => quotient + 1,
        _ => quotient,
    })
}

/// An immutable fixed-point amount of a given [`Kind`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Amount {
    kind: Kind,
    atomic: U256,
}

impl Amount {
    /// An amount from its atomic count
    pub fn new(kind: Kind, atomic: impl Into<U256>) -> Self {
        Self {
            kind,
            atomic: atomic.into(),
        }
    }

    /// Zero of the given kind
    pub fn zero(kind: Kind) -> Self {
        Self::new(kind, U256::zero())
    }

    /// µUSDC
    pub fn usdc(micro_usdc: u64) -> Self {
        Self::new(Kind::Usdc, micro_usdc)
    }

    /// A ratio given in basis points
    pub fn bps(bps: u64) -> Self {
        Self::new(Kind::Percentage, U256::from(bps) * 100)
    }

    /// A ratio given in whole percent
    pub fn percent(percent: u64) -> Self {
        Self::new(Kind::Percentage, U256::from(percent) * 10_000)
    }

    /// µGasToken, not bound to a domain
    pub fn generic_gas_token(micro: u64) -> Self {
        Self::new(Kind::GenericGasToken, micro)
    }

    /// An amount expressed in `unit`, floored to atomic precision.
    pub fn from_unit(kind: Kind, value: impl Into<U256>, unit: Unit) -> CctprResult<Self> {
        let (exp, decimals) = (unit.exponent(kind), kind.decimals());
        let value = value.into();
        let atomic = if decimals >= exp {
            value
                .checked_mul(pow10(decimals - exp))
                .ok_or_else(|| CctprError::Overflow {
                    field: "amount",
                    value: value.to_string(),
                })?
        } else {
            value / pow10(exp - decimals)
        };
        Ok(Self::new(kind, atomic))
    }

    /// The kind this amount counts
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Atomic count
    pub fn atomic(&self) -> U256 {
        self.atomic
    }

    /// Whether the amount is zero
    pub fn is_zero(&self) -> bool {
        self.atomic.is_zero()
    }

    /// Expresses the amount in `unit`.
    pub fn to_unit(&self, unit: Unit, rounding: Rounding) -> U256 {
        let (exp, decimals) = (unit.exponent(self.kind), self.kind.decimals());
        if exp >= decimals {
            self.atomic.saturating_mul(pow10(exp - decimals))
        } else {
            let (quotient, remainder) = self.atomic.div_mod(pow10(decimals - exp));
            match rounding {
                Rounding::Ceil if !remainder.is_zero() => quotient + 1,
                _ => quotient,
            }
        }
    }

    /// Atomic count as a u64, for the 8 byte wire fields.
    pub fn to_u64(&self) -> CctprResult<u64> {
        u64::try_from(self.atomic).map_err(|_| CctprError::Overflow {
            field: "u64 amount",
            value: self.to_string(),
        })
    }

    /// Same-kind precondition
    pub fn ensure_kind(&self, expected: Kind) -> CctprResult<()> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(CctprError::KindMismatch {
                expected,
                actual: self.kind,
            })
        }
    }

    /// `self + other`
    pub fn checked_add(&self, other: &Amount) -> CctprResult<Amount> {
        other.ensure_kind(self.kind)?;
        let atomic = self
            .atomic
            .checked_add(other.atomic)
            .ok_or_else(|| CctprError::Overflow {
                field: "amount",
                value: format!("{self} + {other}"),
            })?;
        Ok(Self::new(self.kind, atomic))
    }

    /// `self - other`; going below zero is [`CctprError::InsufficientAmount`]
    pub fn checked_sub(&self, other: &Amount) -> CctprResult<Amount> {
        other.ensure_kind(self.kind)?;
        let atomic = self
            .atomic
            .checked_sub(other.atomic)
            .ok_or_else(|| CctprError::InsufficientAmount(format!("{self} < {other}")))?;
        Ok(Self::new(self.kind, atomic))
    }

    /// `self - other`, clamped at zero
    pub fn saturating_sub(&self, other: &Amount) -> CctprResult<Amount> {
        other.ensure_kind(self.kind)?;
        Ok(Self::new(self.kind, self.atomic.saturating_sub(other.atomic)))
    }

    /// Multiplies by a dimensionless scalar.
    pub fn checked_mul(&self, scalar: u64) -> CctprResult<Amount> {
        self.scale(scalar.into(), U256::one(), Rounding::Floor)
    }

    /// Divides by a dimensionless scalar.
    pub fn checked_div(&self, scalar: u64, rounding: Rounding) -> CctprResult<Amount> {
        self.scale(U256::one(), scalar.into(), rounding)
    }

    /// `self * numerator / denominator`, keeping the kind.
    pub fn scale(
        &self,
        numerator: U256,
        denominator: U256,
        rounding: Rounding,
    ) -> CctprResult<Amount> {
        Ok(Self::new(
            self.kind,
            mul_div(self.atomic, numerator, denominator, rounding)?,
        ))
    }

    /// `self * percentage`
    pub fn mul_percentage(&self, percentage: &Amount, rounding: Rounding) -> CctprResult<Amount> {
        percentage.ensure_kind(Kind::Percentage)?;
        self.scale(percentage.atomic, percentage_scale(), rounding)
    }

    /// `self / (1 - percentage)`, the amount that is left with `self` after
    /// `percentage` of it has been deducted.
    pub fn div_complement(&self, percentage: &Amount, rounding: Rounding) -> CctprResult<Amount> {
        percentage.ensure_kind(Kind::Percentage)?;
        let complement = percentage_scale()
            .checked_sub(percentage.atomic)
            .filter(|c| !c.is_zero())
            .ok_or_else(|| CctprError::Overflow {
                field: "percentage complement",
                value: percentage.to_string(),
            })?;
        self.scale(percentage_scale(), complement, rounding)
    }

    /// Converts into the conversion's target kind.
    pub fn convert(&self, conversion: &Conversion, rounding: Rounding) -> CctprResult<Amount> {
        conversion.apply(self, rounding)
    }

    /// Compares two amounts of the same kind.
    pub fn checked_cmp(&self, other: &Amount) -> CctprResult<Ordering> {
        other.ensure_kind(self.kind)?;
        Ok(self.atomic.cmp(&other.atomic))
    }
}

fn percentage_scale() -> U256 {
    pow10(Kind::Percentage.decimals())
}

impl PartialOrd for Amount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        (self.kind == other.kind).then(|| self.atomic.cmp(&other.atomic))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // ratios read in percent, not as a fraction of one
        let decimals = match self.kind {
            Kind::Percentage => self.kind.decimals() - Unit::Percent.exponent(self.kind),
            kind => kind.decimals(),
        };
        let (int, frac) = self.atomic.div_mod(pow10(decimals));
        if decimals == 0 || frac.is_zero() {
            return write!(f, "{int} {}", self.kind);
        }
        let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
        write!(f, "{int}.{} {}", frac.trim_end_matches('0'), self.kind)
    }
}

/// A price: `to_atomic = from_atomic * numerator / denominator`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    from: Kind,
    to: Kind,
    numerator: U256,
    denominator: U256,
}

impl Conversion {
    /// `price` of the target kind buys `per` of the source kind, e.g. 2500
    /// USDC per 1 ETH.
    pub fn new(price: Amount, per: Amount) -> CctprResult<Self> {
        Self::from_atomic_ratio(per.kind, price.kind, price.atomic, per.atomic)
    }

    /// A conversion from raw atomic ratio parts.
    pub fn from_atomic_ratio(
        from: Kind,
        to: Kind,
        numerator: U256,
        denominator: U256,
    ) -> CctprResult<Self> {
        if denominator.is_zero() {
            return Err(CctprError::decode(format!(
                "conversion {from} -> {to} has a zero denominator"
            )));
        }
        Ok(Self {
            from,
            to,
            numerator,
            denominator,
        })
    }

    /// Source kind
    pub fn from_kind(&self) -> Kind {
        self.from
    }

    /// Target kind
    pub fn to_kind(&self) -> Kind {
        self.to
    }

    /// Converts `amount` which must be of the source kind.
    pub fn apply(&self, amount: &Amount, rounding: Rounding) -> CctprResult<Amount> {
        amount.ensure_kind(self.from)?;
        Ok(Amount::new(
            self.to,
            mul_div(amount.atomic, self.numerator, self.denominator, rounding)?,
        ))
    }

    /// `self` followed by `next`, computed exactly.
    pub fn then(&self, next: &Conversion) -> CctprResult<Conversion> {
        if next.from != self.to {
            return Err(CctprError::KindMismatch {
                expected: self.to,
                actual: next.from,
            });
        }
        let overflow = || CctprError::Overflow {
            field: "conversion",
            value: format!("{} -> {} -> {}", self.from, self.to, next.to),
        };
        Self::from_atomic_ratio(
            self.from,
            next.to,
            self.numerator
                .checked_mul(next.numerator)
                .ok_or_else(overflow)?,
            self.denominator
                .checked_mul(next.denominator)
                .ok_or_else(overflow)?,
        )
    }

    /// The conversion in the opposite direction.
    pub fn inverse(&self) -> CctprResult<Conversion> {
        Self::from_atomic_ratio(self.to, self.from, self.denominator, self.numerator)
    }
}
