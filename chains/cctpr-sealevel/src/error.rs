use cctpr_core::CctprError;
use solana_program::program_error::ProgramError;

/// Errors of the relayer program's client side, numbered like the program's
/// custom errors.
#[derive(Copy, Clone, Debug, Eq, thiserror::Error, num_derive::FromPrimitive, PartialEq)]
#[repr(u32)]
pub enum Error {
    /// Signer holds no role permitting the instruction
    #[error("Not authorized")]
    NotAuthorized = 1,
    /// The fee recipient may not be the zero address
    #[error("Invalid fee recipient")]
    InvalidFeeRecipient = 2,
    /// Arguments of a transfer cannot be encoded
    #[error("Invalid transfer arguments")]
    InvalidTransferArgs = 3,
    /// A value does not fit its Borsh field
    #[error("Value overflows its field")]
    ValueOverflow = 4,
    /// Domain is unknown to the program
    #[error("Unsupported domain")]
    UnsupportedDomain = 5,
}

impl From<Error> for ProgramError {
    fn from(err: Error) -> Self {
        ProgramError::Custom(err as u32)
    }
}

/// Maps the failure of an instruction builder into the engine's error. None
/// of these is retryable.
pub fn program_error(err: ProgramError) -> CctprError {
    use num_traits::FromPrimitive;

    match err {
        ProgramError::Custom(code) => match Error::from_u32(code) {
            Some(Error::ValueOverflow) => CctprError::Overflow {
                field: "instruction field",
                value: format!("custom error {code}"),
            },
            Some(known) => CctprError::decode(known.to_string()),
            None => CctprError::decode(err.to_string()),
        },
        other => CctprError::decode(other.to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn custom_codes_round_trip() {
        let err: ProgramError = Error::InvalidFeeRecipient.into();
        assert_eq!(err, ProgramError::Custom(2));
        assert!(matches!(
            program_error(Error::ValueOverflow.into()),
            CctprError::Overflow { .. }
        ));
        let err = program_error(ProgramError::InvalidSeeds);
        assert!(matches!(err, CctprError::Decode(_)));
        assert!(!err.is_retryable());
    }
}
