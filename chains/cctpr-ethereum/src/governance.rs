use std::fmt::Debug;
use std::io::{Read, Write};

use tracing::{info, instrument};

use cctpr_core::{
    authorize_governance, CctprError, CctprResult, ContractReader, Decode, Encode,
    FeeAdjustmentType, GovernanceAction, KnownDomain, Role, H160, U256,
};

use crate::codec::{exec_selector, read_domain, strip_selector, write_domain, ContractTx};
use crate::storage::{EthereumStorageReader, FeeAdjustmentsSlot};

/// A governance command appended to `exec768()`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EvmGovernanceCommand {
    /// `0x11`: overwrite one word of fee adjustments
    UpdateFeeAdjustments {
        /// Which adjustments
        fee_type: FeeAdjustmentType,
        /// Domains `8 * mapping_index ..` are covered
        mapping_index: u8,
        /// The new word
        adjustments: FeeAdjustmentsSlot,
    },
    /// `0x12`: send `amount` of `token` to the fee recipient, zero token for ether
    SweepTokens {
        /// Token contract
        token: H160,
        /// Atomic units
        amount: U256,
    },
    /// `0x13`
    UpdateFeeRecipient(H160),
    /// `0x14`
    UpdateFeeAdjuster(H160),
    /// `0x15`
    UpdateOffChainQuoter(H160),
    /// `0x16`
    ProposeOwnershipTransfer(H160),
    /// `0x17`
    AcceptOwnershipTransfer,
    /// `0x18`
    CancelOwnershipTransfer,
    /// `0x19`: register the oracle chain id of a domain, zero deregisters
    SetChainIdForDomain {
        /// Domain
        domain: KnownDomain,
        /// Oracle chain id
        chain_id: u16,
    },
}

impl EvmGovernanceCommand {
    /// Command tag
    pub fn command_id(&self) -> u8 {
        match self {
            Self::UpdateFeeAdjustments { .. } => 0x11,
            Self::SweepTokens { .. } => 0x12,
            Self::UpdateFeeRecipient(_) => 0x13,
            Self::UpdateFeeAdjuster(_) => 0x14,
            Self::UpdateOffChainQuoter(_) => 0x15,
            Self::ProposeOwnershipTransfer(_) => 0x16,
            Self::AcceptOwnershipTransfer => 0x17,
            Self::CancelOwnershipTransfer => 0x18,
            Self::SetChainIdForDomain { .. } => 0x19,
        }
    }

    /// The action checked against the contract's roles.
    pub fn action(&self) -> GovernanceAction {
        match self {
            Self::UpdateFeeAdjustments { .. } => GovernanceAction::UpdateFeeAdjustments,
            Self::SweepTokens { .. } => GovernanceAction::SweepTokens,
            Self::UpdateFeeRecipient(_) => GovernanceAction::UpdateRole(Role::FeeRecipient),
            Self::UpdateFeeAdjuster(_) => GovernanceAction::UpdateRole(Role::FeeAdjuster),
            Self::UpdateOffChainQuoter(_) => GovernanceAction::UpdateRole(Role::OffChainQuoter),
            Self::ProposeOwnershipTransfer(_) => GovernanceAction::ProposeOwnershipTransfer,
            Self::AcceptOwnershipTransfer => GovernanceAction::AcceptOwnershipTransfer,
            Self::CancelOwnershipTransfer => GovernanceAction::CancelOwnershipTransfer,
            Self::SetChainIdForDomain { .. } => GovernanceAction::SetChain,
        }
    }
}

impl Encode for EvmGovernanceCommand {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: Write,
    {
        let written = self.command_id().write_to(writer)?;
        Ok(written
            + match self {
                Self::UpdateFeeAdjustments {
                    fee_type,
                    mapping_index,
                    adjustments,
                } => {
                    fee_type.id().write_to(writer)?
                        + mapping_index.write_to(writer)?
                        + adjustments.write_to(writer)?
                }
                Self::SweepTokens { token, amount } => {
                    token.write_to(writer)? + amount.write_to(writer)?
                }
                Self::UpdateFeeRecipient(address)
                | Self::UpdateFeeAdjuster(address)
                | Self::UpdateOffChainQuoter(address)
                | Self::ProposeOwnershipTransfer(address) => address.write_to(writer)?,
                Self::AcceptOwnershipTransfer | Self::CancelOwnershipTransfer => 0,
                Self::SetChainIdForDomain { domain, chain_id } => {
                    write_domain(*domain, writer)? + chain_id.write_to(writer)?
                }
            })
    }
}

impl Decode for EvmGovernanceCommand {
    fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
    where
        R: Read,
        Self: Sized,
    {
        Ok(match u8::read_from(reader)? {
            0x11 => Self::UpdateFeeAdjustments {
                fee_type: FeeAdjustmentType::from_id(u8::read_from(reader)?)?,
                mapping_index: u8::read_from(reader)?,
                adjustments: FeeAdjustmentsSlot::from_word(Decode::read_from(reader)?),
            },
            0x12 => Self::SweepTokens {
                token: H160::read_from(reader)?,
                amount: U256::read_from(reader)?,
            },
            0x13 => Self::UpdateFeeRecipient(H160::read_from(reader)?),
            0x14 => Self::UpdateFeeAdjuster(H160::read_from(reader)?),
            0x15 => Self::UpdateOffChainQuoter(H160::read_from(reader)?),
            0x16 => Self::ProposeOwnershipTransfer(H160::read_from(reader)?),
            0x17 => Self::AcceptOwnershipTransfer,
            0x18 => Self::CancelOwnershipTransfer,
            0x19 => Self::SetChainIdForDomain {
                domain: read_domain(reader)?,
                chain_id: u16::read_from(reader)?,
            },
            other => {
                return Err(CctprError::decode(format!(
                    "governance command {other:#04x}"
                )))
            }
        })
    }
}

/// `exec768()` calldata running `commands` in order.
pub fn governance_calldata(commands: &[EvmGovernanceCommand]) -> Vec<u8> {
    let mut calldata = exec_selector().to_vec();
    for command in commands {
        calldata.extend(command.to_vec());
    }
    calldata
}

/// Inverse of [`governance_calldata`].
pub fn decode_governance_calldata(calldata: &[u8]) -> CctprResult<Vec<EvmGovernanceCommand>> {
    let mut body = strip_selector(calldata, exec_selector())?;
    let mut commands = vec![];
    while !body.is_empty() {
        commands.push(EvmGovernanceCommand::read_from(&mut body)?);
    }
    Ok(commands)
}

/// Composes governance transactions against a deployed relayer contract,
/// refusing commands the signer's role does not permit.
#[derive(Debug, Clone)]
pub struct EthereumGovernance<R> {
    address: H160,
    storage: EthereumStorageReader<R>,
}

impl<R> EthereumGovernance<R>
where
    R: ContractReader + Debug,
{
    /// Governance of the contract at `address`.
    pub fn new(address: H160, reader: R) -> Self {
        Self {
            address,
            storage: EthereumStorageReader::new(address, reader),
        }
    }

    /// The contract's storage.
    pub fn storage(&self) -> &EthereumStorageReader<R> {
        &self.storage
    }

    /// One transaction running every command, after checking each against the
    /// current roles.
    #[instrument(err, skip(self, commands), fields(contract = ?self.address, commands = commands.len()))]
    pub async fn compose(
        &self,
        signer: H160,
        commands: &[EvmGovernanceCommand],
    ) -> CctprResult<ContractTx> {
        let roles = self.storage.roles().await?;
        for command in commands {
            authorize_governance(&roles, signer.into(), command.action())?;
        }
        let body = commands.iter().flat_map(Encode::to_vec).collect::<Vec<_>>();
        info!(?signer, "Composed governance transaction");
        Ok(ContractTx::exec(self.address, U256::zero(), &body))
    }
}

#[cfg(test)]
mod test {
    use async_trait::async_trait;
    use hex_literal::hex;
    use mockall::mock;

    use cctpr_core::H256;

    use super::*;
    use crate::storage::{role_slot, EvmFeeAdjustment};

    impl std::fmt::Debug for MockReader {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("MockReader")
        }
    }

    mock! {
        pub Reader {}

        #[async_trait]
        impl ContractReader for Reader {
            async fn call(&self, to: H160, data: Vec<u8>) -> CctprResult<Vec<u8>>;
            async fn get_storage_at(&self, contract: H160, slot: H256) -> CctprResult<H256>;
        }
    }

    const OWNER: H160 = H160([1; 20]);
    const ADJUSTER: H160 = H160([3; 20]);

    fn reader() -> MockReader {
        let mut reader = MockReader::new();
        reader.expect_get_storage_at().returning(|_, slot| {
            let address = if slot == H256::from_low_u64_be(role_slot(Role::Owner).into()) {
                OWNER
            } else if slot == H256::from_low_u64_be(role_slot(Role::FeeAdjuster).into()) {
                ADJUSTER
            } else {
                H160::zero()
            };
            Ok(address.into())
        });
        reader
    }

    #[test]
    fn command_layout() {
        let command = EvmGovernanceCommand::SetChainIdForDomain {
            domain: KnownDomain::Sonic,
            chain_id: 52,
        };
        assert_eq!(command.to_vec(), hex!("19 0d 0034"));

        let calldata = governance_calldata(&[
            EvmGovernanceCommand::AcceptOwnershipTransfer,
            EvmGovernanceCommand::UpdateOffChainQuoter(H160::repeat_byte(0xaa)),
        ]);
        assert_eq!(calldata[4], 0x17);
        assert_eq!(calldata[5], 0x15);
        assert_eq!(calldata.len(), 4 + 1 + 21);
    }

    #[test]
    fn commands_survive_the_wire() {
        let mut adjustments = FeeAdjustmentsSlot::default();
        adjustments.0[2] = EvmFeeAdjustment {
            absolute_centi_usdc: -5,
            relative_percent: 95,
        };
        let commands = vec![
            EvmGovernanceCommand::UpdateFeeAdjustments {
                fee_type: FeeAdjustmentType::GasDropoff,
                mapping_index: 1,
                adjustments,
            },
            EvmGovernanceCommand::SweepTokens {
                token: H160::zero(),
                amount: U256::exp10(18),
            },
            EvmGovernanceCommand::CancelOwnershipTransfer,
        ];
        assert_eq!(
            decode_governance_calldata(&governance_calldata(&commands)).unwrap(),
            commands
        );
        assert!(decode_governance_calldata(&hex!("00000000 17")).is_err());
        let mut unknown = exec_selector().to_vec();
        unknown.push(0x20);
        assert!(decode_governance_calldata(&unknown).is_err());
    }

    #[tokio::test]
    async fn adjuster_may_only_adjust_fees() {
        let governance = EthereumGovernance::new(H160::repeat_byte(0xcc), reader());
        let adjust = EvmGovernanceCommand::UpdateFeeAdjustments {
            fee_type: FeeAdjustmentType::V1,
            mapping_index: 0,
            adjustments: FeeAdjustmentsSlot::default(),
        };
        let tx = governance.compose(ADJUSTER, &[adjust.clone()]).await.unwrap();
        assert_eq!(tx.value, U256::zero());
        assert_eq!(tx.data[4], 0x11);

        let err = governance
            .compose(
                ADJUSTER,
                &[adjust, EvmGovernanceCommand::UpdateFeeAdjuster(ADJUSTER)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CctprError::Unauthorized { .. }));
        assert!(governance
            .compose(OWNER, &[EvmGovernanceCommand::UpdateFeeAdjuster(ADJUSTER)])
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn nothing_to_accept_without_pending_owner() {
        let governance = EthereumGovernance::new(H160::repeat_byte(0xcc), reader());
        let err = governance
            .compose(OWNER, &[EvmGovernanceCommand::CancelOwnershipTransfer])
            .await
            .unwrap_err();
        assert!(matches!(err, CctprError::Unauthorized { .. }));
    }
}
