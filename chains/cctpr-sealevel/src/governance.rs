use std::sync::Arc;

use solana_program::{instruction::Instruction as SolanaInstruction, pubkey::Pubkey};
use tracing::{info, instrument};

use cctpr_core::{
    authorize_governance, AccountReader, CctprError, CctprResult, FeeAdjustment,
    FeeAdjustmentType, GovernanceAction, KnownDomain, Role, H160,
};

use crate::{
    deregister_chain_instruction, owner_transfer_instruction, program_error,
    register_chain_instruction, to_universal, update_fee_adjustment_instruction,
    update_role_instruction, FeeAdjustmentEntry, OwnerTransfer, RegisterChainArgs, RoleUpdate,
    SealevelClient, UpdateFeeAdjustmentArgs,
};

/// A governance command against the relayer program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SealevelGovernanceCommand {
    /// Overwrite one fee adjustment of a registered chain
    UpdateFeeAdjustment {
        /// The chain
        domain: KnownDomain,
        /// Which adjustment
        fee_type: FeeAdjustmentType,
        /// The new value
        adjustment: FeeAdjustment,
    },
    /// Reassign the fee recipient
    UpdateFeeRecipient(Pubkey),
    /// Reassign the fee adjuster
    UpdateFeeAdjuster(Pubkey),
    /// Reassign the off-chain quoter
    UpdateOffChainQuoter(H160),
    /// Propose a new owner
    ProposeOwnershipTransfer(Pubkey),
    /// Accept a pending ownership transfer
    AcceptOwnershipTransfer,
    /// Withdraw a pending ownership transfer
    CancelOwnershipTransfer,
    /// Register a chain with its oracle chain id
    RegisterChain(KnownDomain),
    /// Deregister a chain
    DeregisterChain(KnownDomain),
}

impl SealevelGovernanceCommand {
    /// The action checked against the program's roles.
    pub fn action(&self) -> GovernanceAction {
        match self {
            Self::UpdateFeeAdjustment { .. } => GovernanceAction::UpdateFeeAdjustments,
            Self::UpdateFeeRecipient(_) => GovernanceAction::UpdateRole(Role::FeeRecipient),
            Self::UpdateFeeAdjuster(_) => GovernanceAction::UpdateRole(Role::FeeAdjuster),
            Self::UpdateOffChainQuoter(_) => GovernanceAction::UpdateRole(Role::OffChainQuoter),
            Self::ProposeOwnershipTransfer(_) => GovernanceAction::ProposeOwnershipTransfer,
            Self::AcceptOwnershipTransfer => GovernanceAction::AcceptOwnershipTransfer,
            Self::CancelOwnershipTransfer => GovernanceAction::CancelOwnershipTransfer,
            Self::RegisterChain(_) | Self::DeregisterChain(_) => GovernanceAction::SetChain,
        }
    }
}

/// Composes governance instructions against a deployed relayer program,
/// refusing commands the signer's role does not permit.
#[derive(Debug)]
pub struct SealevelGovernance<R> {
    client: Arc<SealevelClient<R>>,
}

impl<R> SealevelGovernance<R>
where
    R: AccountReader,
{
    /// Governance on top of `client`.
    pub fn new(client: Arc<SealevelClient<R>>) -> Self {
        Self { client }
    }

    /// The instruction of one command signed by `signer`, without checking
    /// roles.
    pub fn instruction(
        &self,
        signer: Pubkey,
        command: &SealevelGovernanceCommand,
    ) -> CctprResult<SolanaInstruction> {
        let addresses = self.client.addresses();
        let program_id = addresses.cctpr();
        let config = addresses.config();
        match command {
            SealevelGovernanceCommand::UpdateFeeAdjustment {
                domain,
                fee_type,
                adjustment,
            } => update_fee_adjustment_instruction(
                program_id,
                signer,
                config,
                addresses.domain(*domain)?.chain_config,
                &UpdateFeeAdjustmentArgs {
                    adjustment_type: fee_type.id(),
                    fee_adjustment: FeeAdjustmentEntry::try_from(adjustment)?,
                },
            ),
            SealevelGovernanceCommand::UpdateFeeRecipient(recipient) => update_role_instruction(
                program_id,
                signer,
                config,
                RoleUpdate::FeeRecipient(*recipient),
            ),
            SealevelGovernanceCommand::UpdateFeeAdjuster(adjuster) => update_role_instruction(
                program_id,
                signer,
                config,
                RoleUpdate::FeeAdjuster(*adjuster),
            ),
            SealevelGovernanceCommand::UpdateOffChainQuoter(quoter) => update_role_instruction(
                program_id,
                signer,
                config,
                RoleUpdate::OffChainQuoter(quoter.0),
            ),
            SealevelGovernanceCommand::ProposeOwnershipTransfer(new_owner) => {
                owner_transfer_instruction(
                    program_id,
                    signer,
                    config,
                    OwnerTransfer::Propose(*new_owner),
                )
            }
            SealevelGovernanceCommand::AcceptOwnershipTransfer => {
                owner_transfer_instruction(program_id, signer, config, OwnerTransfer::Accept)
            }
            SealevelGovernanceCommand::CancelOwnershipTransfer => {
                owner_transfer_instruction(program_id, signer, config, OwnerTransfer::Cancel)
            }
            SealevelGovernanceCommand::RegisterChain(domain) => {
                let chain_id = domain
                    .oracle_chain_id(addresses.network())
                    .ok_or(CctprError::NoDeployment(*domain))?;
                register_chain_instruction(
                    program_id,
                    signer,
                    config,
                    addresses.domain(*domain)?.chain_config,
                    &RegisterChainArgs {
                        domain_id: domain.id(),
                        chain_id,
                    },
                )
            }
            SealevelGovernanceCommand::DeregisterChain(domain) => deregister_chain_instruction(
                program_id,
                signer,
                config,
                addresses.domain(*domain)?.chain_config,
            ),
        }
        .map_err(program_error)
    }

    /// One instruction per command, after checking each against freshly read
    /// roles.
    #[instrument(err, skip(self, commands), fields(commands = commands.len()))]
    pub async fn compose(
        &self,
        signer: Pubkey,
        commands: &[SealevelGovernanceCommand],
    ) -> CctprResult<Vec<SolanaInstruction>> {
        self.client.invalidate_config();
        let roles = self.client.roles().await?;
        for command in commands {
            authorize_governance(&roles, to_universal(&signer), command.action())?;
        }
        let instructions = commands
            .iter()
            .map(|command| self.instruction(signer, command))
            .collect::<CctprResult<Vec<_>>>()?;
        info!(%signer, "Composed governance instructions");
        Ok(instructions)
    }
}
