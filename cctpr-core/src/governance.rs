use serde::{Deserialize, Serialize};

use crate::{CctprError, CctprResult, H160, H256};

/// Privileged roles of a deployment.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Role {
    /// Receives the collected fees
    FeeRecipient,
    /// Signs off-chain quotes
    OffChainQuoter,
    /// Full control
    Owner,
    /// Owner-elect of a pending ownership transfer
    PendingOwner,
    /// May tune fee adjustments
    FeeAdjuster,
}

/// The role assignments read from chain. Addresses are universal so both
/// platforms share one representation; the quoter is always an ethereum key.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GovernanceRoles {
    /// Current owner
    pub owner: H256,
    /// Owner-elect, if a transfer is pending
    pub pending_owner: Option<H256>,
    /// Fee adjuster
    pub fee_adjuster: H256,
    /// Fee recipient
    pub fee_recipient: H256,
    /// Off-chain quoter
    pub off_chain_quoter: H160,
}

/// What a governance command does, independent of its encoding.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum GovernanceAction {
    /// Rewrite fee adjustments
    UpdateFeeAdjustments,
    /// Reassign a role other than the owner
    UpdateRole(Role),
    /// Start a two-phase ownership transfer
    ProposeOwnershipTransfer,
    /// Complete a pending ownership transfer
    AcceptOwnershipTransfer,
    /// Abort a pending ownership transfer
    CancelOwnershipTransfer,
    /// Register or deregister a chain
    SetChain,
    /// Move stray tokens out of the program
    SweepTokens,
}

impl GovernanceAction {
    fn describe(&self) -> &'static str {
        match self {
            GovernanceAction::UpdateFeeAdjustments => "update fee adjustments",
            GovernanceAction::UpdateRole(_) => "update a role",
            GovernanceAction::ProposeOwnershipTransfer => "propose an ownership transfer",
            GovernanceAction::AcceptOwnershipTransfer => "accept the ownership transfer",
            GovernanceAction::CancelOwnershipTransfer => "cancel the ownership transfer",
            GovernanceAction::SetChain => "register or deregister a chain",
            GovernanceAction::SweepTokens => "sweep tokens",
        }
    }
}

/// Checks that `signer` may perform `action` under `roles`.
pub fn authorize_governance(
    roles: &GovernanceRoles,
    signer: H256,
    action: GovernanceAction,
) -> CctprResult<()> {
    let allowed = match action {
        GovernanceAction::UpdateFeeAdjustments => {
            signer == roles.owner || signer == roles.fee_adjuster
        }
        GovernanceAction::AcceptOwnershipTransfer => roles.pending_owner == Some(signer),
        GovernanceAction::CancelOwnershipTransfer => {
            roles.pending_owner.is_some() && signer == roles.owner
        }
        _ => signer == roles.owner,
    };
    if allowed {
        Ok(())
    } else {
        Err(CctprError::Unauthorized {
            signer: format!("{signer:?}"),
            action: action.describe(),
        })
    }
}
