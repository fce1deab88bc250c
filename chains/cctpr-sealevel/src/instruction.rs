//! Instructions of the relayer program.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction as SolanaInstruction},
    program_error::ProgramError,
    pubkey::Pubkey,
};

use cctpr_core::{CctprError, CctprResult};

use crate::{
    accounts::{anchor_discriminator, FeeAdjustmentEntry, DISCRIMINATOR_LENGTH},
    Error,
};

/// Anchor discriminator of an instruction.
pub fn instruction_discriminator(name: &str) -> [u8; DISCRIMINATOR_LENGTH] {
    anchor_discriminator("global", name)
}

fn instruction_data<T>(name: &str, args: &T) -> Result<Vec<u8>, ProgramError>
where
    T: BorshSerialize,
{
    let mut data = instruction_discriminator(name).to_vec();
    data.extend(borsh::to_vec(args)?);
    Ok(data)
}

/// The corridor and its fast fee bound.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorridorArgs {
    /// Legacy burn.
    V1,
    /// Fast burn straight to the destination.
    V2Direct {
        /// Most µUSDC the fast burn may cost.
        max_fast_fee_usdc: u64,
    },
    /// Fast burn to Avalanche, legacy burn onwards.
    AvaxHop {
        /// Most µUSDC the fast burn may cost.
        max_fast_fee_usdc: u64,
    },
}

/// Fee committed by an off-chain quote.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffChainRelayFee {
    /// µUSDC
    Usdc(u64),
    /// Lamports
    Sol(u64),
}

/// How the relay fee is determined.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub enum QuoteArgs {
    /// Signed by the off-chain quoter.
    OffChain {
        /// Unix seconds.
        expiration_time: u32,
        /// The committed fee.
        relay_fee: OffChainRelayFee,
        /// `r ‖ s ‖ v` over the canonical quote.
        quoter_signature: [u8; 65],
    },
    /// Computed by the program, paid in USDC.
    OnChainUsdc {
        /// Bound in µUSDC.
        max_relay_fee_usdc: u64,
        /// Whether the fee comes out of `input_amount`.
        take_fee_from_input: bool,
    },
    /// Computed by the program, paid in lamports.
    OnChainGas {
        /// Bound in lamports.
        max_relay_fee_sol: u64,
    },
}

/// Terms of a transfer the relayer submits for the user.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaslessArgs {
    /// µUSDC the relayer charges on top.
    pub gasless_fee_usdc: u64,
    /// Unix seconds after which the relayer may no longer submit.
    pub expiration_time: u32,
}

/// Arguments of `transfer_with_relay`.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, PartialEq, Eq)]
pub struct TransferWithRelayArgs {
    /// µUSDC debited from the user besides a gasless fee.
    pub input_amount: u64,
    /// Recipient on the destination.
    pub mint_recipient: [u8; 32],
    /// µGasToken.
    pub gas_dropoff_micro_gas_token: u32,
    /// Corridor.
    pub corridor: CorridorArgs,
    /// Relay fee terms.
    pub quote: QuoteArgs,
    /// Present for gasless transfers.
    pub gasless: Option<GaslessArgs>,
    /// Seed of the bridge message account.
    pub event_data_seed: [u8; 4],
    /// Bump of the bridge message account.
    pub event_data_bump: u8,
}

impl TransferWithRelayArgs {
    /// Decodes the data of a `transfer_with_relay` instruction, discriminator
    /// included.
    pub fn from_instruction_data(data: &[u8]) -> CctprResult<Self> {
        let discriminator = instruction_discriminator("transfer_with_relay");
        let mut body = data
            .strip_prefix(discriminator.as_slice())
            .ok_or_else(|| CctprError::decode("not a transfer_with_relay instruction"))?;
        let args = Self::deserialize(&mut body).map_err(|err| CctprError::decode(err.to_string()))?;
        if !body.is_empty() {
            return Err(CctprError::decode(format!(
                "{} trailing bytes after transfer_with_relay arguments",
                body.len()
            )));
        }
        Ok(args)
    }
}

/// The accounts of `transfer_with_relay`, in instruction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferWithRelayAccounts {
    /// Pays for the transaction and the message account.
    pub relayer: Pubkey,
    /// Owner of the USDC.
    pub user: Pubkey,
    /// Relayer config.
    pub config: Pubkey,
    /// Chain config of the destination.
    pub chain_config: Pubkey,
    /// Receives the rent of the message account.
    pub rent_custodian: Pubkey,
    /// Fee recipient.
    pub fee_recipient: Pubkey,
    /// USDC account of the fee recipient.
    pub fee_recipient_usdc: Pubkey,
    /// USDC account of the user.
    pub user_usdc: Pubkey,
    /// Oracle config.
    pub oracle_config: Pubkey,
    /// Prices of the destination.
    pub destination_prices: Pubkey,
    /// Prices of Avalanche, only read by hops.
    pub avalanche_prices: Option<Pubkey>,
    /// Bridge message account.
    pub event_data: Pubkey,
    /// USDC mint.
    pub usdc_mint: Pubkey,
    /// Denylist entry of the user, `v2` only.
    pub denylist: Option<Pubkey>,
    /// Token messenger sender authority.
    pub sender_authority: Pubkey,
    /// Message transmitter config.
    pub message_transmitter_config: Pubkey,
    /// Token messenger config.
    pub token_messenger_config: Pubkey,
    /// Remote token messenger.
    pub remote_token_messenger: Pubkey,
    /// Token minter.
    pub token_minter: Pubkey,
    /// Local token.
    pub local_token: Pubkey,
    /// Token messenger program.
    pub token_messenger: Pubkey,
    /// Message transmitter program.
    pub message_transmitter: Pubkey,
    /// Event authority of the token messenger.
    pub cctp_event_authority: Pubkey,
    /// Event authority of the relayer program.
    pub event_authority: Pubkey,
}

/// Gets a `transfer_with_relay` instruction. Absent optional accounts are
/// passed as the program id, the way Anchor encodes `None`.
pub fn transfer_with_relay_instruction(
    program_id: Pubkey,
    accounts: &TransferWithRelayAccounts,
    args: &TransferWithRelayArgs,
) -> Result<SolanaInstruction, ProgramError> {
    // Accounts:
    // 0. [writeable, signer] The relayer.
    // 1. [signer] The user.
    // 2. [] Config.
    // 3. [] Chain config.
    // 4. [writeable] Rent custodian.
    // 5. [writeable] Fee recipient.
    // 6. [writeable] Fee recipient USDC.
    // 7. [writeable] User USDC.
    // 8. [] Oracle config.
    // 9. [] Destination prices.
    // 10. [] Avalanche prices.
    // 11. [writeable] Event data.
    // 12. [writeable] USDC mint.
    // 13. [] Denylist.
    // 14. [] Sender authority.
    // 15. [writeable] Message transmitter config.
    // 16. [] Token messenger config.
    // 17. [] Remote token messenger.
    // 18. [] Token minter.
    // 19. [writeable] Local token.
    // 20. [executable] Token messenger.
    // 21. [executable] Message transmitter.
    // 22. [] Token messenger event authority.
    // 23. [executable] Token program.
    // 24. [executable] System program.
    // 25. [] Event authority.
    // 26. [executable] This program.
    let accounts = vec![
        AccountMeta::new(accounts.relayer, true),
        AccountMeta::new_readonly(accounts.user, true),
        AccountMeta::new_readonly(accounts.config, false),
        AccountMeta::new_readonly(accounts.chain_config, false),
        AccountMeta::new(accounts.rent_custodian, false),
        AccountMeta::new(accounts.fee_recipient, false),
        AccountMeta::new(accounts.fee_recipient_usdc, false),
        AccountMeta::new(accounts.user_usdc, false),
        AccountMeta::new_readonly(accounts.oracle_config, false),
        AccountMeta::new_readonly(accounts.destination_prices, false),
        AccountMeta::new_readonly(accounts.avalanche_prices.unwrap_or(program_id), false),
        AccountMeta::new(accounts.event_data, false),
        AccountMeta::new(accounts.usdc_mint, false),
        AccountMeta::new_readonly(accounts.denylist.unwrap_or(program_id), false),
        AccountMeta::new_readonly(accounts.sender_authority, false),
        AccountMeta::new(accounts.message_transmitter_config, false),
        AccountMeta::new_readonly(accounts.token_messenger_config, false),
        AccountMeta::new_readonly(accounts.remote_token_messenger, false),
        AccountMeta::new_readonly(accounts.token_minter, false),
        AccountMeta::new(accounts.local_token, false),
        AccountMeta::new_readonly(accounts.token_messenger, false),
        AccountMeta::new_readonly(accounts.message_transmitter, false),
        AccountMeta::new_readonly(accounts.cctp_event_authority, false),
        AccountMeta::new_readonly(crate::TOKEN_PROGRAM_ID, false),
        AccountMeta::new_readonly(solana_program::system_program::id(), false),
        AccountMeta::new_readonly(accounts.event_authority, false),
        AccountMeta::new_readonly(program_id, false),
    ];

    Ok(SolanaInstruction {
        program_id,
        data: instruction_data("transfer_with_relay", args)?,
        accounts,
    })
}

/// Arguments of `update_fee_adjustment`.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateFeeAdjustmentArgs {
    /// Fee adjustment type id.
    pub adjustment_type: u8,
    /// The new adjustment.
    pub fee_adjustment: FeeAdjustmentEntry,
}

/// Arguments of `register_chain`.
#[derive(BorshDeserialize, BorshSerialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterChainArgs {
    /// Bridge domain id.
    pub domain_id: u8,
    /// Oracle chain id.
    pub chain_id: u16,
}

/// Gets an instruction to update one fee adjustment of a chain. Signed by
/// the owner or the fee adjuster.
pub fn update_fee_adjustment_instruction(
    program_id: Pubkey,
    signer: Pubkey,
    config: Pubkey,
    chain_config: Pubkey,
    args: &UpdateFeeAdjustmentArgs,
) -> Result<SolanaInstruction, ProgramError> {
    // Accounts:
    // 0. [signer] The owner or fee adjuster.
    // 1. [] Config.
    // 2. [writeable] Chain config.
    let accounts = vec![
        AccountMeta::new_readonly(signer, true),
        AccountMeta::new_readonly(config, false),
        AccountMeta::new(chain_config, false),
    ];

    Ok(SolanaInstruction {
        program_id,
        data: instruction_data("update_fee_adjustment", args)?,
        accounts,
    })
}

/// Gets an instruction to register a destination chain.
pub fn register_chain_instruction(
    program_id: Pubkey,
    owner: Pubkey,
    config: Pubkey,
    chain_config: Pubkey,
    args: &RegisterChainArgs,
) -> Result<SolanaInstruction, ProgramError> {
    // Accounts:
    // 0. [writeable, signer] The owner, paying for the chain config.
    // 1. [] Config.
    // 2. [writeable] Chain config.
    // 3. [executable] System program.
    let accounts = vec![
        AccountMeta::new(owner, true),
        AccountMeta::new_readonly(config, false),
        AccountMeta::new(chain_config, false),
        AccountMeta::new_readonly(solana_program::system_program::id(), false),
    ];

    Ok(SolanaInstruction {
        program_id,
        data: instruction_data("register_chain", args)?,
        accounts,
    })
}

/// Gets an instruction to deregister a destination chain, refunding the
/// owner.
pub fn deregister_chain_instruction(
    program_id: Pubkey,
    owner: Pubkey,
    config: Pubkey,
    chain_config: Pubkey,
) -> Result<SolanaInstruction, ProgramError> {
    // Accounts:
    // 0. [writeable, signer] The owner.
    // 1. [] Config.
    // 2. [writeable] Chain config.
    // 3. [executable] System program.
    let accounts = vec![
        AccountMeta::new(owner, true),
        AccountMeta::new_readonly(config, false),
        AccountMeta::new(chain_config, false),
        AccountMeta::new_readonly(solana_program::system_program::id(), false),
    ];

    Ok(SolanaInstruction {
        program_id,
        data: instruction_discriminator("deregister_chain").to_vec(),
        accounts,
    })
}

/// A role the owner may reassign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleUpdate {
    /// Receives the fees
    FeeRecipient(Pubkey),
    /// May adjust fees
    FeeAdjuster(Pubkey),
    /// Ethereum address signing off-chain quotes
    OffChainQuoter([u8; 20]),
}

/// Gets an instruction reassigning a role. A zero fee recipient is refused.
pub fn update_role_instruction(
    program_id: Pubkey,
    owner: Pubkey,
    config: Pubkey,
    update: RoleUpdate,
) -> Result<SolanaInstruction, ProgramError> {
    let data = match update {
        RoleUpdate::FeeRecipient(recipient) => {
            if recipient == Pubkey::default() {
                return Err(Error::InvalidFeeRecipient.into());
            }
            instruction_data("update_fee_recipient", &recipient)?
        }
        RoleUpdate::FeeAdjuster(adjuster) => instruction_data("update_fee_adjuster", &adjuster)?,
        RoleUpdate::OffChainQuoter(quoter) => instruction_data("update_offchain_quoter", &quoter)?,
    };

    // Accounts:
    // 0. [signer] The owner.
    // 1. [writeable] Config.
    let accounts = vec![
        AccountMeta::new_readonly(owner, true),
        AccountMeta::new(config, false),
    ];

    Ok(SolanaInstruction {
        program_id,
        data,
        accounts,
    })
}

/// A step of the two-phase ownership transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerTransfer {
    /// The owner proposes a new owner
    Propose(Pubkey),
    /// The proposed owner accepts
    Accept,
    /// The owner withdraws the proposal
    Cancel,
}

/// Gets an ownership transfer instruction. `signer` is the owner, or the
/// pending owner when accepting.
pub fn owner_transfer_instruction(
    program_id: Pubkey,
    signer: Pubkey,
    config: Pubkey,
    step: OwnerTransfer,
) -> Result<SolanaInstruction, ProgramError> {
    let data = match step {
        OwnerTransfer::Propose(new_owner) => {
            instruction_data("submit_owner_transfer_request", &new_owner)?
        }
        OwnerTransfer::Accept => instruction_discriminator("confirm_owner_transfer_request").to_vec(),
        OwnerTransfer::Cancel => instruction_discriminator("cancel_owner_transfer_request").to_vec(),
    };

    // Accounts:
    // 0. [signer] The owner, or the pending owner.
    // 1. [writeable] Config.
    let accounts = vec![
        AccountMeta::new_readonly(signer, true),
        AccountMeta::new(config, false),
    ];

    Ok(SolanaInstruction {
        program_id,
        data,
        accounts,
    })
}
