use solana_program::{program_error::ProgramError, pubkey, pubkey::Pubkey};

use cctpr_core::{Corridor, KnownDomain, Network, HOP_DOMAIN};

use crate::pda::find_address;

/// SPL token program
pub const TOKEN_PROGRAM_ID: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
/// SPL associated token account program
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey =
    pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// USDC mint of `network`.
pub fn usdc_mint(network: Network) -> Pubkey {
    match network {
        Network::Mainnet => pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
        Network::Testnet => pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU"),
    }
}

/// The associated token account of `owner` for `mint`.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Result<Pubkey, ProgramError> {
    find_address(
        &[owner.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _)| address)
}

/// Version of the bridge protocol's programs a burn goes through.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CctpVersion {
    /// Legacy
    V1,
    /// Fast
    V2,
}

impl CctpVersion {
    /// Only `v1` burns through the legacy programs.
    pub fn of(corridor: Corridor) -> Self {
        match corridor {
            Corridor::V1 => CctpVersion::V1,
            Corridor::V2Direct | Corridor::AvaxHop => CctpVersion::V2,
        }
    }

    /// Token messenger minter program
    pub fn token_messenger(self) -> Pubkey {
        match self {
            CctpVersion::V1 => pubkey!("CCTPiPYPc6AsJuwueEnWgSgucamXDZwBd53dQ11YiKX3"),
            CctpVersion::V2 => pubkey!("CCTPV2vPZJS2u2BBsUoscuikbYjnpFmbFsvVuJdgUMQe"),
        }
    }

    /// Message transmitter program
    pub fn message_transmitter(self) -> Pubkey {
        match self {
            CctpVersion::V1 => pubkey!("CCTPmbSD7gX1bxKPAmg77w8oFzNFpaQiQUWD43TKaecd"),
            CctpVersion::V2 => pubkey!("CCTPV2Sm4AdWt5296sk4P66VBZ7bEhcARwFaaS9YPbeC"),
        }
    }
}

/// The bridge protocol's accounts a `deposit_for_burn` touches.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CctpAccounts {
    /// Protocol version
    pub version: CctpVersion,
    /// Denylist entry of the user, `v2` only
    pub denylist: Option<Pubkey>,
    /// Sender authority of the token messenger
    pub sender_authority: Pubkey,
    /// Message transmitter config
    pub message_transmitter_config: Pubkey,
    /// Token messenger config
    pub token_messenger_config: Pubkey,
    /// Remote token messenger of the domain the burn mints on
    pub remote_token_messenger: Pubkey,
    /// Token minter
    pub token_minter: Pubkey,
    /// Local token entry of the mint
    pub local_token: Pubkey,
    /// Event authority of the token messenger
    pub event_authority: Pubkey,
}

impl CctpAccounts {
    /// Accounts of a burn of `mint` by `user` over `corridor` to `destination`.
    /// The hop corridor burns towards the hop domain.
    pub fn derive(
        corridor: Corridor,
        destination: KnownDomain,
        mint: &Pubkey,
        user: &Pubkey,
    ) -> Result<Self, ProgramError> {
        let version = CctpVersion::of(corridor);
        let messenger = version.token_messenger();
        let minting_domain = match corridor {
            Corridor::AvaxHop => HOP_DOMAIN,
            _ => destination,
        };
        let messenger_address = |seeds: &[&[u8]]| -> Result<Pubkey, ProgramError> {
            find_address(seeds, &messenger).map(|(address, _)| address)
        };
        let denylist = match version {
            CctpVersion::V1 => None,
            CctpVersion::V2 => Some(messenger_address(&[b"denylist_account", user.as_ref()])?),
        };
        Ok(Self {
            version,
            denylist,
            sender_authority: messenger_address(&[b"sender_authority"])?,
            message_transmitter_config: find_address(
                &[b"message_transmitter"],
                &version.message_transmitter(),
            )?
            .0,
            token_messenger_config: messenger_address(&[b"token_messenger"])?,
            remote_token_messenger: messenger_address(&[
                b"remote_token_messenger",
                minting_domain.id().to_string().as_bytes(),
            ])?,
            token_minter: messenger_address(&[b"token_minter"])?,
            local_token: messenger_address(&[b"local_token", mint.as_ref()])?,
            event_authority: messenger_address(&[b"__event_authority"])?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hop_burns_towards_avalanche() {
        let mint = usdc_mint(Network::Mainnet);
        let user = Pubkey::new_from_array([9; 32]);
        let hop = CctpAccounts::derive(Corridor::AvaxHop, KnownDomain::Sui, &mint, &user).unwrap();
        let direct =
            CctpAccounts::derive(Corridor::V2Direct, KnownDomain::Avalanche, &mint, &user).unwrap();
        assert_eq!(hop.remote_token_messenger, direct.remote_token_messenger);
        assert_eq!(
            hop.remote_token_messenger,
            Pubkey::find_program_address(
                &[b"remote_token_messenger", b"1"],
                &CctpVersion::V2.token_messenger()
            )
            .0
        );
    }

    #[test]
    fn legacy_burn_has_no_denylist() {
        let mint = usdc_mint(Network::Testnet);
        let user = Pubkey::new_from_array([9; 32]);
        let v1 = CctpAccounts::derive(Corridor::V1, KnownDomain::Base, &mint, &user).unwrap();
        assert_eq!(v1.version, CctpVersion::V1);
        assert!(v1.denylist.is_none());
        let v2 = CctpAccounts::derive(Corridor::V2Direct, KnownDomain::Base, &mint, &user).unwrap();
        assert!(v2.denylist.is_some());
        assert_ne!(v1.token_minter, v2.token_minter);
    }

    #[test]
    fn associated_token_account_derivation() {
        let owner = Pubkey::new_from_array([3; 32]);
        let mint = usdc_mint(Network::Mainnet);
        assert_eq!(
            associated_token_address(&owner, &mint).unwrap(),
            Pubkey::find_program_address(
                &[owner.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
                &ASSOCIATED_TOKEN_PROGRAM_ID
            )
            .0
        );
    }
}
