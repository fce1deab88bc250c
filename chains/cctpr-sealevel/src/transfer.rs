use std::sync::Arc;

use solana_program::{instruction::Instruction as SolanaInstruction, pubkey::Pubkey};
use tracing::{debug, instrument};

use cctpr_core::{
    utils::unix_now, AccountReader, Amount, ApprovalMethod, CctprError, CctprResult, Corridor,
    CorridorVariant, DomainRegistry, GaslessAuthorization, InOrOut, Kind, KnownDomain, Platform,
    Quote, RelayFee, TransferRequest, H256, HOP_DOMAIN,
};

use crate::{
    associated_token_address, program_error, to_pubkey, usdc_mint, CctpAccounts, CorridorArgs,
    GaslessArgs, OffChainRelayFee, QuoteArgs, SealevelClient, TransferWithRelayAccounts,
    TransferWithRelayArgs,
};

/// Knobs of a single composition.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TransferOptions {
    /// USDC account to debit, the user's associated token account if unset
    pub user_usdc: Option<H256>,
    /// Seed of the bridge message account, the current unix time if unset
    pub event_data_seed: Option<[u8; 4]>,
}

fn usdc_field(amount: &Amount) -> CctprResult<u64> {
    amount.ensure_kind(Kind::Usdc)?;
    amount.to_u64()
}

fn lamports_field(amount: &Amount) -> CctprResult<u64> {
    amount.ensure_kind(Kind::NativeGasToken(KnownDomain::Solana))?;
    amount.to_u64()
}

fn gas_dropoff_field(request: &TransferRequest) -> CctprResult<u32> {
    u32::try_from(request.gas_dropoff.atomic()).map_err(|_| CctprError::Overflow {
        field: "gas dropoff",
        value: request.gas_dropoff.to_string(),
    })
}

fn corridor_args(variant: &CorridorVariant) -> CctprResult<CorridorArgs> {
    let max_fast_fee_usdc = usdc_field(&variant.max_fast_fee())?;
    Ok(match variant.corridor() {
        Corridor::V1 => CorridorArgs::V1,
        Corridor::V2Direct => CorridorArgs::V2Direct { max_fast_fee_usdc },
        Corridor::AvaxHop => CorridorArgs::AvaxHop { max_fast_fee_usdc },
    })
}

fn quote_args(request: &TransferRequest) -> CctprResult<QuoteArgs> {
    Ok(match &request.quote {
        Quote::OffChain {
            expiration_time,
            relay_fee,
            quoter_signature,
        } => QuoteArgs::OffChain {
            expiration_time: *expiration_time,
            relay_fee: match relay_fee {
                RelayFee::Usdc(fee) => OffChainRelayFee::Usdc(usdc_field(fee)?),
                RelayFee::GasToken(fee) => OffChainRelayFee::Sol(lamports_field(fee)?),
            },
            quoter_signature: (*quoter_signature).into(),
        },
        Quote::OnChain {
            max_relay_fee: RelayFee::Usdc(max),
        } => QuoteArgs::OnChainUsdc {
            max_relay_fee_usdc: usdc_field(max)?,
            take_fee_from_input: request.in_or_out == InOrOut::In,
        },
        Quote::OnChain {
            max_relay_fee: RelayFee::GasToken(max),
        } => QuoteArgs::OnChainGas {
            max_relay_fee_sol: lamports_field(max)?,
        },
    })
}

fn gasless_args(approval: &ApprovalMethod) -> CctprResult<Option<GaslessArgs>> {
    match approval {
        ApprovalMethod::Preapproval => Ok(None),
        ApprovalMethod::Gasless {
            gasless_fee,
            authorization: GaslessAuthorization::CoSigned { expiration_time },
        } => Ok(Some(GaslessArgs {
            gasless_fee_usdc: usdc_field(gasless_fee)?,
            expiration_time: *expiration_time,
        })),
        ApprovalMethod::Permit { .. } => Err(CctprError::UnsupportedApprovalForPlatform {
            approval: "permit",
            platform: Platform::Solana,
        }),
        ApprovalMethod::Gasless { .. } => Err(CctprError::UnsupportedApprovalForPlatform {
            approval: "permit2 gasless",
            platform: Platform::Solana,
        }),
    }
}

/// Composes `transfer_with_relay` instructions for transfers out of Solana.
#[derive(Debug)]
pub struct SealevelTransferComposer<R> {
    client: Arc<SealevelClient<R>>,
}

impl<R> SealevelTransferComposer<R>
where
    R: AccountReader,
{
    /// A composer on top of `client`.
    pub fn new(client: Arc<SealevelClient<R>>) -> Self {
        Self { client }
    }

    /// Arguments of the instruction for `request`. The input amount excludes
    /// the gasless fee and a committed USDC relay fee, which the program
    /// charges on top.
    pub fn transfer_args(
        &self,
        registry: &DomainRegistry,
        request: &TransferRequest,
        user: &Pubkey,
        event_data_seed: [u8; 4],
    ) -> CctprResult<TransferWithRelayArgs> {
        if request.source != KnownDomain::Solana {
            return Err(CctprError::NoDeployment(request.source));
        }
        request.validate(registry)?;
        let gasless = gasless_args(&request.approval)?;
        let amounts = request.usdc_amounts()?;
        let (_, event_data_bump) = self.client.addresses().event_data(user, event_data_seed)?;

        Ok(TransferWithRelayArgs {
            input_amount: usdc_field(&amounts.input_amount)?,
            mint_recipient: request.recipient.0,
            gas_dropoff_micro_gas_token: gas_dropoff_field(request)?,
            corridor: corridor_args(&request.corridor.to_variant(&amounts.burn_amount)?)?,
            quote: quote_args(request)?,
            gasless,
            event_data_seed,
            event_data_bump,
        })
    }

    /// The accounts of a transfer by `user` paid for by `payer`.
    pub fn transfer_accounts(
        &self,
        request: &TransferRequest,
        user: Pubkey,
        payer: Pubkey,
        fee_recipient: Pubkey,
        user_usdc: Option<Pubkey>,
        event_data_seed: [u8; 4],
    ) -> CctprResult<TransferWithRelayAccounts> {
        let addresses = self.client.addresses();
        let mint = usdc_mint(addresses.network());
        let destination = addresses.domain(request.destination)?;
        let avalanche_prices = match request.corridor.corridor() {
            Corridor::AvaxHop => Some(addresses.domain(HOP_DOMAIN)?.prices),
            _ => None,
        };
        let cctp = CctpAccounts::derive(request.corridor.corridor(), request.destination, &mint, &user)
            .map_err(program_error)?;
        let user_usdc = match user_usdc {
            Some(account) => account,
            None => associated_token_address(&user, &mint).map_err(program_error)?,
        };

        Ok(TransferWithRelayAccounts {
            relayer: payer,
            user,
            config: addresses.config(),
            chain_config: destination.chain_config,
            rent_custodian: addresses.rent_custodian().0,
            fee_recipient,
            fee_recipient_usdc: associated_token_address(&fee_recipient, &mint)
                .map_err(program_error)?,
            user_usdc,
            oracle_config: addresses.oracle_config(),
            destination_prices: destination.prices,
            avalanche_prices,
            event_data: addresses.event_data(&user, event_data_seed)?.0,
            usdc_mint: mint,
            denylist: cctp.denylist,
            sender_authority: cctp.sender_authority,
            message_transmitter_config: cctp.message_transmitter_config,
            token_messenger_config: cctp.token_messenger_config,
            remote_token_messenger: cctp.remote_token_messenger,
            token_minter: cctp.token_minter,
            local_token: cctp.local_token,
            token_messenger: cctp.version.token_messenger(),
            message_transmitter: cctp.version.message_transmitter(),
            cctp_event_authority: cctp.event_authority,
            event_authority: addresses.event_authority(),
        })
    }

    /// The `transfer_with_relay` instruction of `request` for `user`. Gasless
    /// transfers are paid for by `payer`, which is then required; otherwise
    /// the user pays.
    #[instrument(err, skip_all, fields(destination = %request.destination, user = ?user))]
    pub async fn compose(
        &self,
        registry: &DomainRegistry,
        request: &TransferRequest,
        user: H256,
        payer: Option<H256>,
        options: TransferOptions,
    ) -> CctprResult<SolanaInstruction> {
        let user = to_pubkey(user);
        let payer = match (&request.approval, payer) {
            (ApprovalMethod::Gasless { .. }, Some(payer)) => to_pubkey(payer),
            (ApprovalMethod::Gasless { .. }, None) => {
                return Err(CctprError::UnsupportedApprovalForPlatform {
                    approval: "gasless without a relayer",
                    platform: Platform::Solana,
                })
            }
            (_, _) => user,
        };
        let seed = options
            .event_data_seed
            .unwrap_or_else(|| unix_now().to_be_bytes());
        let args = self.transfer_args(registry, request, &user, seed)?;

        let fee_recipient = self.client.config().await?.fee_recipient;
        let accounts = self.transfer_accounts(
            request,
            user,
            payer,
            fee_recipient,
            options.user_usdc.map(to_pubkey),
            seed,
        )?;
        debug!(
            approval = request.approval.name(),
            corridor = %request.corridor.corridor(),
            input_amount = args.input_amount,
            "Composed transfer"
        );
        crate::transfer_with_relay_instruction(self.client.addresses().cctpr(), &accounts, &args)
            .map_err(program_error)
    }
}

#[cfg(test)]
mod test {
    use async_trait::async_trait;
    use borsh::BorshDeserialize;
    use mockall::mock;
    use rstest::rstest;

    use cctpr_core::{CorridorParams, Network, Signature, U256};

    use super::*;
    use crate::{
        pda::DEFAULT_ORACLE_PROGRAM_ID, ConfigAccount, DiscriminatorData, SealevelDeployment,
    };

    impl std::fmt::Debug for MockReader {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("MockReader")
        }
    }

    mock! {
        pub Reader {}

        #[async_trait]
        impl AccountReader for Reader {
            async fn get_multiple_accounts(&self, addresses: &[H256]) -> CctprResult<Vec<Option<Vec<u8>>>>;
        }
    }

    const SEED: [u8; 4] = [0, 0, 0, 42];

    fn composer() -> SealevelTransferComposer<MockReader> {
        let mut reader = MockReader::new();
        reader.expect_get_multiple_accounts().returning(|_| {
            Ok(vec![Some(
                ConfigAccount {
                    owner: Pubkey::new_from_array([1; 32]),
                    pending_owner: Pubkey::default(),
                    fee_adjuster: Pubkey::new_from_array([3; 32]),
                    fee_recipient: Pubkey::new_from_array([4; 32]),
                    offchain_quoter: [5; 20],
                    rent_bump: 254,
                }
                .encode(),
            )])
        });
        let client = SealevelClient::new(
            Network::Mainnet,
            SealevelDeployment {
                cctpr: Pubkey::new_from_array([0xcc; 32]),
                oracle: DEFAULT_ORACLE_PROGRAM_ID,
            },
            reader,
        )
        .unwrap();
        SealevelTransferComposer::new(Arc::new(client))
    }

    fn request(
        destination: KnownDomain,
        corridor: CorridorParams,
        quote: Quote,
        approval: ApprovalMethod,
    ) -> TransferRequest {
        TransferRequest {
            source: KnownDomain::Solana,
            destination,
            in_or_out: InOrOut::In,
            amount: Amount::usdc(10_000_000),
            recipient: H256::repeat_byte(0x22),
            gas_dropoff: Amount::generic_gas_token(0),
            corridor,
            quote,
            approval,
        }
    }

    fn on_chain_usdc() -> Quote {
        Quote::OnChain {
            max_relay_fee: RelayFee::Usdc(Amount::usdc(300_000)),
        }
    }

    #[tokio::test]
    async fn preapproved_v1_transfer() {
        let composer = composer();
        let request = request(
            KnownDomain::Arbitrum,
            CorridorParams::new(Corridor::V1, Amount::bps(0)).unwrap(),
            on_chain_usdc(),
            ApprovalMethod::Preapproval,
        );
        let user = H256::repeat_byte(9);
        let ix = composer
            .compose(
                &DomainRegistry::new(Network::Mainnet),
                &request,
                user,
                None,
                TransferOptions {
                    event_data_seed: Some(SEED),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(ix.program_id, Pubkey::new_from_array([0xcc; 32]));
        assert_eq!(ix.accounts.len(), 27);
        assert_eq!(ix.accounts[0].pubkey, to_pubkey(user));
        assert_eq!(ix.accounts[5].pubkey, Pubkey::new_from_array([4; 32]));
        assert_eq!(ix.accounts[13].pubkey, ix.program_id);

        let args = TransferWithRelayArgs::try_from_slice(&ix.data[8..]).unwrap();
        assert_eq!(args.input_amount, 10_000_000);
        assert_eq!(args.corridor, CorridorArgs::V1);
        assert_eq!(
            args.quote,
            QuoteArgs::OnChainUsdc {
                max_relay_fee_usdc: 300_000,
                take_fee_from_input: true
            }
        );
        assert_eq!(args.event_data_seed, SEED);
        assert_eq!(args.gasless, None);
    }

    #[tokio::test]
    async fn gasless_hop_transfer_pays_from_relayer() {
        let composer = composer();
        let request = request(
            KnownDomain::Sui,
            CorridorParams::new(Corridor::AvaxHop, Amount::bps(1)).unwrap(),
            on_chain_usdc(),
            ApprovalMethod::Gasless {
                gasless_fee: Amount::usdc(50_000),
                authorization: GaslessAuthorization::CoSigned {
                    expiration_time: 1_700_000_000,
                },
            },
        );
        let relayer = H256::repeat_byte(7);
        let ix = composer
            .compose(
                &DomainRegistry::new(Network::Mainnet),
                &request,
                H256::repeat_byte(9),
                Some(relayer),
                TransferOptions {
                    event_data_seed: Some(SEED),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(ix.accounts[0].pubkey, to_pubkey(relayer));
        let addresses = composer.client.addresses();
        assert_eq!(
            ix.accounts[10].pubkey,
            addresses.domain(KnownDomain::Avalanche).unwrap().prices
        );
        let args = TransferWithRelayArgs::try_from_slice(&ix.data[8..]).unwrap();
        assert_eq!(args.input_amount, 10_000_000 - 50_000);
        assert_eq!(
            args.gasless,
            Some(GaslessArgs {
                gasless_fee_usdc: 50_000,
                expiration_time: 1_700_000_000
            })
        );
        assert!(matches!(args.corridor, CorridorArgs::AvaxHop { .. }));
    }

    #[rstest]
    #[case(InOrOut::In, 9_800_000)]
    #[case(InOrOut::Out, 10_001_001)]
    fn fees_are_charged_beside_the_input(#[case] in_or_out: InOrOut, #[case] input: u64) {
        let mut request = request(
            KnownDomain::Base,
            CorridorParams::new(Corridor::V2Direct, Amount::bps(1)).unwrap(),
            Quote::OffChain {
                expiration_time: 1_700_000_000,
                relay_fee: RelayFee::Usdc(Amount::usdc(150_000)),
                quoter_signature: Signature {
                    r: U256::one(),
                    s: U256::one(),
                    v: 27,
                },
            },
            ApprovalMethod::Gasless {
                gasless_fee: Amount::usdc(50_000),
                authorization: GaslessAuthorization::CoSigned { expiration_time: 1 },
            },
        );
        request.in_or_out = in_or_out;
        let args = composer()
            .transfer_args(
                &DomainRegistry::new(Network::Mainnet),
                &request,
                &Pubkey::new_from_array([9; 32]),
                SEED,
            )
            .unwrap();
        assert_eq!(args.input_amount, input);
        assert_eq!(
            args.corridor,
            CorridorArgs::V2Direct {
                max_fast_fee_usdc: (input + 9_999) / 10_000
            }
        );

        let debit = request.usdc_amounts().unwrap().total_amount;
        assert_eq!(debit, Amount::usdc(args.input_amount + 50_000 + 150_000));
        if in_or_out == InOrOut::In {
            assert_eq!(debit, request.amount);
        }
    }

    #[tokio::test]
    async fn gasless_needs_a_relayer() {
        let request = request(
            KnownDomain::Base,
            CorridorParams::new(Corridor::V2Direct, Amount::bps(1)).unwrap(),
            on_chain_usdc(),
            ApprovalMethod::Gasless {
                gasless_fee: Amount::usdc(50_000),
                authorization: GaslessAuthorization::CoSigned { expiration_time: 1 },
            },
        );
        let err = composer()
            .compose(
                &DomainRegistry::new(Network::Mainnet),
                &request,
                H256::repeat_byte(9),
                None,
                TransferOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CctprError::UnsupportedApprovalForPlatform { .. }));
    }

    #[test]
    fn permit_is_not_a_solana_approval() {
        let request = request(
            KnownDomain::Base,
            CorridorParams::new(Corridor::V2Direct, Amount::bps(1)).unwrap(),
            on_chain_usdc(),
            ApprovalMethod::Permit {
                value: U256::one(),
                deadline: U256::one(),
                signature: Signature {
                    r: U256::one(),
                    s: U256::one(),
                    v: 27,
                },
            },
        );
        let err = composer()
            .transfer_args(
                &DomainRegistry::new(Network::Mainnet),
                &request,
                &Pubkey::new_from_array([9; 32]),
                SEED,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CctprError::UnsupportedApprovalForPlatform {
                approval: "permit",
                ..
            }
        ));
    }

    #[test]
    fn off_chain_gas_token_fee_travels_in_lamports() {
        let request = request(
            KnownDomain::Base,
            CorridorParams::new(Corridor::V2Direct, Amount::bps(1)).unwrap(),
            Quote::OffChain {
                expiration_time: u32::MAX,
                relay_fee: RelayFee::GasToken(Amount::new(
                    Kind::NativeGasToken(KnownDomain::Solana),
                    1_500_000u64,
                )),
                quoter_signature: Signature {
                    r: U256::from(1),
                    s: U256::from(2),
                    v: 27,
                },
            },
            ApprovalMethod::Preapproval,
        );
        let args = composer()
            .transfer_args(
                &DomainRegistry::new(Network::Mainnet),
                &request,
                &Pubkey::new_from_array([9; 32]),
                SEED,
            )
            .unwrap();
        match args.quote {
            QuoteArgs::OffChain {
                relay_fee,
                quoter_signature,
                ..
            } => {
                assert_eq!(relay_fee, OffChainRelayFee::Sol(1_500_000));
                assert_eq!(quoter_signature[64], 27);
            }
            other => panic!("unexpected quote {other:?}"),
        }
        // 10 USDC burned at 1 bp
        assert_eq!(
            args.corridor,
            CorridorArgs::V2Direct {
                max_fast_fee_usdc: 1_000
            }
        );
    }

    #[test]
    fn only_solana_sources() {
        let mut request = request(
            KnownDomain::Base,
            CorridorParams::new(Corridor::V1, Amount::bps(0)).unwrap(),
            on_chain_usdc(),
            ApprovalMethod::Preapproval,
        );
        request.source = KnownDomain::Ethereum;
        assert!(matches!(
            composer().transfer_args(
                &DomainRegistry::new(Network::Mainnet),
                &request,
                &Pubkey::new_from_array([9; 32]),
                SEED
            ),
            Err(CctprError::NoDeployment(KnownDomain::Ethereum))
        ));
    }
}
