use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rstest::rstest;
use solana_program::pubkey::Pubkey;

use cctpr_core::{
    AccountReader, Amount, ApprovalMethod, CctprError, CctprResult, Corridor, CorridorParams,
    DomainRegistry, FeeCurrency, GaslessAuthorization, InOrOut, Kind, KnownDomain, Network, Quote,
    RelayFee, RelayQuery, RelayQuoter, Signature, TransferRequest, H256, U256,
};
use cctpr_sealevel::{
    to_universal, ChainConfigAccount, ConfigAccount, CorridorArgs, DiscriminatorData,
    FeeAdjustmentEntry, OffChainRelayFee, OracleConfigAccount, PricesAccount, QuoteArgs,
    SealevelClient, SealevelDeployment, SealevelRelayQuoter, SealevelTransferComposer,
    TransferOptions, TransferWithRelayArgs, DEFAULT_ORACLE_PROGRAM_ID,
};

const CCTPR: Pubkey = Pubkey::new_from_array([0xcc; 32]);
const FEE_RECIPIENT: Pubkey = Pubkey::new_from_array([4; 32]);

/// Account state served from memory.
#[derive(Debug, Default)]
struct Accounts(HashMap<H256, Vec<u8>>);

#[async_trait]
impl AccountReader for Accounts {
    async fn get_multiple_accounts(&self, addresses: &[H256]) -> CctprResult<Vec<Option<Vec<u8>>>> {
        Ok(addresses
            .iter()
            .map(|address| self.0.get(address).cloned())
            .collect())
    }
}

fn at_cost() -> FeeAdjustmentEntry {
    FeeAdjustmentEntry {
        absolute_usd: 0,
        relative_percent_bps: 10_000,
    }
}

fn client(with_prices: bool) -> Arc<SealevelClient<Accounts>> {
    let deployment = SealevelDeployment {
        cctpr: CCTPR,
        oracle: DEFAULT_ORACLE_PROGRAM_ID,
    };
    let scratch = SealevelClient::new(Network::Mainnet, deployment, Accounts::default()).unwrap();
    let addresses = scratch.addresses();

    let mut accounts = HashMap::new();
    accounts.insert(
        to_universal(&addresses.config()),
        ConfigAccount {
            owner: Pubkey::new_from_array([1; 32]),
            pending_owner: Pubkey::default(),
            fee_adjuster: Pubkey::new_from_array([3; 32]),
            fee_recipient: FEE_RECIPIENT,
            offchain_quoter: [5; 20],
            rent_bump: 253,
        }
        .encode(),
    );
    accounts.insert(
        to_universal(&addresses.oracle_config()),
        OracleConfigAccount {
            owner: Pubkey::new_from_array([1; 32]),
            pending_owner: None,
            sol_price: 200_000_000,
        }
        .encode(),
    );
    if with_prices {
        for (domain, gas_token_price, gas_price) in [
            (KnownDomain::Base, 3_000_000_000u64, 10u32),
            (KnownDomain::Avalanche, 25_000_000, 25_000),
        ] {
            let chain_id = domain.oracle_chain_id(Network::Mainnet).unwrap();
            let domain_accounts = addresses.domain(domain).unwrap();
            let mut prices = [0u8; 16];
            prices[..4].copy_from_slice(&gas_price.to_le_bytes());
            accounts.insert(
                to_universal(&domain_accounts.prices),
                PricesAccount {
                    chain_id,
                    gas_token_price,
                    prices,
                }
                .encode(),
            );
            accounts.insert(
                to_universal(&domain_accounts.chain_config),
                ChainConfigAccount {
                    domain_id: domain.id(),
                    chain_id,
                    fee_adjustments: [at_cost(); 4],
                }
                .encode(),
            );
        }
    }

    Arc::new(SealevelClient::new(Network::Mainnet, deployment, Accounts(accounts)).unwrap())
}

fn signature() -> Signature {
    Signature {
        r: U256::from(5),
        s: U256::from(6),
        v: 28,
    }
}

fn lamports(amount: u64) -> Amount {
    Amount::new(Kind::NativeGasToken(KnownDomain::Solana), amount)
}

#[derive(Copy, Clone, Debug)]
enum QuoteKind {
    OnChainUsdc,
    OnChainGas,
    OffChainUsdc,
    OffChainGas,
}

fn quote(kind: QuoteKind) -> Quote {
    match kind {
        QuoteKind::OnChainUsdc => Quote::OnChain {
            max_relay_fee: RelayFee::Usdc(Amount::usdc(300_000)),
        },
        QuoteKind::OnChainGas => Quote::OnChain {
            max_relay_fee: RelayFee::GasToken(lamports(2_000_000)),
        },
        QuoteKind::OffChainUsdc => Quote::OffChain {
            expiration_time: 1_900_000_000,
            relay_fee: RelayFee::Usdc(Amount::usdc(250_000)),
            quoter_signature: signature(),
        },
        QuoteKind::OffChainGas => Quote::OffChain {
            expiration_time: 1_900_000_000,
            relay_fee: RelayFee::GasToken(lamports(1_250_000)),
            quoter_signature: signature(),
        },
    }
}

fn request(
    destination: KnownDomain,
    corridor: Corridor,
    in_or_out: InOrOut,
    quote: Quote,
    approval: ApprovalMethod,
) -> TransferRequest {
    TransferRequest {
        source: KnownDomain::Solana,
        destination,
        in_or_out,
        amount: Amount::usdc(25_000_000),
        recipient: H256::repeat_byte(0x42),
        gas_dropoff: Amount::generic_gas_token(0),
        corridor: CorridorParams::new(corridor, Amount::bps(1)).unwrap(),
        quote,
        approval,
    }
}

#[rstest]
#[tokio::test]
async fn every_corridor_and_quote_decodes(
    #[values(
        (KnownDomain::Base, Corridor::V1),
        (KnownDomain::Base, Corridor::V2Direct),
        (KnownDomain::Sui, Corridor::AvaxHop)
    )]
    route: (KnownDomain, Corridor),
    #[values(
        QuoteKind::OnChainUsdc,
        QuoteKind::OnChainGas,
        QuoteKind::OffChainUsdc,
        QuoteKind::OffChainGas
    )]
    quote_kind: QuoteKind,
    #[values(InOrOut::In, InOrOut::Out)] in_or_out: InOrOut,
) {
    let (destination, corridor) = route;
    let composer = SealevelTransferComposer::new(client(false));
    let request = request(
        destination,
        corridor,
        in_or_out,
        quote(quote_kind),
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
                event_data_seed: Some([1, 2, 3, 4]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(ix.program_id, CCTPR);
    assert_eq!(ix.accounts.len(), 27);
    assert_eq!(ix.accounts[5].pubkey, FEE_RECIPIENT);
    assert_eq!(
        ix.accounts[10].pubkey == CCTPR,
        corridor != Corridor::AvaxHop,
        "hop prices"
    );
    assert_eq!(
        ix.accounts[13].pubkey == CCTPR,
        corridor == Corridor::V1,
        "denylist"
    );

    let args = TransferWithRelayArgs::from_instruction_data(&ix.data).unwrap();
    let amounts = request.usdc_amounts().unwrap();
    assert_eq!(u128::from(args.input_amount), amounts.input_amount.atomic().as_u128());
    assert_eq!(amounts.input_amount, amounts.burn_amount);
    assert_eq!(args.mint_recipient, [0x42; 32]);
    assert_eq!(args.event_data_seed, [1, 2, 3, 4]);
    match (corridor, args.corridor) {
        (Corridor::V1, CorridorArgs::V1) => {}
        (Corridor::V2Direct, CorridorArgs::V2Direct { max_fast_fee_usdc })
        | (Corridor::AvaxHop, CorridorArgs::AvaxHop { max_fast_fee_usdc }) => {
            assert!(max_fast_fee_usdc > 0)
        }
        other => panic!("corridor mismatch {other:?}"),
    }
    match (quote_kind, &args.quote) {
        (QuoteKind::OnChainUsdc, QuoteArgs::OnChainUsdc { take_fee_from_input, .. }) => {
            assert_eq!(*take_fee_from_input, in_or_out == InOrOut::In)
        }
        (QuoteKind::OnChainGas, QuoteArgs::OnChainGas { max_relay_fee_sol }) => {
            assert_eq!(*max_relay_fee_sol, 2_000_000)
        }
        (QuoteKind::OffChainUsdc, QuoteArgs::OffChain { relay_fee, .. }) => {
            assert_eq!(*relay_fee, OffChainRelayFee::Usdc(250_000))
        }
        (QuoteKind::OffChainGas, QuoteArgs::OffChain { relay_fee, .. }) => {
            assert_eq!(*relay_fee, OffChainRelayFee::Sol(1_250_000))
        }
        other => panic!("quote mismatch {other:?}"),
    }
}

#[tokio::test]
async fn gasless_out_transfer_charges_fees_beside_the_input() {
    let composer = SealevelTransferComposer::new(client(false));
    let request = request(
        KnownDomain::Base,
        Corridor::V1,
        InOrOut::Out,
        quote(QuoteKind::OffChainUsdc),
        ApprovalMethod::Gasless {
            gasless_fee: Amount::usdc(40_000),
            authorization: GaslessAuthorization::CoSigned {
                expiration_time: 1_900_000_000,
            },
        },
    );
    let ix = composer
        .compose(
            &DomainRegistry::new(Network::Mainnet),
            &request,
            H256::repeat_byte(9),
            Some(H256::repeat_byte(7)),
            TransferOptions::default(),
        )
        .await
        .unwrap();
    let args = TransferWithRelayArgs::from_instruction_data(&ix.data).unwrap();
    // 25 USDC out on v1, the relay and gasless fees are charged separately
    assert_eq!(args.input_amount, 25_000_000);
    assert_eq!(args.gasless.unwrap().gasless_fee_usdc, 40_000);
    assert_eq!(
        request.usdc_amounts().unwrap().total_amount,
        Amount::usdc(25_000_000 + 250_000 + 40_000)
    );
}

#[tokio::test]
async fn gasless_requires_usdc_relay_fee() {
    let composer = SealevelTransferComposer::new(client(false));
    let request = request(
        KnownDomain::Base,
        Corridor::V2Direct,
        InOrOut::In,
        quote(QuoteKind::OnChainGas),
        ApprovalMethod::Gasless {
            gasless_fee: Amount::usdc(40_000),
            authorization: GaslessAuthorization::CoSigned {
                expiration_time: 1_900_000_000,
            },
        },
    );
    let err = composer
        .compose(
            &DomainRegistry::new(Network::Mainnet),
            &request,
            H256::repeat_byte(9),
            Some(H256::repeat_byte(7)),
            TransferOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CctprError::InvalidQuote(_)));
}

#[tokio::test]
async fn batched_relay_quote_reads_one_snapshot() {
    let quoter = SealevelRelayQuoter::new(client(true));
    let query = |destination, corridor| RelayQuery {
        destination,
        corridor,
        gas_dropoff: Amount::generic_gas_token(0),
        currency: FeeCurrency::Usdc,
    };
    let fees = quoter
        .quote_relay(&[
            query(KnownDomain::Base, Corridor::V1),
            query(KnownDomain::Avalanche, Corridor::V2Direct),
        ])
        .await
        .unwrap();
    assert_eq!(fees.len(), 2);
    assert!(fees.iter().all(|fee| fee.kind() == Kind::Usdc));
    assert!(!fees[1].is_zero());
    assert_eq!(quoter.source(), KnownDomain::Solana);
}

#[tokio::test]
async fn missing_prices_fail_the_whole_quote() {
    let quoter = SealevelRelayQuoter::new(client(false));
    let err = quoter
        .quote_relay(&[RelayQuery {
            destination: KnownDomain::Base,
            corridor: Corridor::V1,
            gas_dropoff: Amount::generic_gas_token(0),
            currency: FeeCurrency::Usdc,
        }])
        .await
        .unwrap_err();
    assert!(matches!(err, CctprError::MissingAccount(_)));
    assert!(err.is_retryable());
}
