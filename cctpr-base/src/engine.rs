use std::{collections::BTreeMap, sync::Arc, time::Duration};

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use solana_program::instruction::Instruction as SolanaInstruction;
use tracing::{debug, info, instrument, warn};

use cctpr_core::{
    utils::unix_now, verify_off_chain_quote, AccountReader, Amount, CctprError, CctprResult,
    ContractReader, Corridor, CorridorCost, CorridorStats, Corridors, DomainRegistry,
    FastBurnInfo, FeeCurrency, GovernanceRoles, Kind, KnownDomain, OffChainQuote, Platform,
    QuoteSigner, QuoteSignerExt, RelayCost, RelayFee, RelayQuery, RelayQuoter, SignedType,
    TransferRequest, H256, HOP_DOMAIN,
};
use cctpr_ethereum::{
    ContractTx, EthereumRelayQuoter, EthereumStorageReader, EthereumTransferComposer,
    EvmDeployment, GaslessPermit,
};
use cctpr_sealevel::{
    SealevelClient, SealevelDeployment, SealevelRelayQuoter, SealevelTransferComposer,
    TransferOptions,
};

type EvmReader = Arc<dyn ContractReader>;
type SealevelReader = Arc<dyn AccountReader>;

/// What to quote: every sensible corridor between two domains for a given
/// gas dropoff.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorridorQuery {
    /// Where USDC is burned
    pub source: KnownDomain,
    /// Where USDC is minted
    pub destination: KnownDomain,
    /// Gas token delivered with the USDC, µGasToken
    pub gas_dropoff: Amount,
}

/// Who takes part in a transfer besides the relayer program.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TransferParties {
    /// The user whose USDC is burned. Signs the instruction on Solana.
    pub sender: H256,
    /// The relayer submitting a gasless transfer on the user's behalf
    pub relayer: Option<H256>,
    /// Solana specific knobs
    pub sealevel: TransferOptions,
}

/// A composed transfer, ready to be signed by its submitter.
#[derive(Clone, Debug, PartialEq)]
pub enum TransferPayload {
    /// An `exec768()` call against the relayer contract
    Evm(ContractTx),
    /// A `transfer_with_relay` instruction
    Solana(SolanaInstruction),
}

#[derive(Debug)]
enum SourceDeployment {
    Evm {
        composer: EthereumTransferComposer,
        quoter: EthereumRelayQuoter<EvmReader>,
        storage: EthereumStorageReader<EvmReader>,
    },
    Sealevel {
        client: Arc<SealevelClient<SealevelReader>>,
        quoter: SealevelRelayQuoter<SealevelReader>,
        composer: SealevelTransferComposer<SealevelReader>,
    },
}

impl SourceDeployment {
    fn quoter(&self) -> &dyn RelayQuoter {
        match self {
            SourceDeployment::Evm { quoter, .. } => quoter,
            SourceDeployment::Sealevel { quoter, .. } => quoter,
        }
    }

    async fn roles(&self) -> CctprResult<GovernanceRoles> {
        match self {
            SourceDeployment::Evm { storage, .. } => storage.roles().await,
            SourceDeployment::Sealevel { client, .. } => client.roles().await,
        }
    }
}

/// Quotes corridors and composes transfers for every source chain with a
/// configured relayer deployment.
///
/// The engine holds no mutable state of its own besides the Solana config
/// cache; concurrent calls are independent.
#[derive(Debug)]
pub struct CorridorEngine {
    registry: Arc<DomainRegistry>,
    fast_burn: Arc<dyn FastBurnInfo>,
    quote_validity: Duration,
    deployments: BTreeMap<KnownDomain, SourceDeployment>,
}

impl CorridorEngine {
    /// An engine without deployments. Off-chain quotes it issues expire
    /// `quote_validity` after signing.
    pub fn new(
        registry: Arc<DomainRegistry>,
        fast_burn: Arc<dyn FastBurnInfo>,
        quote_validity: Duration,
    ) -> Self {
        Self {
            registry,
            fast_burn,
            quote_validity,
            deployments: BTreeMap::new(),
        }
    }

    /// Adds the relayer contract on an EVM `domain`.
    pub fn with_evm_deployment(
        mut self,
        domain: KnownDomain,
        deployment: EvmDeployment,
        reader: EvmReader,
    ) -> CctprResult<Self> {
        let composer = EthereumTransferComposer::new(self.registry.network(), domain, deployment)?;
        let quoter = EthereumRelayQuoter::new(domain, deployment.cctpr, reader.clone());
        let storage = EthereumStorageReader::new(deployment.cctpr, reader);
        self.deployments.insert(
            domain,
            SourceDeployment::Evm {
                composer,
                quoter,
                storage,
            },
        );
        Ok(self)
    }

    /// Adds the relayer program on Solana.
    pub fn with_sealevel_deployment(
        mut self,
        deployment: SealevelDeployment,
        reader: SealevelReader,
    ) -> CctprResult<Self> {
        let client = Arc::new(SealevelClient::new(
            self.registry.network(),
            deployment,
            reader,
        )?);
        self.deployments.insert(
            KnownDomain::Solana,
            SourceDeployment::Sealevel {
                quoter: SealevelRelayQuoter::new(client.clone()),
                composer: SealevelTransferComposer::new(client.clone()),
                client,
            },
        );
        Ok(self)
    }

    /// The domain registry
    pub fn registry(&self) -> &DomainRegistry {
        &self.registry
    }

    /// Domains transfers can be composed from.
    pub fn sources(&self) -> impl Iterator<Item = KnownDomain> + '_ {
        self.deployments.keys().copied()
    }

    fn deployment(&self, source: KnownDomain) -> CctprResult<&SourceDeployment> {
        self.deployments
            .get(&source)
            .ok_or(CctprError::NoDeployment(source))
    }

    fn check_gas_dropoff(&self, destination: KnownDomain, gas_dropoff: &Amount) -> CctprResult<()> {
        gas_dropoff.ensure_kind(Kind::GenericGasToken)?;
        let limit = self.registry.info(destination)?.gas_dropoff_limit;
        if gas_dropoff.atomic() > limit.atomic() {
            return Err(CctprError::GasDropoffLimitExceeded {
                requested: gas_dropoff.to_u64().unwrap_or(u64::MAX),
                limit: limit.to_u64()?,
            });
        }
        Ok(())
    }

    async fn fast_fee_rate(
        &self,
        source: KnownDomain,
        destination: KnownDomain,
        corridor: Corridor,
    ) -> CctprResult<Option<Amount>> {
        // the hop corridor burns fast towards the hop domain only
        let fast_destination = match corridor {
            Corridor::V1 => return Ok(None),
            Corridor::V2Direct => destination,
            Corridor::AvaxHop => HOP_DOMAIN,
        };
        self.fast_burn
            .fast_fee_rate(source, fast_destination)
            .await
            .map(Some)
    }

    /// Cost and speed of every sensible corridor of `query`. Relay fees of
    /// all corridors come from a single read of the source chain.
    #[instrument(err, skip(self), fields(source = %query.source, destination = %query.destination))]
    pub async fn quote(&self, query: &CorridorQuery) -> CctprResult<Corridors> {
        self.check_gas_dropoff(query.destination, &query.gas_dropoff)?;
        let corridors = self
            .registry
            .sensible_corridors(query.source, query.destination)?;
        let deployment = self.deployment(query.source)?;

        let queries = corridors
            .iter()
            .flat_map(|corridor| {
                [FeeCurrency::Usdc, FeeCurrency::GasToken].map(|currency| {
                    RelayQuery::new(query.destination, *corridor, query.gas_dropoff, currency)
                })
            })
            .collect::<Vec<_>>();
        let fast_rates = try_join_all(
            corridors
                .iter()
                .map(|corridor| self.fast_fee_rate(query.source, query.destination, *corridor)),
        );
        let (fees, fast_rates, fast_burn_allowance) = futures::try_join!(
            deployment.quoter().quote_relay(&queries),
            fast_rates,
            self.fast_burn.fast_burn_allowance(),
        )?;
        if fees.len() != queries.len() {
            return Err(CctprError::decode(format!(
                "{} relay fees for {} queries",
                fees.len(),
                queries.len()
            )));
        }

        let stats = corridors
            .iter()
            .zip(fees.chunks_exact(2))
            .zip(fast_rates)
            .map(|((corridor, fees), fast)| {
                Ok(CorridorStats {
                    corridor: *corridor,
                    cost: CorridorCost {
                        relay: RelayCost {
                            usdc: fees[0],
                            gas_token: fees[1],
                        },
                        fast,
                    },
                    transfer_time: self.registry.transfer_time(
                        query.source,
                        query.destination,
                        *corridor,
                    )?,
                })
            })
            .collect::<CctprResult<Vec<_>>>()?;
        debug!(corridors = stats.len(), %fast_burn_allowance, "Quoted corridors");
        Ok(Corridors {
            fast_burn_allowance,
            stats,
        })
    }

    /// Signs an off-chain quote committing to `relay_fee`, valid for the
    /// configured quote validity from now.
    #[instrument(err, skip(self, signer))]
    pub async fn issue_off_chain_quote<S: QuoteSigner>(
        &self,
        signer: &S,
        source: KnownDomain,
        destination: KnownDomain,
        corridor: Corridor,
        gas_dropoff: Amount,
        relay_fee: RelayFee,
    ) -> CctprResult<SignedType<OffChainQuote>> {
        self.registry
            .check_is_sensible_corridor(source, destination, corridor)?;
        self.check_gas_dropoff(destination, &gas_dropoff)?;
        let validity = u32::try_from(self.quote_validity.as_secs()).unwrap_or(u32::MAX);
        let expiration = unix_now().saturating_add(validity);
        let quote = OffChainQuote::new(
            source,
            destination,
            corridor,
            gas_dropoff,
            expiration,
            relay_fee,
        )?;
        let signed = signer.sign(quote).await.map_err(CctprError::from_other)?;
        debug!(expiration, quoter = ?signer.eth_address(), "Issued off-chain quote");
        Ok(signed)
    }

    /// Current governance roles of the deployment on `source`.
    pub async fn roles(&self, source: KnownDomain) -> CctprResult<GovernanceRoles> {
        self.deployment(source)?.roles().await
    }

    /// The payload executing `request`. An off-chain quote is checked against
    /// the quoter currently registered on the source chain before anything is
    /// composed.
    #[instrument(
        err,
        skip(self, request, parties),
        fields(
            source = %request.source,
            destination = %request.destination,
            corridor = %request.corridor.corridor(),
        )
    )]
    pub async fn compose(
        &self,
        request: &TransferRequest,
        parties: &TransferParties,
    ) -> CctprResult<TransferPayload> {
        let deployment = self.deployment(request.source)?;
        request.validate(&self.registry)?;
        if let Some(quote) = request.off_chain_quote()? {
            let quoter = deployment.roles().await?.off_chain_quoter;
            if let Err(error) = verify_off_chain_quote(&quote, quoter, unix_now()) {
                warn!(%error, "Refusing to compose a transfer with an invalid off-chain quote");
                return Err(error);
            }
        }

        let payload = match deployment {
            SourceDeployment::Evm { composer, .. } => {
                TransferPayload::Evm(composer.compose(&self.registry, request)?)
            }
            SourceDeployment::Sealevel { composer, .. } => TransferPayload::Solana(
                composer
                    .compose(
                        &self.registry,
                        request,
                        parties.sender,
                        parties.relayer,
                        parties.sealevel,
                    )
                    .await?,
            ),
        };
        info!(approval = request.approval.name(), "Composed transfer");
        Ok(payload)
    }

    /// The Permit2 message a user signs to authorize a gasless transfer.
    /// Only EVM sources take gasless transfers through Permit2.
    pub fn gasless_message(
        &self,
        request: &TransferRequest,
        gasless_fee: &Amount,
        nonce: &[u8],
        deadline: u32,
    ) -> CctprResult<GaslessPermit> {
        match self.deployment(request.source)? {
            SourceDeployment::Evm { composer, .. } => composer.compose_gasless_transfer_message(
                &self.registry,
                request,
                gasless_fee,
                nonce,
                deadline,
            ),
            SourceDeployment::Sealevel { .. } => Err(CctprError::UnsupportedApprovalForPlatform {
                approval: "permit2 gasless",
                platform: Platform::Solana,
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use async_trait::async_trait;
    use ethers_signers::LocalWallet;
    use mockall::{mock, predicate::eq};
    use solana_program::pubkey::Pubkey;
    use tracing_test::traced_test;

    use cctpr_core::{
        ApprovalMethod, CorridorParams, InOrOut, Network, Quote, Role, H160, U256,
    };
    use cctpr_ethereum::{role_slot, LocalQuoteSigner};
    use cctpr_sealevel::DEFAULT_ORACLE_PROGRAM_ID;

    use super::*;

    mock! {
        pub FastBurn {}

        #[async_trait]
        impl FastBurnInfo for FastBurn {
            async fn fast_fee_rate(
                &self,
                source: KnownDomain,
                destination: KnownDomain,
            ) -> CctprResult<Amount>;
            async fn fast_burn_allowance(&self) -> CctprResult<Amount>;
        }
    }

    mock! {
        pub Contract {}

        #[async_trait]
        impl ContractReader for Contract {
            async fn call(&self, to: H160, data: Vec<u8>) -> CctprResult<Vec<u8>>;
            async fn get_storage_at(&self, contract: H160, slot: H256) -> CctprResult<H256>;
        }
    }

    mock! {
        pub Accounts {}

        #[async_trait]
        impl AccountReader for Accounts {
            async fn get_multiple_accounts(
                &self,
                addresses: &[H256],
            ) -> CctprResult<Vec<Option<Vec<u8>>>>;
        }
    }

    impl std::fmt::Debug for MockFastBurn {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("MockFastBurn")
        }
    }

    impl std::fmt::Debug for MockContract {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("MockContract")
        }
    }

    impl std::fmt::Debug for MockAccounts {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("MockAccounts")
        }
    }

    const CCTPR: H160 = H160([0x6f; 20]);

    fn quote_signer() -> LocalQuoteSigner {
        "45bde9fbd4b2b5d1fb09a2e5f6a0f2e4ab38ba0aa5c2d4ec6bc6e4d0cd2fd4a1"
            .parse::<LocalWallet>()
            .unwrap()
            .into()
    }

    /// ABI `bytes` result of `get1959()` carrying `fees`.
    fn quote_result(fees: &[u64]) -> Vec<u8> {
        let mut result = vec![0u8; 64];
        for fee in fees {
            result.extend(H256::from_low_u64_be(*fee).as_bytes());
        }
        result
    }

    fn contract(fees: &'static [u64], quoter: H160) -> MockContract {
        let mut contract = MockContract::new();
        contract
            .expect_call()
            .withf(|to, _| *to == CCTPR)
            .returning(move |_, _| Ok(quote_result(fees)));
        contract.expect_get_storage_at().returning(move |_, slot| {
            if slot == H256::from_low_u64_be(role_slot(Role::OffChainQuoter).into()) {
                Ok(H256::from(quoter))
            } else {
                Ok(H256::zero())
            }
        });
        contract
    }

    fn engine(fast_burn: MockFastBurn, contract: MockContract, validity: u64) -> CorridorEngine {
        CorridorEngine::new(
            Arc::new(DomainRegistry::new(Network::Mainnet)),
            Arc::new(fast_burn),
            Duration::from_secs(validity),
        )
        .with_evm_deployment(
            KnownDomain::Ethereum,
            EvmDeployment {
                cctpr: CCTPR,
                usdc: H160::repeat_byte(0xa0),
                permit2: H160::repeat_byte(0x22),
            },
            Arc::new(contract),
        )
        .unwrap()
    }

    fn allowance_only() -> MockFastBurn {
        let mut fast_burn = MockFastBurn::new();
        fast_burn
            .expect_fast_burn_allowance()
            .returning(|| Ok(Amount::usdc(1_000_000_000)));
        fast_burn
    }

    fn gas(wei: u64) -> Amount {
        Amount::new(Kind::NativeGasToken(KnownDomain::Ethereum), wei)
    }

    fn request(quote: Quote) -> TransferRequest {
        TransferRequest {
            source: KnownDomain::Ethereum,
            destination: KnownDomain::Base,
            in_or_out: InOrOut::In,
            amount: Amount::usdc(10_000_000),
            recipient: H256::repeat_byte(0x42),
            gas_dropoff: Amount::generic_gas_token(0),
            corridor: CorridorParams::new(Corridor::V2Direct, Amount::bps(1)).unwrap(),
            quote,
            approval: ApprovalMethod::Preapproval,
        }
    }

    fn off_chain(signed: &SignedType<OffChainQuote>) -> Quote {
        Quote::OffChain {
            expiration_time: signed.value.expiration_time(),
            relay_fee: *signed.value.relay_fee(),
            quoter_signature: signed.signature,
        }
    }

    #[tokio::test]
    async fn quotes_every_sensible_corridor_in_one_read() {
        let mut fast_burn = allowance_only();
        fast_burn
            .expect_fast_fee_rate()
            .with(eq(KnownDomain::Ethereum), eq(KnownDomain::Base))
            .times(1)
            .returning(|_, _| Ok(Amount::bps(1)));
        let mut contract = MockContract::new();
        contract.expect_call().times(1).returning(|_, _| {
            Ok(quote_result(&[
                110_000,
                40_000_000_000_000,
                150_000,
                55_000_000_000_000,
            ]))
        });
        let engine = engine(fast_burn, contract, 300);

        let corridors = engine
            .quote(&CorridorQuery {
                source: KnownDomain::Ethereum,
                destination: KnownDomain::Base,
                gas_dropoff: Amount::generic_gas_token(0),
            })
            .await
            .unwrap();

        assert_eq!(corridors.fast_burn_allowance, Amount::usdc(1_000_000_000));
        assert_eq!(corridors.stats.len(), 2);
        let v1 = &corridors.stats[0];
        assert_eq!(v1.corridor, Corridor::V1);
        assert_eq!(v1.cost.relay.usdc, Amount::usdc(110_000));
        assert_eq!(v1.cost.relay.gas_token, gas(40_000_000_000_000));
        assert_eq!(v1.cost.fast, None);
        let v2 = &corridors.stats[1];
        assert_eq!(v2.corridor, Corridor::V2Direct);
        assert_eq!(v2.cost.relay.usdc, Amount::usdc(150_000));
        assert_eq!(v2.cost.fast, Some(Amount::bps(1)));
        assert!(v2.transfer_time < v1.transfer_time);
    }

    #[tokio::test]
    async fn hop_fast_fee_is_quoted_towards_the_hop_domain() {
        let mut fast_burn = allowance_only();
        fast_burn
            .expect_fast_fee_rate()
            .with(eq(KnownDomain::Ethereum), eq(HOP_DOMAIN))
            .times(1)
            .returning(|_, _| Ok(Amount::bps(2)));
        let engine = engine(fast_burn, contract(&[1, 2, 3, 4], H160::zero()), 300);

        let corridors = engine
            .quote(&CorridorQuery {
                source: KnownDomain::Ethereum,
                destination: KnownDomain::Noble,
                gas_dropoff: Amount::generic_gas_token(0),
            })
            .await
            .unwrap();
        let corridors = corridors
            .stats
            .iter()
            .map(|stats| (stats.corridor, stats.cost.fast))
            .collect::<Vec<_>>();
        assert_eq!(
            corridors,
            vec![
                (Corridor::V1, None),
                (Corridor::AvaxHop, Some(Amount::bps(2)))
            ]
        );
    }

    #[tokio::test]
    async fn excessive_gas_dropoff_fails_before_any_read() {
        let mut contract = MockContract::new();
        contract.expect_call().never();
        let mut fast_burn = MockFastBurn::new();
        fast_burn.expect_fast_burn_allowance().never();
        let engine = engine(fast_burn, contract, 300);

        let err = engine
            .quote(&CorridorQuery {
                source: KnownDomain::Ethereum,
                destination: KnownDomain::Base,
                gas_dropoff: Amount::generic_gas_token(1_511),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CctprError::GasDropoffLimitExceeded {
                requested: 1_511,
                limit: 1_510
            }
        ));
    }

    #[tokio::test]
    async fn unknown_source_has_no_deployment() {
        let engine = engine(MockFastBurn::new(), MockContract::new(), 300);
        let err = engine
            .quote(&CorridorQuery {
                source: KnownDomain::Arbitrum,
                destination: KnownDomain::Base,
                gas_dropoff: Amount::generic_gas_token(0),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CctprError::NoDeployment(KnownDomain::Arbitrum)));
        assert_eq!(engine.sources().collect::<Vec<_>>(), vec![KnownDomain::Ethereum]);
    }

    #[tokio::test]
    async fn composes_with_a_quote_signed_by_the_registered_quoter() {
        let signer = quote_signer();
        let engine = engine(
            MockFastBurn::new(),
            contract(&[], signer.eth_address()),
            300,
        );
        let signed = engine
            .issue_off_chain_quote(
                &signer,
                KnownDomain::Ethereum,
                KnownDomain::Base,
                Corridor::V2Direct,
                Amount::generic_gas_token(0),
                RelayFee::Usdc(Amount::usdc(120_000)),
            )
            .await
            .unwrap();
        assert!(signed.value.expiration_time() > unix_now());

        let payload = engine
            .compose(&request(off_chain(&signed)), &TransferParties::default())
            .await
            .unwrap();
        let TransferPayload::Evm(tx) = payload else {
            panic!("expected an EVM transaction");
        };
        assert_eq!(tx.to, CCTPR);
        assert_eq!(tx.value, U256::zero());
    }

    #[tokio::test]
    #[traced_test]
    async fn tampered_quote_is_refused() {
        let signer = quote_signer();
        let engine = engine(
            MockFastBurn::new(),
            contract(&[], signer.eth_address()),
            300,
        );
        let signed = engine
            .issue_off_chain_quote(
                &signer,
                KnownDomain::Ethereum,
                KnownDomain::Base,
                Corridor::V2Direct,
                Amount::generic_gas_token(0),
                RelayFee::Usdc(Amount::usdc(120_000)),
            )
            .await
            .unwrap();
        let tampered = Quote::OffChain {
            expiration_time: signed.value.expiration_time(),
            relay_fee: RelayFee::Usdc(Amount::usdc(1)),
            quoter_signature: signed.signature,
        };

        let err = engine
            .compose(&request(tampered), &TransferParties::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CctprError::BadSignature));
        assert!(logs_contain("Refusing to compose a transfer"));
    }

    #[tokio::test]
    #[traced_test]
    async fn expired_quote_is_refused_even_if_signed() {
        let signer = quote_signer();
        let engine = engine(
            MockFastBurn::new(),
            contract(&[], signer.eth_address()),
            0,
        );
        let signed = engine
            .issue_off_chain_quote(
                &signer,
                KnownDomain::Ethereum,
                KnownDomain::Base,
                Corridor::V2Direct,
                Amount::generic_gas_token(0),
                RelayFee::Usdc(Amount::usdc(120_000)),
            )
            .await
            .unwrap();

        let err = engine
            .compose(&request(off_chain(&signed)), &TransferParties::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CctprError::Expired { .. }));
        assert!(logs_contain("invalid off-chain quote"));
    }

    #[tokio::test]
    async fn quote_from_another_key_is_refused() {
        let engine = engine(
            MockFastBurn::new(),
            contract(&[], H160::repeat_byte(0x99)),
            300,
        );
        let signed = engine
            .issue_off_chain_quote(
                &quote_signer(),
                KnownDomain::Ethereum,
                KnownDomain::Base,
                Corridor::V2Direct,
                Amount::generic_gas_token(0),
                RelayFee::Usdc(Amount::usdc(120_000)),
            )
            .await
            .unwrap();
        let err = engine
            .compose(&request(off_chain(&signed)), &TransferParties::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CctprError::BadSignature));
    }

    #[tokio::test]
    async fn on_chain_quotes_skip_the_role_read() {
        let mut contract = MockContract::new();
        contract.expect_get_storage_at().never();
        let engine = engine(MockFastBurn::new(), contract, 300);
        let payload = engine
            .compose(
                &request(Quote::OnChain {
                    max_relay_fee: RelayFee::GasToken(gas(50_000_000_000_000)),
                }),
                &TransferParties::default(),
            )
            .await
            .unwrap();
        let TransferPayload::Evm(tx) = payload else {
            panic!("expected an EVM transaction");
        };
        assert_eq!(tx.value, U256::from(50_000_000_000_000u64));
    }

    #[tokio::test]
    async fn issuing_a_quote_checks_the_corridor() {
        let engine = engine(MockFastBurn::new(), MockContract::new(), 300);
        let err = engine
            .issue_off_chain_quote(
                &quote_signer(),
                KnownDomain::Ethereum,
                KnownDomain::Base,
                Corridor::AvaxHop,
                Amount::generic_gas_token(0),
                RelayFee::Usdc(Amount::usdc(120_000)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CctprError::CorridorDestinationIncoherent { .. }));
    }

    #[test]
    fn gasless_messages_are_evm_only() {
        let engine = engine(MockFastBurn::new(), MockContract::new(), 300)
            .with_sealevel_deployment(
                SealevelDeployment {
                    cctpr: Pubkey::new_from_array([0xcc; 32]),
                    oracle: DEFAULT_ORACLE_PROGRAM_ID,
                },
                Arc::new(MockAccounts::new()),
            )
            .unwrap();
        let on_chain = Quote::OnChain {
            max_relay_fee: RelayFee::Usdc(Amount::usdc(300_000)),
        };

        let permit = engine
            .gasless_message(
                &request(on_chain.clone()),
                &Amount::usdc(50_000),
                &[7; 32],
                1_900_000_000,
            )
            .unwrap();
        assert!(permit.to_typed_data().is_object());

        let solana = TransferRequest {
            source: KnownDomain::Solana,
            ..request(on_chain.clone())
        };
        let err = engine
            .gasless_message(&solana, &Amount::usdc(50_000), &[7; 32], 1_900_000_000)
            .unwrap_err();
        assert!(matches!(
            err,
            CctprError::UnsupportedApprovalForPlatform {
                platform: Platform::Solana,
                ..
            }
        ));

        let err = engine
            .gasless_message(&request(on_chain), &Amount::usdc(50_000), &[7; 31], 1_900_000_000)
            .unwrap_err();
        assert!(matches!(
            err,
            CctprError::NonceLengthMismatch {
                expected: 32,
                actual: 31
            }
        ));
    }
}
