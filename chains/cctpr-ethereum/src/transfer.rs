use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use cctpr_core::{
    calc_usdc_amounts, Amount, ApprovalMethod, CctprError, CctprResult, CorridorParams,
    DomainRegistry, Encode, GaslessAuthorization, InOrOut, Kind, KnownDomain, Network, Platform, Quote,
    RelayFee, Rounding, TransferRequest, Unit, H160, U256,
};

use crate::{
    codec::{
        ContractTx, EvmCorridorVariant, EvmTransfer, GaslessQuoteVariant, OffChainRelayFee,
        Permit, Permit2Data, TransferCommon, UserQuoteVariant,
    },
    gasless::{GaslessPermit, QuoteSource, TransferWithRelayWitness, PERMIT2_ADDRESS},
};

/// Addresses of one relayer deployment.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmDeployment {
    /// The relayer contract
    pub cctpr: H160,
    /// USDC on the chain
    pub usdc: H160,
    /// Permit2
    #[serde(default = "default_permit2")]
    pub permit2: H160,
}

fn default_permit2() -> H160 {
    PERMIT2_ADDRESS
}

/// USDC flows of a gasless transfer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GaslessAmounts {
    /// µUSDC the user permits Permit2 to pull
    pub amount: Amount,
    /// µUSDC left after the gasless fee and a committed relay fee
    pub base_amount: Amount,
    /// µUSDC handed to the bridge
    pub burn_amount: Amount,
}

/// The USDC allowance the relayer contract needs for a transfer. Fails if the
/// fees eat up the whole input of an `in` transfer.
pub fn check_cost_and_calc_required_allowance(
    in_or_out: InOrOut,
    amount: &Amount,
    corridor: &CorridorParams,
    quote: &Quote,
    gasless_fee: &Amount,
) -> CctprResult<Amount> {
    let amounts = calc_usdc_amounts(in_or_out, amount, corridor, quote, gasless_fee)?;
    if in_or_out == InOrOut::In && amounts.total_fees.atomic() >= amount.atomic() {
        return Err(CctprError::InsufficientAmount(format!(
            "costs of {} exceed input amount of {amount}",
            amounts.total_fees
        )));
    }
    Ok(amounts.total_amount)
}

/// Amounts of a gasless transfer. The relay fee must be quoted in USDC.
pub fn calc_gasless_amounts(
    in_or_out: InOrOut,
    amount: &Amount,
    corridor: &CorridorParams,
    quote: &Quote,
    gasless_fee: &Amount,
) -> CctprResult<GaslessAmounts> {
    if quote.relay_fee().usdc().is_none() {
        return Err(CctprError::InvalidQuote(
            "gasless transfers must pay the relay fee in USDC",
        ));
    }
    let amounts = calc_usdc_amounts(in_or_out, amount, corridor, quote, gasless_fee)?;
    Ok(GaslessAmounts {
        amount: amounts.total_amount,
        base_amount: amounts.input_amount,
        burn_amount: amounts.burn_amount,
    })
}

fn gas_dropoff_field(request: &TransferRequest) -> CctprResult<u32> {
    u32::try_from(request.gas_dropoff.atomic()).map_err(|_| CctprError::Overflow {
        field: "gas dropoff",
        value: request.gas_dropoff.to_string(),
    })
}

fn usdc_field(amount: &Amount) -> CctprResult<u64> {
    amount.ensure_kind(Kind::Usdc)?;
    amount.to_u64()
}

/// Off-chain gas token fees travel in gwei, so they must be whole gwei.
fn gwei_field(fee: &Amount) -> CctprResult<u64> {
    let gwei = fee.to_unit(Unit::Nano, Rounding::Floor);
    if gwei != fee.to_unit(Unit::Nano, Rounding::Ceil) {
        return Err(CctprError::InvalidQuote(
            "off-chain gas token relay fees must be whole gwei",
        ));
    }
    u64::try_from(gwei).map_err(|_| CctprError::Overflow {
        field: "gwei relay fee",
        value: fee.to_string(),
    })
}

/// Composes relayer contract calls for transfers out of one EVM domain.
#[derive(Clone, Debug)]
pub struct EthereumTransferComposer {
    network: Network,
    domain: KnownDomain,
    deployment: EvmDeployment,
}

impl EthereumTransferComposer {
    /// A composer for the deployment on `domain`.
    pub fn new(network: Network, domain: KnownDomain, deployment: EvmDeployment) -> CctprResult<Self> {
        if domain.platform() != Platform::Evm {
            return Err(CctprError::NoDeployment(domain));
        }
        Ok(Self {
            network,
            domain,
            deployment,
        })
    }

    /// The source domain
    pub fn domain(&self) -> KnownDomain {
        self.domain
    }

    /// The deployment
    pub fn deployment(&self) -> &EvmDeployment {
        &self.deployment
    }

    fn check_request(&self, registry: &DomainRegistry, request: &TransferRequest) -> CctprResult<()> {
        if request.source != self.domain {
            return Err(CctprError::NoDeployment(request.source));
        }
        request.validate(registry)
    }

    /// The `exec768()` transaction of `request`.
    #[instrument(skip_all, fields(source = %request.source, destination = %request.destination))]
    pub fn compose(
        &self,
        registry: &DomainRegistry,
        request: &TransferRequest,
    ) -> CctprResult<ContractTx> {
        self.check_request(registry, request)?;
        let transfer = self.transfer_body(request)?;
        let value = match request.quote.relay_fee() {
            RelayFee::GasToken(fee) => fee.atomic(),
            RelayFee::Usdc(_) => U256::zero(),
        };
        debug!(
            approval = request.approval.name(),
            corridor = %request.corridor.corridor(),
            %value,
            "Composed transfer"
        );
        Ok(ContractTx::exec(self.deployment.cctpr, value, &transfer.to_vec()))
    }

    /// The transfer body of `request`, without selector.
    pub fn transfer_body(&self, request: &TransferRequest) -> CctprResult<EvmTransfer> {
        match &request.approval {
            ApprovalMethod::Preapproval => {
                Ok(EvmTransfer::Preapproval(self.user_transfer_common(request)?))
            }
            ApprovalMethod::Permit {
                value,
                deadline,
                signature,
            } => Ok(EvmTransfer::Permit {
                permit: Permit {
                    value: *value,
                    deadline: *deadline,
                    signature: *signature,
                },
                common: self.user_transfer_common(request)?,
            }),
            ApprovalMethod::Gasless {
                gasless_fee,
                authorization:
                    GaslessAuthorization::Permit2 {
                        owner,
                        nonce,
                        deadline,
                        signature,
                    },
            } => {
                let nonce = GaslessPermit::nonce_from_slice(nonce)?;
                let amounts = calc_gasless_amounts(
                    request.in_or_out,
                    &request.amount,
                    &request.corridor,
                    &request.quote,
                    gasless_fee,
                )?;
                Ok(EvmTransfer::Gasless {
                    permit2: Permit2Data {
                        owner: *owner,
                        amount: usdc_field(&amounts.amount)?,
                        nonce,
                        deadline: *deadline,
                        signature: *signature,
                    },
                    gasless_fee_usdc: usdc_field(gasless_fee)?,
                    common: TransferCommon {
                        input_amount_usdc: usdc_field(&amounts.base_amount)?,
                        destination_domain: request.destination,
                        mint_recipient: request.recipient,
                        gas_dropoff: gas_dropoff_field(request)?,
                        corridor: EvmCorridorVariant::try_from(
                            &request.corridor.to_variant(&amounts.burn_amount)?,
                        )?,
                        quote: gasless_quote_variant(request)?,
                    },
                })
            }
            ApprovalMethod::Gasless { .. } => Err(CctprError::UnsupportedApprovalForPlatform {
                approval: "co-signed gasless",
                platform: Platform::Evm,
            }),
        }
    }

    fn user_transfer_common(
        &self,
        request: &TransferRequest,
    ) -> CctprResult<TransferCommon<UserQuoteVariant>> {
        let amounts = request.usdc_amounts()?;
        Ok(TransferCommon {
            input_amount_usdc: usdc_field(&amounts.input_amount)?,
            destination_domain: request.destination,
            mint_recipient: request.recipient,
            gas_dropoff: gas_dropoff_field(request)?,
            corridor: EvmCorridorVariant::try_from(
                &request.corridor.to_variant(&amounts.burn_amount)?,
            )?,
            quote: user_quote_variant(request)?,
        })
    }

    /// The Permit2 witness transfer the user signs for a gasless `request`.
    /// The request's approval method is not consulted; `gasless_fee`, `nonce`
    /// and `deadline` are what the user commits to.
    pub fn compose_gasless_transfer_message(
        &self,
        registry: &DomainRegistry,
        request: &TransferRequest,
        gasless_fee: &Amount,
        nonce: &[u8],
        deadline: u32,
    ) -> CctprResult<GaslessPermit> {
        if request.source != self.domain {
            return Err(CctprError::NoDeployment(request.source));
        }
        registry.check_is_sensible_corridor(
            request.source,
            request.destination,
            request.corridor.corridor(),
        )?;
        let nonce = GaslessPermit::nonce_from_slice(nonce)?;
        let amounts = calc_gasless_amounts(
            request.in_or_out,
            &request.amount,
            &request.corridor,
            &request.quote,
            gasless_fee,
        )?;
        let corridor = request.corridor.to_variant(&amounts.burn_amount)?;
        let chain_id = self
            .domain
            .evm_chain_id(self.network)
            .ok_or(CctprError::NoDeployment(self.domain))?;

        Ok(GaslessPermit {
            chain_id,
            permit2: self.deployment.permit2,
            token: self.deployment.usdc,
            amount: usdc_field(&amounts.amount)?,
            spender: self.deployment.cctpr,
            nonce,
            deadline,
            parameters: TransferWithRelayWitness {
                base_amount: usdc_field(&amounts.base_amount)?,
                destination_domain: request.destination,
                mint_recipient: request.recipient,
                micro_gas_dropoff: gas_dropoff_field(request)?,
                corridor: request.corridor.corridor(),
                max_fast_fee: usdc_field(&corridor.max_fast_fee())?,
                gasless_fee: usdc_field(gasless_fee)?,
                max_relay_fee: usdc_field(&request.quote.max_usdc_fee())?,
                quote_source: if request.quote.is_off_chain() {
                    QuoteSource::OffChain
                } else {
                    QuoteSource::OnChain
                },
            },
        })
    }
}

fn user_quote_variant(request: &TransferRequest) -> CctprResult<UserQuoteVariant> {
    Ok(match &request.quote {
        Quote::OffChain {
            expiration_time,
            relay_fee,
            quoter_signature,
        } => UserQuoteVariant::OffChain {
            expiration_time: *expiration_time,
            relay_fee: match relay_fee {
                RelayFee::Usdc(fee) => OffChainRelayFee::Usdc(usdc_field(fee)?),
                RelayFee::GasToken(fee) => OffChainRelayFee::GasTokenGwei(gwei_field(fee)?),
            },
            quoter_signature: *quoter_signature,
        },
        Quote::OnChain {
            max_relay_fee: RelayFee::Usdc(max),
        } => UserQuoteVariant::OnChainUsdc {
            max_relay_fee_usdc: usdc_field(max)?,
            take_relay_fee_from_input: request.in_or_out == InOrOut::In,
        },
        Quote::OnChain {
            max_relay_fee: RelayFee::GasToken(_),
        } => UserQuoteVariant::OnChainGas,
    })
}

fn gasless_quote_variant(request: &TransferRequest) -> CctprResult<GaslessQuoteVariant> {
    match &request.quote {
        Quote::OffChain {
            expiration_time,
            relay_fee: RelayFee::Usdc(fee),
            quoter_signature,
        } => Ok(GaslessQuoteVariant::OffChain {
            expiration_time: *expiration_time,
            relay_fee_usdc: usdc_field(fee)?,
            quoter_signature: *quoter_signature,
        }),
        Quote::OnChain {
            max_relay_fee: RelayFee::Usdc(max),
        } => Ok(GaslessQuoteVariant::OnChainUsdc {
            max_relay_fee_usdc: usdc_field(max)?,
            take_relay_fee_from_input: request.in_or_out == InOrOut::In,
        }),
        _ => Err(CctprError::InvalidQuote(
            "gasless transfers must pay the relay fee in USDC",
        )),
    }
}
