use std::fmt::Debug;
use std::io::{Read, Write};

use async_trait::async_trait;
use tracing::{debug, instrument};

use cctpr_core::{
    Amount, CctprError, CctprResult, ContractReader, Corridor, Decode, Encode, FeeCurrency, Kind,
    KnownDomain, RelayQuery, RelayQuoter, H160, U256,
};

use crate::codec::{get_selector, read_domain, write_domain};

const WORD: usize = 32;

/// One query of a `get1959()` call.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EvmRelayQuery {
    /// `0x81` for USDC, `0x82` for the gas token
    pub currency: FeeCurrency,
    /// Destination
    pub destination: KnownDomain,
    /// Corridor
    pub corridor: Corridor,
    /// µGasToken
    pub gas_dropoff: u32,
}

impl TryFrom<&RelayQuery> for EvmRelayQuery {
    type Error = CctprError;

    fn try_from(query: &RelayQuery) -> Result<Self, Self::Error> {
        query.gas_dropoff.ensure_kind(Kind::GenericGasToken)?;
        Ok(Self {
            currency: query.currency,
            destination: query.destination,
            corridor: query.corridor,
            gas_dropoff: u32::try_from(query.gas_dropoff.atomic()).map_err(|_| {
                CctprError::Overflow {
                    field: "gas dropoff",
                    value: query.gas_dropoff.to_string(),
                }
            })?,
        })
    }
}

impl Encode for EvmRelayQuery {
    fn write_to<W>(&self, writer: &mut W) -> std::io::Result<usize>
    where
        W: Write,
    {
        let tag: u8 = match self.currency {
            FeeCurrency::Usdc => 0x81,
            FeeCurrency::GasToken => 0x82,
        };
        Ok(tag.write_to(writer)?
            + write_domain(self.destination, writer)?
            + self.corridor.id().write_to(writer)?
            + self.gas_dropoff.write_to(writer)?)
    }
}

impl Decode for EvmRelayQuery {
    fn read_from<R>(reader: &mut R) -> Result<Self, CctprError>
    where
        R: Read,
        Self: Sized,
    {
        let currency = match u8::read_from(reader)? {
            0x81 => FeeCurrency::Usdc,
            0x82 => FeeCurrency::GasToken,
            other => return Err(CctprError::decode(format!("quote relay tag {other:#04x}"))),
        };
        Ok(Self {
            currency,
            destination: read_domain(reader)?,
            corridor: Corridor::from_id(u8::read_from(reader)?)?,
            gas_dropoff: u32::read_from(reader)?,
        })
    }
}

/// `get1959()` calldata quoting all `queries` in one call.
pub fn quote_relay_calldata(queries: &[EvmRelayQuery]) -> Vec<u8> {
    let mut calldata = get_selector().to_vec();
    for query in queries {
        calldata.extend(query.to_vec());
    }
    calldata
}

/// Splits the ABI `bytes` result of `get1959()` into one word per query.
pub fn decode_quote_relay_result(result: &[u8], query_count: usize) -> CctprResult<Vec<U256>> {
    if result.is_empty() {
        return Err(CctprError::MissingAccount(
            "empty result from the relayer contract".to_owned(),
        ));
    }
    if result.len() < 2 * WORD || result.len() % WORD != 0 {
        return Err(CctprError::decode(format!(
            "unexpected quote result encoding of {} bytes",
            result.len()
        )));
    }
    let words = &result[2 * WORD..];
    if words.len() / WORD != query_count {
        return Err(CctprError::decode(format!(
            "{} quote results for {query_count} queries",
            words.len() / WORD
        )));
    }
    Ok(words.chunks(WORD).map(U256::from_big_endian).collect())
}

/// Asks the relayer contract on an EVM domain for its current relay fees.
#[derive(Debug, Clone)]
pub struct EthereumRelayQuoter<R> {
    domain: KnownDomain,
    address: H160,
    reader: R,
}

impl<R> EthereumRelayQuoter<R>
where
    R: ContractReader,
{
    /// A quoter for the contract at `address` on `domain`.
    pub fn new(domain: KnownDomain, address: H160, reader: R) -> Self {
        Self {
            domain,
            address,
            reader,
        }
    }
}

#[async_trait]
impl<R> RelayQuoter for EthereumRelayQuoter<R>
where
    R: ContractReader + Debug,
{
    fn source(&self) -> KnownDomain {
        self.domain
    }

    #[instrument(err, skip(self), fields(source = %self.domain, queries = queries.len()))]
    async fn quote_relay(&self, queries: &[RelayQuery]) -> CctprResult<Vec<Amount>> {
        if queries.is_empty() {
            return Ok(vec![]);
        }
        let evm_queries = queries
            .iter()
            .map(EvmRelayQuery::try_from)
            .collect::<CctprResult<Vec<_>>>()?;
        let result = self
            .reader
            .call(self.address, quote_relay_calldata(&evm_queries))
            .await?;
        let fees = decode_quote_relay_result(&result, queries.len())?
            .into_iter()
            .zip(queries)
            .map(|(fee, query)| match query.currency {
                FeeCurrency::Usdc => Amount::new(Kind::Usdc, fee),
                FeeCurrency::GasToken => Amount::new(Kind::NativeGasToken(self.domain), fee),
            })
            .collect::<Vec<_>>();
        debug!(?fees, "Quoted relay on chain");
        Ok(fees)
    }
}

#[cfg(test)]
mod test {
    use hex_literal::hex;
    use mockall::{mock, predicate::*};

    use cctpr_core::H256;

    use super::*;

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

    fn queries() -> Vec<RelayQuery> {
        vec![
            RelayQuery {
                destination: KnownDomain::Solana,
                corridor: Corridor::V1,
                gas_dropoff: Amount::generic_gas_token(0),
                currency: FeeCurrency::Usdc,
            },
            RelayQuery {
                destination: KnownDomain::Base,
                corridor: Corridor::V2Direct,
                gas_dropoff: Amount::generic_gas_token(2_000),
                currency: FeeCurrency::GasToken,
            },
        ]
    }

    fn abi_bytes(words: &[u64]) -> Vec<u8> {
        let mut result = vec![0u8; 2 * WORD];
        result[WORD - 1] = 0x20;
        result[2 * WORD - 1] = (words.len() * WORD) as u8;
        for word in words {
            let mut buf = [0u8; WORD];
            U256::from(*word).to_big_endian(&mut buf);
            result.extend(buf);
        }
        result
    }

    #[test]
    fn query_layout() {
        let query = EvmRelayQuery::try_from(&queries()[1]).unwrap();
        assert_eq!(query.to_vec(), hex!("82 06 01 000007d0"));
        assert_eq!(EvmRelayQuery::from_slice(&query.to_vec()).unwrap(), query);
    }

    #[test]
    fn result_shape_is_checked() {
        assert_eq!(
            decode_quote_relay_result(&abi_bytes(&[1, 2]), 2).unwrap(),
            vec![U256::from(1), U256::from(2)]
        );
        assert!(decode_quote_relay_result(&abi_bytes(&[1]), 2).is_err());
        assert!(decode_quote_relay_result(&[0; 40], 0).is_err());
        assert!(matches!(
            decode_quote_relay_result(&[], 1),
            Err(CctprError::MissingAccount(_))
        ));
    }

    #[tokio::test]
    async fn quotes_in_requested_currency() {
        let address = H160::repeat_byte(0xcc);
        let mut reader = MockReader::new();
        reader
            .expect_call()
            .with(eq(address), always())
            .times(1)
            .returning(|_, data| {
                assert_eq!(data[..4], get_selector());
                assert_eq!(data.len(), 4 + 2 * 7);
                Ok(abi_bytes(&[150_000, 42_000_000_000_000]))
            });
        let quoter = EthereumRelayQuoter::new(KnownDomain::Ethereum, address, reader);
        let fees = quoter.quote_relay(&queries()).await.unwrap();
        assert_eq!(fees[0], Amount::usdc(150_000));
        assert_eq!(
            fees[1],
            Amount::new(
                Kind::NativeGasToken(KnownDomain::Ethereum),
                42_000_000_000_000u64
            )
        );
    }

    #[tokio::test]
    async fn no_queries_no_call() {
        let quoter = EthereumRelayQuoter::new(KnownDomain::Base, H160::zero(), MockReader::new());
        assert!(quoter.quote_relay(&[]).await.unwrap().is_empty());
    }
}
