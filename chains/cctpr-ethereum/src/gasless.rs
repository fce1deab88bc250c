use ethers_core::{
    abi::{encode, Token},
    types::transaction::eip712::{EIP712Domain, Eip712},
    utils::keccak256,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use cctpr_core::{CctprError, CctprResult, Corridor, KnownDomain, Signature, H160, H256, U256};

/// The canonical Permit2 deployment, identical on every EVM chain.
pub const PERMIT2_ADDRESS: H160 = H160([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x22, 0xd4, 0x73, 0x03, 0x0f, 0x11, 0x6d, 0xde, 0xe9, 0xf6, 0xb4,
    0x3a, 0xc7, 0x8b, 0xa3,
]);

const PERMIT2_DOMAIN_NAME: &str = "Permit2";

const TOKEN_PERMISSIONS_TYPE: &str = "TokenPermissions(address token,uint256 amount)";
const WITNESS_TYPE: &str = concat!(
    "TransferWithRelayWitness(uint64 baseAmount,uint8 destinationDomain,",
    "bytes32 mintRecipient,uint32 microGasDropoff,string corridor,",
    "uint64 maxFastFee,uint64 gaslessFee,uint64 maxRelayFee,string quoteSource)"
);
const PERMIT_WITNESS_TYPE: &str = concat!(
    "PermitWitnessTransferFrom(TokenPermissions permitted,address spender,",
    "uint256 nonce,uint256 deadline,TransferWithRelayWitness parameters)"
);

/// Where the relay fee of a gasless transfer was quoted.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, strum::Display)]
pub enum QuoteSource {
    /// Signed by the off-chain quoter
    OffChain,
    /// Computed by the contract
    OnChain,
}

/// The transfer parameters the user commits to as the Permit2 witness.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferWithRelayWitness {
    /// µUSDC handed to the bridge
    pub base_amount: u64,
    /// Destination
    pub destination_domain: KnownDomain,
    /// Recipient on the destination
    pub mint_recipient: H256,
    /// µGasToken
    pub micro_gas_dropoff: u32,
    /// Corridor
    pub corridor: Corridor,
    /// µUSDC, zero on v1
    pub max_fast_fee: u64,
    /// µUSDC
    pub gasless_fee: u64,
    /// µUSDC, the committed fee or its on-chain bound
    pub max_relay_fee: u64,
    /// Quote origin
    pub quote_source: QuoteSource,
}

impl TransferWithRelayWitness {
    fn struct_hash(&self) -> [u8; 32] {
        keccak256(encode(&[
            Token::FixedBytes(keccak256(WITNESS_TYPE).to_vec()),
            Token::Uint(self.base_amount.into()),
            Token::Uint(self.destination_domain.id().into()),
            Token::FixedBytes(self.mint_recipient.as_bytes().to_vec()),
            Token::Uint(self.micro_gas_dropoff.into()),
            Token::FixedBytes(keccak256(self.corridor.witness_name()).to_vec()),
            Token::Uint(self.max_fast_fee.into()),
            Token::Uint(self.gasless_fee.into()),
            Token::Uint(self.max_relay_fee.into()),
            Token::FixedBytes(keccak256(self.quote_source.to_string()).to_vec()),
        ]))
    }
}

/// The Permit2 witness transfer a user signs to authorize a gasless transfer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaslessPermit {
    /// Chain id of the source
    pub chain_id: u64,
    /// Permit2 contract, the verifying contract of the signing domain
    pub permit2: H160,
    /// USDC on the source
    pub token: H160,
    /// µUSDC pulled from the user
    pub amount: u64,
    /// The relayer contract
    pub spender: H160,
    /// Permit2 nonce
    pub nonce: H256,
    /// Unix seconds
    pub deadline: u32,
    /// Transfer parameters
    pub parameters: TransferWithRelayWitness,
}

impl GaslessPermit {
    /// Reads a Permit2 nonce, which must be exactly one word.
    pub fn nonce_from_slice(nonce: &[u8]) -> CctprResult<H256> {
        if nonce.len() != H256::len_bytes() {
            return Err(CctprError::NonceLengthMismatch {
                expected: H256::len_bytes(),
                actual: nonce.len(),
            });
        }
        Ok(H256::from_slice(nonce))
    }

    /// The typed-data document handed to the user's wallet.
    pub fn to_typed_data(&self) -> serde_json::Value {
        let parameters = &self.parameters;
        json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" },
                ],
                "PermitWitnessTransferFrom": [
                    { "name": "permitted", "type": "TokenPermissions" },
                    { "name": "spender", "type": "address" },
                    { "name": "nonce", "type": "uint256" },
                    { "name": "deadline", "type": "uint256" },
                    { "name": "parameters", "type": "TransferWithRelayWitness" },
                ],
                "TokenPermissions": [
                    { "name": "token", "type": "address" },
                    { "name": "amount", "type": "uint256" },
                ],
                "TransferWithRelayWitness": [
                    { "name": "baseAmount", "type": "uint64" },
                    { "name": "destinationDomain", "type": "uint8" },
                    { "name": "mintRecipient", "type": "bytes32" },
                    { "name": "microGasDropoff", "type": "uint32" },
                    { "name": "corridor", "type": "string" },
                    { "name": "maxFastFee", "type": "uint64" },
                    { "name": "gaslessFee", "type": "uint64" },
                    { "name": "maxRelayFee", "type": "uint64" },
                    { "name": "quoteSource", "type": "string" },
                ],
            },
            "primaryType": "PermitWitnessTransferFrom",
            "domain": {
                "name": PERMIT2_DOMAIN_NAME,
                "chainId": self.chain_id,
                "verifyingContract": format!("{:?}", self.permit2),
            },
            "message": {
                "permitted": {
                    "token": format!("{:?}", self.token),
                    "amount": self.amount.to_string(),
                },
                "spender": format!("{:?}", self.spender),
                "nonce": U256::from_big_endian(self.nonce.as_bytes()).to_string(),
                "deadline": self.deadline.to_string(),
                "parameters": {
                    "baseAmount": parameters.base_amount.to_string(),
                    "destinationDomain": parameters.destination_domain.id(),
                    "mintRecipient": format!("{:?}", parameters.mint_recipient),
                    "microGasDropoff": parameters.micro_gas_dropoff,
                    "corridor": parameters.corridor.witness_name(),
                    "maxFastFee": parameters.max_fast_fee.to_string(),
                    "gaslessFee": parameters.gasless_fee.to_string(),
                    "maxRelayFee": parameters.max_relay_fee.to_string(),
                    "quoteSource": parameters.quote_source.to_string(),
                },
            },
        })
    }

    /// The digest the user signs.
    pub fn signing_hash(&self) -> CctprResult<H256> {
        self.encode_eip712().map(H256::from)
    }

    /// Checks that `signature` was made by `owner` over this permit.
    pub fn verify(&self, signature: &Signature, owner: H160) -> CctprResult<()> {
        let signing_hash = self.signing_hash()?;
        match signature.recover(signing_hash) {
            Ok(signer) if signer == owner => Ok(()),
            _ => Err(CctprError::BadSignature),
        }
    }
}

impl Eip712 for GaslessPermit {
    type Error = CctprError;

    fn domain(&self) -> Result<EIP712Domain, Self::Error> {
        Ok(EIP712Domain {
            name: Some(PERMIT2_DOMAIN_NAME.to_owned()),
            version: None,
            chain_id: Some(self.chain_id.into()),
            verifying_contract: Some(self.permit2),
            salt: None,
        })
    }

    fn type_hash() -> Result<[u8; 32], Self::Error> {
        Ok(keccak256(
            [PERMIT_WITNESS_TYPE, TOKEN_PERMISSIONS_TYPE, WITNESS_TYPE].concat(),
        ))
    }

    fn struct_hash(&self) -> Result<[u8; 32], Self::Error> {
        let permitted = keccak256(encode(&[
            Token::FixedBytes(keccak256(TOKEN_PERMISSIONS_TYPE).to_vec()),
            Token::Address(self.token),
            Token::Uint(self.amount.into()),
        ]));
        Ok(keccak256(encode(&[
            Token::FixedBytes(Self::type_hash()?.to_vec()),
            Token::FixedBytes(permitted.to_vec()),
            Token::Address(self.spender),
            Token::Uint(U256::from_big_endian(self.nonce.as_bytes())),
            Token::Uint(self.deadline.into()),
            Token::FixedBytes(self.parameters.struct_hash().to_vec()),
        ])))
    }
}
