//! The multisig transaction envelope submitted to the custody service, its
//! EIP-712 hash, and the proposer signature over that hash.

use crate::error::{Result, RolloutError};
use alloy_primitives::{keccak256, Address, Bytes, B256};
use k256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};

// keccak256("EIP712Domain(uint256 chainId,address verifyingContract)")
const DOMAIN_TYPEHASH_INPUT: &[u8] = b"EIP712Domain(uint256 chainId,address verifyingContract)";

// keccak256 of the custody transaction struct signature.
const TX_TYPEHASH_INPUT: &[u8] = b"SafeTx(address to,uint256 value,bytes data,uint8 operation,uint256 safeTxGas,uint256 baseGas,uint256 gasPrice,address gasToken,address refundReceiver,uint256 nonce)";

// ---------------------------------------------------------------------------
// ProposalEnvelope
// ---------------------------------------------------------------------------

/// `{to, value: 0, data, nonce}` as the custody service expects it. `value`
/// and `operation` are fixed: the orchestrator only proposes plain calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalEnvelope {
    pub to: Address,
    pub value: u64,
    pub data: Bytes,
    pub operation: u8,
    pub nonce: u64,
}

impl ProposalEnvelope {
    pub fn new(to: Address, data: Bytes, nonce: u64) -> Self {
        Self {
            to,
            value: 0,
            data,
            operation: 0,
            nonce,
        }
    }

    /// EIP-712 hash bound to the custody account and chain:
    /// `keccak256(0x19 0x01 ‖ domainSeparator ‖ structHash)`.
    pub fn tx_hash(&self, chain_id: u64, account: Address) -> B256 {
        let domain = {
            let mut buf = Vec::with_capacity(96);
            buf.extend_from_slice(keccak256(DOMAIN_TYPEHASH_INPUT).as_slice());
            buf.extend_from_slice(&u64_word(chain_id));
            buf.extend_from_slice(&address_word(account));
            keccak256(&buf)
        };

        let struct_hash = {
            let mut buf = Vec::with_capacity(352);
            buf.extend_from_slice(keccak256(TX_TYPEHASH_INPUT).as_slice());
            buf.extend_from_slice(&address_word(self.to));
            buf.extend_from_slice(&u64_word(self.value));
            buf.extend_from_slice(keccak256(&self.data).as_slice());
            buf.extend_from_slice(&u64_word(self.operation as u64));
            // safeTxGas, baseGas, gasPrice, gasToken, refundReceiver: all zero.
            buf.extend_from_slice(&[0u8; 32 * 5]);
            buf.extend_from_slice(&u64_word(self.nonce));
            keccak256(&buf)
        };

        let mut buf = Vec::with_capacity(66);
        buf.extend_from_slice(&[0x19, 0x01]);
        buf.extend_from_slice(domain.as_slice());
        buf.extend_from_slice(struct_hash.as_slice());
        keccak256(&buf)
    }
}

fn u64_word(v: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&v.to_be_bytes());
    word
}

fn address_word(a: Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(a.as_slice());
    word
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// Sign a tx hash with a hex-encoded secp256k1 key, producing the 65-byte
/// `r ‖ s ‖ v` form the custody service expects (`v` is 27 or 28).
pub fn sign_tx_hash(signer_key_hex: &str, hash: B256) -> Result<Bytes> {
    let raw = hex::decode(signer_key_hex.trim_start_matches("0x"))
        .map_err(|e| RolloutError::InvalidSignerKey(e.to_string()))?;
    let key = SigningKey::from_slice(&raw)
        .map_err(|e| RolloutError::InvalidSignerKey(e.to_string()))?;
    let (sig, recid) = key
        .sign_prehash_recoverable(hash.as_slice())
        .map_err(|e| RolloutError::InvalidSignerKey(e.to_string()))?;

    let mut out = Vec::with_capacity(65);
    out.extend_from_slice(&sig.to_bytes());
    out.push(27 + recid.to_byte());
    Ok(Bytes::from(out))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
