//! Calldata layout understood by the Kakarot multicall Cairo precompile.
//!
//! A batch of Starknet calls is sent as a single EVM transaction. The payload is the call count
//! as a 32-byte big-endian word, followed by every call ABI encoded as the parameters
//! `(uint256 contractAddress, uint256 selector, uint256[] calldata)`. Calls execute on-chain in
//! the encoded order. Selectors are the plain `starknet_keccak` of the entry point name, reserved
//! names such as `__default__` included.

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Bytes, U256};
use serde::{Deserialize, Serialize};
use starknet::core::{types::Felt, utils::starknet_keccak};

/// Size of an ABI word.
const WORD: usize = 32;

/// Offset of the `uint256[]` tail inside an encoded call: it follows the three head words.
const CALLDATA_OFFSET: usize = 3 * WORD;

/// A Starknet call, as carried by `wallet_addInvokeTransaction`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub contract_address: Felt,
    pub entry_point: String,
    #[serde(default)]
    pub calldata: Vec<Felt>,
}

/// A decoded call body. Values are raw words, the entry point name is not recoverable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MulticallEntry {
    pub contract_address: U256,
    pub selector: U256,
    pub calldata: Vec<U256>,
}

#[derive(Debug, thiserror::Error)]
pub enum MulticallError {
    #[error("entry point {0:?} is not a valid ascii name")]
    InvalidEntryPoint(String),
    #[error("multicall payload is truncated at byte {0}")]
    Truncated(usize),
    #[error("unexpected calldata offset {found} for call {index}")]
    InvalidOffset { index: usize, found: U256 },
    #[error("value {0} does not fit in usize")]
    Overflow(U256),
    #[error("{0} trailing bytes after the last call")]
    TrailingBytes(usize),
}

/// Converts a felt into the `uint256` word carrying it.
pub fn felt_to_word(felt: &Felt) -> U256 {
    U256::from_be_bytes(felt.to_bytes_be())
}

/// Encodes `calls` into a multicall payload.
///
/// Calls are encoded in the given order. An empty batch yields the single zero count word.
pub fn encode_multicall(calls: &[Call]) -> Result<Bytes, MulticallError> {
    let mut payload = Vec::with_capacity(WORD + calls.len() * 5 * WORD);
    payload.extend_from_slice(&U256::from(calls.len()).to_be_bytes::<WORD>());

    for call in calls {
        if !call.entry_point.is_ascii() {
            return Err(MulticallError::InvalidEntryPoint(call.entry_point.clone()));
        }
        let selector = starknet_keccak(call.entry_point.as_bytes());
        let params = DynSolValue::Tuple(vec![
            DynSolValue::Uint(felt_to_word(&call.contract_address), 256),
            DynSolValue::Uint(felt_to_word(&selector), 256),
            DynSolValue::Array(
                call.calldata
                    .iter()
                    .map(|felt| DynSolValue::Uint(felt_to_word(felt), 256))
                    .collect(),
            ),
        ]);
        payload.extend_from_slice(&params.abi_encode_params());
    }

    trace!(calls = calls.len(), len = payload.len(), "encoded multicall");
    Ok(payload.into())
}

/// Decodes a payload produced by [`encode_multicall`].
pub fn decode_multicall(payload: &[u8]) -> Result<Vec<MulticallEntry>, MulticallError> {
    let mut reader = WordReader { data: payload, pos: 0 };
    let count = reader.read_usize()?;

    let mut entries = Vec::new();
    for index in 0..count {
        let contract_address = reader.read_word()?;
        let selector = reader.read_word()?;
        let offset = reader.read_word()?;
        if offset != U256::from(CALLDATA_OFFSET) {
            return Err(MulticallError::InvalidOffset { index, found: offset });
        }
        let len = reader.read_usize()?;
        let calldata = (0..len).map(|_| reader.read_word()).collect::<Result<Vec<_>, _>>()?;
        entries.push(MulticallEntry { contract_address, selector, calldata });
    }

    match payload.len() - reader.pos {
        0 => Ok(entries),
        trailing => Err(MulticallError::TrailingBytes(trailing)),
    }
}

struct WordReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl WordReader<'_> {
    fn read_word(&mut self) -> Result<U256, MulticallError> {
        let word = self
            .data
            .get(self.pos..self.pos + WORD)
            .ok_or(MulticallError::Truncated(self.pos))?;
        self.pos += WORD;
        Ok(U256::from_be_slice(word))
    }

    fn read_usize(&mut self) -> Result<usize, MulticallError> {
        let word = self.read_word()?;
        word.try_into().map_err(|_| MulticallError::Overflow(word))
    }
}
