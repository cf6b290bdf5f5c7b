//! Known chains and the fixed mapping between EVM chain ids and Starknet chain ids.

use crate::error::ConnectorError;
use starknet::{core::types::Felt, macros::felt};

/// `SN_MAIN` encoded as a felt.
pub const SN_MAIN: Felt = felt!("0x534e5f4d41494e");

/// `SN_SEPOLIA` encoded as a felt.
pub const SN_SEPOLIA: Felt = felt!("0x534e5f5345504f4c4941");

/// Ethereum mainnet chain id.
pub const ETHEREUM_MAINNET_ID: u64 = 1;

/// Kakarot Sepolia chain id.
pub const KAKAROT_SEPOLIA_ID: u64 = 920637907288165;

/// Currency used to pay for gas on an EVM chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NativeCurrency {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

/// Block explorer of an EVM chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockExplorer {
    pub name: &'static str,
    pub url: &'static str,
}

/// Descriptor of an EVM chain, in the shape wallets expect for `wallet_addEthereumChain`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvmChain {
    pub id: u64,
    pub name: &'static str,
    pub native_currency: NativeCurrency,
    pub rpc_url: &'static str,
    pub block_explorer: Option<BlockExplorer>,
    pub testnet: bool,
}

/// Descriptor of a Starknet chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StarknetChain {
    pub id: Felt,
    pub network: &'static str,
    pub name: &'static str,
    pub rpc_urls: &'static [&'static str],
    pub testnet: bool,
}

const ETHER: NativeCurrency = NativeCurrency { name: "Ether", symbol: "ETH", decimals: 18 };

/// The Kakarot zkEVM deployed on Starknet Sepolia.
pub const KAKAROT_SEPOLIA: EvmChain = EvmChain {
    id: KAKAROT_SEPOLIA_ID,
    name: "Kakarot Sepolia",
    native_currency: ETHER,
    rpc_url: "https://sepolia-rpc.kakarot.org",
    block_explorer: Some(BlockExplorer {
        name: "Kakarot Scan",
        url: "https://sepolia.kakarotscan.org",
    }),
    testnet: true,
};

/// Starknet mainnet.
pub const STARKNET_MAINNET: StarknetChain = StarknetChain {
    id: SN_MAIN,
    network: "mainnet",
    name: "Starknet Mainnet",
    rpc_urls: &["https://starknet-mainnet.public.blastapi.io/rpc/v0_7"],
    testnet: false,
};

/// Starknet Sepolia.
pub const STARKNET_SEPOLIA: StarknetChain = StarknetChain {
    id: SN_SEPOLIA,
    network: "sepolia",
    name: "Starknet Sepolia Testnet",
    rpc_urls: &["https://starknet-sepolia.public.blastapi.io/rpc/v0_7"],
    testnet: true,
};

/// One entry of the EVM ⇄ Starknet mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainPair {
    pub evm_chain_id: u64,
    pub starknet: StarknetChain,
}

/// Static registry of the chains the connector can operate on.
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct ChainRegistry;

impl ChainRegistry {
    /// Every known pair. Mainnet maps onto Ethereum mainnet until Kakarot ships a mainnet chain.
    pub const PAIRS: &'static [ChainPair] = &[
        ChainPair { evm_chain_id: KAKAROT_SEPOLIA_ID, starknet: STARKNET_SEPOLIA },
        ChainPair { evm_chain_id: ETHEREUM_MAINNET_ID, starknet: STARKNET_MAINNET },
    ];

    /// Returns the Starknet chain id bridged by the EVM chain `evm_chain_id`.
    pub fn starknet_chain_id(evm_chain_id: u64) -> Result<Felt, ConnectorError> {
        Self::PAIRS
            .iter()
            .find(|pair| pair.evm_chain_id == evm_chain_id)
            .map(|pair| pair.starknet.id)
            .ok_or(ConnectorError::unknown_evm_chain(evm_chain_id))
    }

    /// Returns the EVM chain id that bridges to the Starknet chain `starknet_chain_id`.
    pub fn evm_chain_id(starknet_chain_id: Felt) -> Result<u64, ConnectorError> {
        Self::PAIRS
            .iter()
            .find(|pair| pair.starknet.id == starknet_chain_id)
            .map(|pair| pair.evm_chain_id)
            .ok_or(ConnectorError::unknown_starknet_chain(starknet_chain_id))
    }

    /// Returns the descriptor of a known Starknet chain.
    pub fn starknet_chain(starknet_chain_id: Felt) -> Option<&'static StarknetChain> {
        Self::PAIRS.iter().map(|pair| &pair.starknet).find(|chain| chain.id == starknet_chain_id)
    }

    /// The custom EVM chain used by the bridge network.
    pub const fn bridge_chain() -> &'static EvmChain {
        &KAKAROT_SEPOLIA
    }
}
