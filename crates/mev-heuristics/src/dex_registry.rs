//! Known DEX routers and swap event signatures.

use alloy::primitives::{address, b256, Address, B256};
use mev_guard_chain::{ChainTransaction, Network, TransactionReceipt};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{ScanError, ScanResult};

const ETHEREUM_ROUTERS: &[(&str, Address)] = &[
    ("uniswap_v2_router02", address!("7a250d5630b4cf539739df2c5dacb4c659f2488d")),
    ("uniswap_v3_swap_router", address!("e592427a0aece92de3edee1f18e0157c05861564")),
    ("uniswap_swap_router02", address!("68b3465833fb72a70ecdf485e0e4c7bd8665fc45")),
    ("uniswap_universal_router", address!("3fc91a3afd70395cd496c647d5a6cc9d4b2b7fad")),
    ("uniswap_universal_router_v4", address!("66a9893cc07d91d95644aedd05d03f95e1dba8af")),
    ("sushiswap_router", address!("d9e1ce17f2641f24ae83637ab66a2cca9c378b9f")),
    ("oneinch_v5_router", address!("1111111254eeb25477b68fb85ed929f73a960582")),
    ("oneinch_v6_router", address!("111111125421ca6dc452d289314280a0f8842a65")),
    ("zeroex_exchange_proxy", address!("def1c0ded9bec7f1a1670819833240f027b25eff")),
];

const BASE_ROUTERS: &[(&str, Address)] = &[
    ("uniswap_swap_router02", address!("2626664c2603336e57b271c5c0b26f421741e481")),
    ("uniswap_universal_router", address!("3fc91a3afd70395cd496c647d5a6cc9d4b2b7fad")),
    ("uniswap_universal_router_v4", address!("6ff5693b99212da76ad316178a184ab56d299b43")),
    ("aerodrome_router", address!("cf77a3ba9a5ca399b7c97c74d54e5b1beb874e43")),
    ("oneinch_v6_router", address!("111111125421ca6dc452d289314280a0f8842a65")),
];

/// `Swap(address,uint256,uint256,uint256,uint256,address)`
pub const UNISWAP_V2_SWAP_TOPIC: B256 =
    b256!("d78ad95fa46c994b6551d0da85fc275fe613ce37657fb8d5e3d130840159d822");

/// `Swap(address,address,int256,int256,uint160,uint128,int24)`
pub const UNISWAP_V3_SWAP_TOPIC: B256 =
    b256!("c42079f94a6350d7e6235f29174924f928cc2ac818eb64fed8004e115fbcca67");

/// Registry of contracts whose callers are treated as swappers.
#[derive(Debug, Clone)]
pub struct DexRegistry {
    routers: HashMap<Network, HashSet<Address>>,
    swap_topics: Vec<B256>,
}

impl DexRegistry {
    /// Registry with the built-in routers for every supported network.
    pub fn new() -> Self {
        let mut routers: HashMap<Network, HashSet<Address>> = HashMap::new();
        for network in Network::ALL {
            let builtin = builtin_routers(network);
            routers.insert(network, builtin.iter().map(|(_, addr)| *addr).collect());
        }

        let registry = Self {
            routers,
            swap_topics: vec![UNISWAP_V2_SWAP_TOPIC, UNISWAP_V3_SWAP_TOPIC],
        };
        info!(
            ethereum = registry.router_count(Network::Ethereum),
            base = registry.router_count(Network::Base),
            "Loaded DEX router registry"
        );
        registry
    }

    /// Add operator-supplied routers for one network.
    pub fn with_extra_routers<I>(mut self, network: Network, extra: I) -> Self
    where
        I: IntoIterator<Item = Address>,
    {
        let set = self.routers.entry(network).or_default();
        for router in extra {
            if set.insert(router) {
                debug!(network = %network, router = %router, "Registered extra DEX router");
            }
        }
        self
    }

    /// Check if an address is a known router on `network`.
    pub fn is_router(&self, network: Network, address: &Address) -> bool {
        self.routers
            .get(&network)
            .is_some_and(|set| set.contains(address))
    }

    /// Whether a transaction is sent directly to a known router.
    pub fn touches_router(&self, network: Network, tx: &ChainTransaction) -> bool {
        tx.to.is_some_and(|to| self.is_router(network, &to))
    }

    /// Label of a built-in router, `None` for unknown or operator-supplied ones.
    pub fn router_name(&self, network: Network, address: &Address) -> Option<&'static str> {
        builtin_routers(network)
            .iter()
            .find(|(_, router)| router == address)
            .map(|(name, _)| *name)
    }

    pub fn swap_topics(&self) -> &[B256] {
        &self.swap_topics
    }

    /// Whether a receipt emitted a known swap event.
    pub fn is_swap_receipt(&self, receipt: &TransactionReceipt) -> bool {
        receipt.emits_any(&self.swap_topics)
    }

    pub fn router_count(&self, network: Network) -> usize {
        self.routers.get(&network).map_or(0, HashSet::len)
    }
}

impl Default for DexRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_routers(network: Network) -> &'static [(&'static str, Address)] {
    match network {
        Network::Ethereum => ETHEREUM_ROUTERS,
        Network::Base => BASE_ROUTERS,
    }
}

/// Parse a comma-separated router list such as `EXTRA_DEX_ROUTERS`.
pub fn parse_router_list(raw: &str) -> ScanResult<Vec<Address>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            Address::from_str(entry)
                .map_err(|e| ScanError::Validation(format!("invalid router address '{}': {}", entry, e)))
        })
        .collect()
}
