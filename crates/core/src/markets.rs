//! Market and vault registry.
//!
//! Single process-wide table of the Morpho Blue markets and MetaMorpho vaults
//! the dashboard tracks, keyed by identifier. Resolution is total: identifiers
//! missing from the table resolve to themselves.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Chain a market or vault lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Ethereum,
    Base,
}

impl Network {
    /// Short label used in presentation tables.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ethereum => "ETH",
            Self::Base => "Base",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Price conversion for markets that report reallocatable liquidity in a
/// collateral unit instead of USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceAdjustment {
    /// Market whose collateral price is the multiplier
    pub price_source: &'static str,
    /// Whether Collateral USD is scaled by the same price
    pub scale_collateral_usd: bool,
}

/// Tracked lending market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    /// Market unique key
    pub id: &'static str,
    /// Display name (e.g., "ETH+/eUSD")
    pub name: &'static str,
    pub network: Network,
    pub price_adjustment: Option<PriceAdjustment>,
}

impl Market {
    pub const fn new(id: &'static str, name: &'static str, network: Network) -> Self {
        Self {
            id,
            name,
            network,
            price_adjustment: None,
        }
    }

    pub const fn with_price_adjustment(mut self, adjustment: PriceAdjustment) -> Self {
        self.price_adjustment = Some(adjustment);
        self
    }
}

/// Tracked MetaMorpho vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vault {
    pub address: &'static str,
    pub name: &'static str,
    pub network: Network,
}

// ============================================================================
// Markets
// ============================================================================

pub const ETH_PLUS_EUSD: Market = Market::new(
    "0x3f4d007982a480dd99052c05d811cf6838ce61b2a2be8dc52fca107f783d1f15",
    "ETH+/eUSD",
    Network::Ethereum,
);

pub const WBTC_EUSD: Market = Market::new(
    "0x461da96754b33fec844fc5e5718bf24298a2c832d8216c5ffd17a5230548f01f",
    "WBTC/eUSD",
    Network::Ethereum,
);

pub const WSTETH_EUSD: Market = Market::new(
    "0x6029eea874791e01e2f3ce361f2e08839cd18b1e26eea6243fa3e43fe8f6fa23",
    "wstETH/eUSD",
    Network::Ethereum,
);

/// Reallocatable liquidity is reported in ETH+; priced off ETH+/eUSD.
pub const ETH_PLUS_WETH: Market = Market::new(
    "0x9ec52d7195bafeba7137fa4d707a0f674a04a6d658c9066bcdbebc6d81eb0011",
    "ETH+/WETH",
    Network::Ethereum,
)
.with_price_adjustment(PriceAdjustment {
    price_source: ETH_PLUS_EUSD.id,
    scale_collateral_usd: false,
});

pub const BSDETH_EUSD_BASE: Market = Market::new(
    "0xf9ed1dba3b6ba1ede10e2115a9554e9c52091c9f1b1af21f9e0fecc855ee74bf",
    "bsdETH/eUSD (Base)",
    Network::Base,
);

pub const HYUSD_EUSD_BASE: Market = Market::new(
    "0x3a5bdf0be8d820c1303654b078b14f8fc6d715efaeca56cec150b934bdcbff31",
    "hyUSD/eUSD (Base)",
    Network::Base,
);

pub const CBETH_EUSD_BASE: Market = Market::new(
    "0xb5d424e4af49244b074790f1f2dc9c20df948ce291fc6bcc6b59149ecf91196d",
    "cbETH/eUSD (Base)",
    Network::Base,
);

pub const WSTETH_EUSD_BASE: Market = Market::new(
    "0xce89aeb081d719cd35cb1aafb31239c4dfd9c017b2fec26fc2e9a443461e9aea",
    "wstETH/eUSD (Base)",
    Network::Base,
);

/// Reallocatable liquidity and collateral are reported in bsdETH; priced off
/// bsdETH/eUSD (Base).
pub const BSDETH_WETH: Market = Market::new(
    "0xdf6aa0df4eb647966018f324db97aea09d2a7dde0d3c0a72115e8b20d58ea81f",
    "bsdETH/WETH",
    Network::Base,
)
.with_price_adjustment(PriceAdjustment {
    price_source: BSDETH_EUSD_BASE.id,
    scale_collateral_usd: true,
});

/// All tracked markets.
pub const MARKETS: [Market; 9] = [
    ETH_PLUS_EUSD,
    WBTC_EUSD,
    WSTETH_EUSD,
    ETH_PLUS_WETH,
    BSDETH_EUSD_BASE,
    HYUSD_EUSD_BASE,
    CBETH_EUSD_BASE,
    WSTETH_EUSD_BASE,
    BSDETH_WETH,
];

// ============================================================================
// Vaults
// ============================================================================

pub const GAUNTLET_EUSD_CORE_ETH: Vault = Vault {
    address: "0xbb819D845b573B5D7C538F5b85057160cfb5f313",
    name: "Gauntlet eUSD Core (ETH)",
    network: Network::Ethereum,
};

pub const GAUNTLET_EUSD_CORE_BASE: Vault = Vault {
    address: "0xc080f56504e0278828A403269DB945F6c6D6E014",
    name: "Gauntlet eUSD Core (Base)",
    network: Network::Base,
};

/// All tracked vaults.
pub const VAULTS: [Vault; 2] = [GAUNTLET_EUSD_CORE_ETH, GAUNTLET_EUSD_CORE_BASE];

/// Global registry built from [`MARKETS`] and [`VAULTS`].
pub static REGISTRY: LazyLock<MarketRegistry> = LazyLock::new(MarketRegistry::new);

/// Identifier → market lookup.
#[derive(Debug, Clone)]
pub struct MarketRegistry {
    markets: Vec<Market>,
    vaults: Vec<Vault>,
    by_id: HashMap<&'static str, usize>,
    by_name: HashMap<&'static str, usize>,
}

impl MarketRegistry {
    /// Build the registry of all built-in markets and vaults.
    pub fn new() -> Self {
        Self::from_parts(MARKETS, VAULTS)
    }

    /// Build a registry from explicit markets and vaults.
    ///
    /// Later entries win when an identifier is repeated.
    pub fn from_parts(
        markets: impl IntoIterator<Item = Market>,
        vaults: impl IntoIterator<Item = Vault>,
    ) -> Self {
        let markets: Vec<Market> = markets.into_iter().collect();
        let by_id = markets
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id, i))
            .collect();
        let by_name = markets
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name, i))
            .collect();

        Self {
            markets,
            vaults: vaults.into_iter().collect(),
            by_id,
            by_name,
        }
    }

    /// Display name for an identifier, or the identifier itself when unknown.
    pub fn resolve<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map_or(id, |m| m.name)
    }

    /// Get a market by identifier.
    pub fn get(&self, id: &str) -> Option<&Market> {
        self.by_id.get(id).map(|&i| &self.markets[i])
    }

    /// Get a market by display name.
    pub fn by_name(&self, name: &str) -> Option<&Market> {
        self.by_name.get(name).map(|&i| &self.markets[i])
    }

    /// Network of a market or vault display name.
    pub fn network_of(&self, name: &str) -> Option<Network> {
        self.by_name(name).map(|m| m.network).or_else(|| {
            self.vaults
                .iter()
                .find(|v| v.name == name)
                .map(|v| v.network)
        })
    }

    /// Identifiers of every tracked market, in registry order.
    pub fn market_ids(&self) -> Vec<String> {
        self.markets.iter().map(|m| m.id.to_string()).collect()
    }

    /// Identifiers whose collateral price some other market depends on.
    pub fn price_sources(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.markets
            .iter()
            .filter_map(|m| m.price_adjustment)
            .map(|a| a.price_source)
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.iter()
    }

    pub fn vaults(&self) -> impl Iterator<Item = &Vault> {
        self.vaults.iter()
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

impl Default for MarketRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_market() {
        assert_eq!(REGISTRY.resolve(ETH_PLUS_EUSD.id), "ETH+/eUSD");
        assert_eq!(REGISTRY.resolve(BSDETH_WETH.id), "bsdETH/WETH");
    }

    #[test]
    fn test_resolve_unknown_is_identity() {
        let id = "0x0000000000000000000000000000000000000000000000000000000000000001";
        assert_eq!(REGISTRY.resolve(id), id);
        assert_eq!(REGISTRY.resolve(""), "");
        assert_eq!(REGISTRY.resolve("B"), "B");
    }

    #[test]
    fn test_registry_is_one_to_one() {
        let registry = MarketRegistry::new();
        assert_eq!(registry.len(), MARKETS.len());

        let mut names: Vec<_> = registry.markets().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), MARKETS.len());
    }

    #[test]
    fn test_price_sources_are_tracked_markets() {
        let sources: Vec<_> = REGISTRY.price_sources().collect();
        assert_eq!(sources, vec![ETH_PLUS_EUSD.id, BSDETH_EUSD_BASE.id]);
        for source in sources {
            assert!(REGISTRY.get(source).is_some());
        }
    }

    #[test]
    fn test_network_lookup() {
        assert_eq!(REGISTRY.network_of("WBTC/eUSD"), Some(Network::Ethereum));
        assert_eq!(REGISTRY.network_of("cbETH/eUSD (Base)"), Some(Network::Base));
        assert_eq!(
            REGISTRY.network_of("Gauntlet eUSD Core (Base)"),
            Some(Network::Base)
        );
        assert_eq!(REGISTRY.network_of("unknown"), None);
    }

    #[test]
    fn test_custom_registry() {
        let registry = MarketRegistry::from_parts(
            [Market::new("A", "MarketA", Network::Ethereum)],
            Vec::<Vault>::new(),
        );
        assert_eq!(registry.resolve("A"), "MarketA");
        assert_eq!(registry.resolve("B"), "B");
        assert_eq!(registry.vaults().count(), 0);
    }
}
