//! The closed set of collection analytics endpoints and their parameter rules.
//!
//! Each endpoint is one row of [`ENDPOINTS`]: which query parameters it
//! recognizes, which `sort_by` keys it accepts, and which defaults apply.
//! The normalizer is a single generic function over this table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default chain when the caller does not name one.
pub const DEFAULT_BLOCKCHAIN: &str = "ethereum";

/// One of the eleven collection analytics endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointName {
    /// Whale activity (large holders and traders)
    Whales,
    /// Suspected wash trading
    Washtrade,
    /// Market cap and price scores
    Scores,
    /// Collection metadata
    Metadata,
    /// Token ownership
    Owner,
    /// Sales, volume and transfer analytics
    Analytics,
    /// Trader counts and ratios
    Traders,
    /// Collection profile and health scores
    Profile,
    /// Collection categories
    Categories,
    /// Trait breakdown
    Traits,
    /// Holder counts
    Holders,
}

impl EndpointName {
    /// All endpoints, in routing-prompt order
    pub const ALL: [Self; 11] = [
        Self::Whales,
        Self::Washtrade,
        Self::Scores,
        Self::Metadata,
        Self::Owner,
        Self::Analytics,
        Self::Traders,
        Self::Profile,
        Self::Categories,
        Self::Traits,
        Self::Holders,
    ];

    /// Path segment under `/nft/collection/`
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Whales => "whales",
            Self::Washtrade => "washtrade",
            Self::Scores => "scores",
            Self::Metadata => "metadata",
            Self::Owner => "owner",
            Self::Analytics => "analytics",
            Self::Traders => "traders",
            Self::Profile => "profile",
            Self::Categories => "categories",
            Self::Traits => "traits",
            Self::Holders => "holders",
        }
    }

    /// Static parameter rules for this endpoint
    #[must_use]
    pub fn spec(self) -> &'static EndpointSpec {
        // ENDPOINTS is declared in the same order as ALL
        &ENDPOINTS[self as usize]
    }
}

impl fmt::Display for EndpointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEndpoint(pub String);

impl fmt::Display for UnknownEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown endpoint '{}'", self.0)
    }
}

impl std::error::Error for UnknownEndpoint {}

impl FromStr for EndpointName {
    type Err = UnknownEndpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| UnknownEndpoint(s.to_string()))
    }
}

/// Parameter rules for one endpoint.
#[derive(Debug, Serialize)]
pub struct EndpointSpec {
    /// Endpoint this row describes
    pub name: EndpointName,
    /// Human title used in the routing prompt
    pub title: &'static str,
    /// Recognized query parameters, in transmission order. `sort_by` is
    /// handled separately through `sort_by`.
    pub params: &'static [&'static str],
    /// Accepted `sort_by` values; empty means the endpoint takes no sort key
    pub sort_by: &'static [&'static str],
    /// Per-endpoint defaults applied when a parameter is missing or empty
    pub defaults: &'static [(&'static str, &'static str)],
}

impl EndpointSpec {
    /// Whether `value` is an accepted sort key for this endpoint
    #[must_use]
    pub fn allows_sort_by(&self, value: &str) -> bool {
        self.sort_by.contains(&value)
    }

    /// Default for `param`, if any
    #[must_use]
    pub fn default_for(&self, param: &str) -> Option<&'static str> {
        if param == "blockchain" {
            return Some(DEFAULT_BLOCKCHAIN);
        }
        self.defaults
            .iter()
            .find(|(k, _)| *k == param)
            .map(|(_, v)| *v)
    }
}

const FILTERED: &[&str] = &["blockchain", "contract_address", "time_range"];
const PAGED: &[&str] = &[
    "blockchain",
    "contract_address",
    "time_range",
    "offset",
    "limit",
    "sort_order",
];

/// The endpoint table, indexed by `EndpointName as usize`.
pub static ENDPOINTS: [EndpointSpec; 11] = [
    EndpointSpec {
        name: EndpointName::Whales,
        title: "Collection Whales",
        params: PAGED,
        sort_by: &[
            "nft_count",
            "mint_count",
            "mint_volume",
            "mint_whales",
            "unique_wallets",
            "unique_mint_wallets",
            "unique_buy_wallets",
            "unique_sell_wallets",
            "total_mint_volume",
            "total_sale_volume",
            "buy_count",
            "buy_volume",
            "buy_whales",
            "sell_count",
            "sell_volume",
            "sell_whales",
            "whale_holders",
        ],
        defaults: &[("offset", "0"), ("limit", "30"), ("sort_order", "desc")],
    },
    EndpointSpec {
        name: EndpointName::Washtrade,
        title: "Collection Washtrade",
        params: FILTERED,
        sort_by: &[
            "washtrade_assets",
            "washtrade_assets_change",
            "washtrade_suspect_sales",
            "washtrade_suspect_sales_change",
            "washtrade_volume",
            "washtrade_volume_change",
            "washtrade_wallets",
            "washtrade_wallets_change",
        ],
        defaults: &[],
    },
    EndpointSpec {
        name: EndpointName::Scores,
        title: "Collection Scores",
        params: FILTERED,
        sort_by: &[
            "marketcap",
            "marketcap_change",
            "price_avg",
            "price_avg_change",
            "price_ceiling",
            "minting_revenue",
            "royalty_price",
        ],
        defaults: &[],
    },
    EndpointSpec {
        name: EndpointName::Metadata,
        title: "Collection Metadata",
        params: &["blockchain", "contract_address", "offset", "limit"],
        sort_by: &[],
        defaults: &[],
    },
    EndpointSpec {
        name: EndpointName::Owner,
        title: "Collection Owner",
        params: PAGED,
        sort_by: &["acquired_date", "quantity"],
        defaults: &[],
    },
    EndpointSpec {
        name: EndpointName::Analytics,
        title: "Collection Analytics",
        params: FILTERED,
        sort_by: &[
            "assets",
            "assets_change",
            "floor_price_usd",
            "floor_price_native",
            "sales",
            "sales_change",
            "volume",
            "volume_change",
            "transactions",
            "transactions_change",
            "transfers",
            "transfers_change",
        ],
        defaults: &[],
    },
    EndpointSpec {
        name: EndpointName::Traders,
        title: "Collection Traders",
        params: FILTERED,
        sort_by: &[
            "traders",
            "traders_change",
            "traders_ratio",
            "traders_ratio_change",
            "traders_buyers",
            "traders_buyers_change",
            "traders_sellers",
            "traders_sellers_change",
        ],
        defaults: &[],
    },
    EndpointSpec {
        name: EndpointName::Profile,
        title: "Collection Profile",
        params: PAGED,
        sort_by: &[
            "fear_and_greed_index",
            "washtrade_index",
            "metadata_score",
            "liquidity_score",
            "market_dominance_score",
            "token_distribution_score",
            "collection_score",
            "holder_metrics_score",
            "diamond_hands",
            "profitable_volume",
            "loss_making_volume",
            "profitable_trades",
            "loss_making_trades",
            "zero_profit_trades",
            "profitable_trades_percentage",
            "avg_profitable_trades",
            "loss_making_trades_percentage",
            "avg_loss_making_trades",
        ],
        defaults: &[],
    },
    EndpointSpec {
        name: EndpointName::Categories,
        title: "Collection Categories",
        params: &["blockchain", "contract_address"],
        sort_by: &[],
        defaults: &[],
    },
    EndpointSpec {
        name: EndpointName::Traits,
        title: "Collection Traits",
        params: &[
            "blockchain",
            "contract_address",
            "offset",
            "limit",
            "sort_order",
        ],
        sort_by: &["trait_type"],
        defaults: &[],
    },
    EndpointSpec {
        name: EndpointName::Holders,
        title: "Collection Holders",
        params: FILTERED,
        sort_by: &["holders", "holders_change"],
        defaults: &[],
    },
];
