//! Insight orchestration over the facility × product inventory.
//!
//! [`InsightEngine`] always runs the rule engine, enriches results with any
//! registered models, and serves filtered, ranked queries from a snapshot
//! that is regenerated wholesale once its TTL lapses.

pub mod cache;
pub mod engine;
pub mod filter;
pub mod record;
pub mod source;

pub use cache::{InsightCache, InsightSnapshot};
pub use engine::{AggregatedPrediction, ConsumptionForecast, InsightEngine};
pub use filter::{rank, InsightFilter, InsightPage};
pub use record::{InsightRecord, ALL_PRODUCTS_ID, ALL_PRODUCTS_NAME};
pub use source::{Facility, InventorySource, Product, StaticInventory, StockRecord};
