//! Inventory inputs consumed by the insight engine.
//!
//! The engine never talks to an inventory system itself; callers hand it an
//! [`InventorySource`] holding plain facility, product and stock data.

use crate::core::HistoricalDataPoint;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A health facility with cold-chain storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    pub id: String,
    pub name: String,
    pub state: String,
    pub lga: String,
    /// Cold-chain storage capacity in doses.
    pub cold_chain_capacity: f64,
    /// Doses received per shipment cycle.
    #[serde(default)]
    pub avg_incoming_shipments: f64,
    #[serde(default)]
    pub current_temperature: Option<f64>,
    /// Falls back to the engine default when absent.
    #[serde(default)]
    pub max_safe_temperature: Option<f64>,
}

impl Facility {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        state: impl Into<String>,
        lga: impl Into<String>,
        cold_chain_capacity: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state: state.into(),
            lga: lga.into(),
            cold_chain_capacity,
            avg_incoming_shipments: 0.0,
            current_temperature: None,
            max_safe_temperature: None,
        }
    }

    pub fn with_incoming_shipments(mut self, doses: f64) -> Self {
        self.avg_incoming_shipments = doses;
        self
    }

    pub fn with_temperature(mut self, current: f64, max_safe: Option<f64>) -> Self {
        self.current_temperature = Some(current);
        self.max_safe_temperature = max_safe;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Stock position of one product at one facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    pub current_stock: f64,
    #[serde(default)]
    pub min_stock_threshold: f64,
    #[serde(default)]
    pub expiring_doses: f64,
    #[serde(default)]
    pub days_until_expiry: f64,
    /// Reported consumption rate; derived from `history` when absent.
    #[serde(default)]
    pub avg_daily_consumption: Option<f64>,
    #[serde(default)]
    pub history: Vec<HistoricalDataPoint>,
}

impl StockRecord {
    pub fn new(current_stock: f64) -> Self {
        Self {
            current_stock,
            min_stock_threshold: 0.0,
            expiring_doses: 0.0,
            days_until_expiry: 0.0,
            avg_daily_consumption: None,
            history: Vec::new(),
        }
    }

    pub fn with_consumption(mut self, per_day: f64) -> Self {
        self.avg_daily_consumption = Some(per_day);
        self
    }

    pub fn with_min_threshold(mut self, threshold: f64) -> Self {
        self.min_stock_threshold = threshold;
        self
    }

    pub fn with_expiring(mut self, doses: f64, days_until_expiry: f64) -> Self {
        self.expiring_doses = doses;
        self.days_until_expiry = days_until_expiry;
        self
    }

    pub fn with_history(mut self, history: Vec<HistoricalDataPoint>) -> Self {
        self.history = history;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("current_stock", self.current_stock),
            ("min_stock_threshold", self.min_stock_threshold),
            ("expiring_doses", self.expiring_doses),
            ("days_until_expiry", self.days_until_expiry),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::invalid(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if let Some(rate) = self.avg_daily_consumption {
            if !rate.is_finite() || rate < 0.0 {
                return Err(EngineError::invalid(format!(
                    "avg_daily_consumption must be non-negative, got {}",
                    rate
                )));
            }
        }
        Ok(())
    }
}

/// Provider of facility, product and stock data.
pub trait InventorySource: Send + Sync {
    fn facilities(&self) -> Result<Vec<Facility>>;

    fn products(&self) -> Result<Vec<Product>>;

    /// Stock of `product_id` at `facility_id`; `None` if the facility does not
    /// carry the product.
    fn stock(&self, facility_id: &str, product_id: &str) -> Result<Option<StockRecord>>;
}

/// In-memory inventory, built up front.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    facilities: Vec<Facility>,
    products: Vec<Product>,
    stock: HashMap<(String, String), StockRecord>,
}

impl StaticInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_facility(mut self, facility: Facility) -> Self {
        self.facilities.push(facility);
        self
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.products.push(product);
        self
    }

    pub fn with_stock(
        mut self,
        facility_id: impl Into<String>,
        product_id: impl Into<String>,
        record: StockRecord,
    ) -> Self {
        self.stock
            .insert((facility_id.into(), product_id.into()), record);
        self
    }
}

impl InventorySource for StaticInventory {
    fn facilities(&self) -> Result<Vec<Facility>> {
        Ok(self.facilities.clone())
    }

    fn products(&self) -> Result<Vec<Product>> {
        Ok(self.products.clone())
    }

    fn stock(&self, facility_id: &str, product_id: &str) -> Result<Option<StockRecord>> {
        Ok(self
            .stock
            .get(&(facility_id.to_string(), product_id.to_string()))
            .cloned())
    }
}
