use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_name: String,
    pub date_time: DateTime,
    /// Detail page URL; the natural key of a record.
    pub event_url: String,
    pub location: String,
    pub prices: Vec<PriceTier>,
}

/// Schedule strings exactly as the search API reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTime {
    pub start_date: String,
    pub start_time: String,
    pub end_date: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTier {
    pub name: String,
    pub price: String,
}
