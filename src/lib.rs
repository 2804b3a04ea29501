pub mod bootstrap;
pub mod collect;
pub mod config;
pub mod detail;
pub mod error;
pub mod logging;
pub mod model;
pub mod output;
pub mod scrape;
pub mod session;
pub mod validate;

pub use error::{Result, ScrapeError};
pub use model::{DateTime, EventRecord, PriceTier};
