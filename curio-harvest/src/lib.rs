pub mod error;
pub mod fetch;
pub mod harvest;
pub mod paginate;
pub mod product;

pub use error::HarvestError;
pub use fetch::{BrowserSession, NextControl, PageDriver, StaticFetcher, requires_javascript};
pub use paginate::{PAGE_BUDGET, drive_listing};
pub use product::Product;
