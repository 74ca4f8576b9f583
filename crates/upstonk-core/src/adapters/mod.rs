mod alphavantage;
mod catalog;
mod etfcom;
mod jse;
mod upstream;
mod yahoo;

pub use alphavantage::{AlphaVantageProvider, DEFAULT_CALLS_PER_MINUTE, DEFAULT_MAX_TICKERS};
pub use catalog::{builtin_products, CatalogProvider};
pub use etfcom::EtfComProvider;
pub use jse::JseListingProvider;
pub use yahoo::YahooQuoteProvider;
