pub mod cnb_parser;
pub mod fetcher;

pub use fetcher::{DocumentFetcher, HttpFetcher};
