pub mod crawler;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod location;
pub mod result;
pub mod worker;

pub use crawler::{Crawler, ResultCallback};
pub use error::ScanError;
pub use extractor::{HtmlLinkExtractor, LinkExtractor};
pub use fetcher::{Fetcher, HttpFetcher, StaticFetcher};
pub use location::{BlockList, normalize};
pub use result::{CrawlEdge, CrawlFailure, CrawlOutcome, CrawlResult};
pub use worker::ProgressCallback;

pub use tokio_util::sync::CancellationToken;
