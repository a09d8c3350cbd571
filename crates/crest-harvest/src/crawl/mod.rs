//! Barrier-synchronized crawl that discovers entities and resolves each
//! one's asset URL through two linked pages.

pub mod collector;
pub mod extract;
pub mod fetcher;
pub mod pipeline;
pub mod request;

pub use collector::{Collector, CrawlSummary};
pub use fetcher::{HttpFetcher, PageFetcher};
pub use pipeline::{CrawlReport, Crawler};
pub use request::{CorrelationToken, Request, Response};
