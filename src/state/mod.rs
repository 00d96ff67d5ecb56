//! State module for tracking crawl progress
//!
//! A crawl call moves through a small, fixed set of phases. `CrawlPhase`
//! encodes them and rejects transitions outside that shape.

mod crawl_phase;

pub use crawl_phase::CrawlPhase;
