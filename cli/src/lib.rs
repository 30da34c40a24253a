//! Builds a deduplicated CSV of Battlefield 4 player statistics from the
//! players currently online.

pub mod api;
pub mod config;
pub mod csv;
pub mod cycle;
pub mod dataset;
pub mod error;
pub mod merge;
pub mod normalize;
pub mod pager;
pub mod record;

pub use error::{Result, ScrapeError};
