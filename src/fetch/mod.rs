//! Boundary to content fetching: a file's declared contents become fetch
//! operations, each of which writes or appends to the target.

mod data_url;
mod fetcher;
mod operation;

pub use fetcher::{FetchError, Fetcher, LocalFetcher};
pub use operation::FetchOperation;
