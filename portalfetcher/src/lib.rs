pub mod client;
pub mod error;
pub mod mapper;
pub mod models;

pub use crate::client::{HttpBackend, ReqwestBlobFetcher};
pub use crate::error::FetcherError;
