//! Weave Content Provider
//!
//! HTTP client for the catalog that blend pools live in.
//!
//! # Features
//!
//! - **Pool listings**: Follows `next` links until the full item list is read
//! - **Null entries**: Listing entries whose item is missing are skipped
//! - **Bearer auth**: The access token can be swapped at runtime
//!
//! # Example
//!
//! ```ignore
//! use weave_core::{ContentProvider, PoolId};
//! use weave_provider::{HttpContentProvider, ProviderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProviderConfig::with_token("https://api.example.com/v1", "token");
//!     let provider = HttpContentProvider::new(config)?;
//!
//!     let items = provider.pool_items(&PoolId::new("37i9dQZF1DX")).await?;
//!     println!("Pool has {} items", items.len());
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::HttpContentProvider;
pub use error::{ProviderError, Result};
pub use types::ProviderConfig;
