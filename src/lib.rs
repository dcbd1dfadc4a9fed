//! # flibusta-fetch
//!
//! A client for an online ebook catalog reachable through two independent
//! access paths: rendered HTML pages and an OPDS feed.
//!
//! ## Architecture
//!
//! - [`models`]: Books, authors, search results and downloaded files
//! - [`sources`]: The HTML and feed sources behind one trait, and the
//!   fallback orchestration between them
//! - [`catalog`]: The [`Catalog`] facade used by front ends
//! - [`utils`]: HTTP transport, normalization and download resolution
//! - [`config`]: Configuration management
//!
//! ```no_run
//! use flibusta_fetch::{Catalog, Config};
//!
//! # async fn run() -> Result<(), flibusta_fetch::sources::SourceError> {
//! let catalog = Catalog::new(&Config::default())?;
//! if let Some(result) = catalog.search_books("Пикник на обочине", 0, None).await {
//!     for book in &result.items {
//!         println!("{} - {}", book.title, book.author_names());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use catalog::{Catalog, ConnectionReport};
pub use config::Config;
pub use models::{Author, Book, SearchResult, SourceKind};
pub use sources::{CatalogSource, StatusUpdate};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
