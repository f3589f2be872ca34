//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external-facing traits,
//! so the admission and generation flow can be exercised without TeX Live,
//! pdftk, ghostscript or network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use pdfsmith_core::testing::{MockFailure, MockMediaFetcher, MockStep, MockToolchain};
//!
//! let toolchain = MockToolchain::new();
//! toolchain.set_failure(MockStep::Optimize, MockFailure::Exit(1)).await;
//!
//! let fetcher = MockMediaFetcher::new();
//! fetcher.fail_url("https://example.com/broken.png").await;
//! ```

mod mock_media_fetcher;
mod mock_toolchain;

pub use mock_media_fetcher::MockMediaFetcher;
pub use mock_toolchain::{MockFailure, MockStep, MockToolchain};
