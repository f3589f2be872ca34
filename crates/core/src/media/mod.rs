//! Remote media referenced from templates.
//!
//! `MediaResolver` finds `img:<url>` markers, downloads each resource into the
//! workspace as `img<N>.png` through a `MediaFetcher`, and rewrites the
//! marker to that local name.

mod error;
mod fetcher;
mod resolver;

pub use error::MediaError;
pub use fetcher::{HttpMediaFetcher, MediaFetcher};
pub use resolver::{media_file_name, MediaFailure, MediaReport, MediaResolver, ResolvedTemplate};
