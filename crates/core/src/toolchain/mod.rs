//! External typesetting toolchain.
//!
//! The `Toolchain` trait covers the four process invocations a generation
//! needs: typesetting passes, metadata dump, optimization and metadata
//! restore. `LatexToolchain` drives pdflatex, pdftk and ghostscript with
//! fixed argument shapes.

mod config;
mod error;
mod latex;
mod traits;
mod types;

pub use config::ToolchainConfig;
pub use error::ToolchainError;
pub use latex::LatexToolchain;
pub use traits::Toolchain;
pub use types::ToolRun;
