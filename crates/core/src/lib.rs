//! # docflow-core
//!
//! A line-oriented markdown document engine.
//!
//! Input is scanned once into tagged [`Block`]s. Everything else is a
//! projection of those blocks:
//!
//! - [`Document::html`] renders HTML with hierarchical anchors and optional
//!   header numbering.
//! - [`Document::data`] builds a JSON tree where headers nest by level and
//!   tables become keyed values.
//! - [`Document::stream`] flattens the blocks into the leveled
//!   [`EventStream`] used by tools that decode entries positionally.
//! - [`Document::part`] extracts the section under a dotted header path and
//!   [`Document::compare_structure`] checks one document's outline against
//!   another's.
//!
//! Rendered HTML can be post-processed chunk by chunk through a
//! [`StreamingRewriter`].

pub mod block;
pub mod csv;
mod data;
mod document;
mod error;
mod html_renderer;
pub mod inline;
pub mod normalize;
mod options;
mod scanner;
mod stream;
mod streaming_rewriter;

pub use crate::block::{Block, Cell, Header, Inline, List, ListItem, ListKind, Table};
pub use crate::document::Document;
pub use crate::error::{CsvError, DocumentError};
pub use crate::html_renderer::HtmlRenderer;
pub use crate::normalize::normalize;
pub use crate::options::{DataOptions, HtmlOptions};
pub use crate::scanner::scan;
pub use crate::stream::{Entry, EventStream, Node};
pub use crate::streaming_rewriter::{RewriteOptions, StreamingRewriter};

/// Renders `input` to HTML with default options.
pub fn render(input: &str) -> String {
    Document::new(input).html()
}

/// Crate version, as reported by the CLI and the wasm bindings.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
