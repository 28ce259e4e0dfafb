//! Parsed documents and views over them.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::ops::Range;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::{trace, warn};

use crate::block::{Block, Header};
use crate::data;
use crate::error::DocumentError;
use crate::html_renderer::HtmlRenderer;
use crate::options::{DataOptions, HtmlOptions};
use crate::scanner::scan;
use crate::stream::EventStream;

/// An immutable parsed document, or a section of one.
///
/// Sections returned by [`Document::part`] share the parsed blocks of the
/// document they came from. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Document {
    blocks: Arc<[Block]>,
    range: Range<usize>,
    parts: OnceLock<HashMap<String, PartEntry>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PartEntry {
    position: usize,
    level: usize,
}

impl Document {
    pub fn new(input: &str) -> Self {
        let blocks: Arc<[Block]> = scan(input).into();
        let range = 0..blocks.len();
        Self {
            blocks,
            range,
            parts: OnceLock::new(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let input = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(&input))
    }

    /// A document without content, returned when a part is not found.
    pub fn empty() -> Self {
        Self {
            blocks: Arc::from(Vec::new()),
            range: 0..0,
            parts: OnceLock::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks[self.range.clone()]
    }

    /// The flat, leveled event stream for this document.
    pub fn stream(&self) -> EventStream {
        EventStream::from_blocks(self.blocks())
    }

    pub fn html(&self) -> String {
        self.html_with(&HtmlOptions::default())
    }

    pub fn html_with(&self, options: &HtmlOptions) -> String {
        match self.write_html(Vec::new(), options) {
            Ok(buf) => String::from_utf8(buf)
                .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned()),
            Err(err) => {
                warn!(error = %err, "html rendering into memory failed");
                String::new()
            }
        }
    }

    /// Renders HTML straight into `writer` and hands it back.
    pub fn write_html<W: Write>(&self, writer: W, options: &HtmlOptions) -> io::Result<W> {
        HtmlRenderer::new(writer, options).render(self.blocks())
    }

    pub fn data(&self, options: &DataOptions) -> Value {
        data::project(self.blocks(), options)
    }

    /// Header keys only.
    pub fn outline(&self) -> Value {
        self.data(&DataOptions::outline())
    }

    pub fn headers(&self) -> Vec<&Header> {
        self.blocks().iter().filter_map(Block::as_header).collect()
    }

    /// Extracts the section under the header at the dotted key `path`, e.g.
    /// `"intro.setup"`.
    ///
    /// The section runs from the header up to the next header at the same or
    /// a shallower level. An unknown path gives [`Document::empty`].
    pub fn part(&self, path: &str) -> Document {
        let Some(entry) = self.parts().get(path.trim()).copied() else {
            return Document::empty();
        };

        let end = self.blocks[entry.position + 1..self.range.end]
            .iter()
            .position(|block| {
                block
                    .as_header()
                    .is_some_and(|header| header.level <= entry.level)
            })
            .map_or(self.range.end, |offset| entry.position + 1 + offset);

        Document {
            blocks: Arc::clone(&self.blocks),
            range: entry.position..end,
            parts: OnceLock::new(),
        }
    }

    /// Checks that every header path of `reference` also exists here.
    ///
    /// Returns whether the structure matches and one missing dotted path per
    /// line otherwise. Sibling order does not matter.
    pub fn compare_structure(&self, reference: &Document) -> (bool, String) {
        let missing = data::missing_paths(&reference.outline(), &self.outline());
        (missing.is_empty(), missing.join("\n"))
    }

    fn parts(&self) -> &HashMap<String, PartEntry> {
        self.parts.get_or_init(|| {
            let mut index = HashMap::new();
            let mut trail: Vec<(usize, &str)> = Vec::new();

            for (offset, block) in self.blocks().iter().enumerate() {
                let Some(header) = block.as_header().filter(|h| h.level > 0) else {
                    continue;
                };
                while trail.last().is_some_and(|&(level, _)| level >= header.level) {
                    trail.pop();
                }
                trail.push((header.level, header.key.as_str()));

                let path = trail
                    .iter()
                    .map(|&(_, key)| key)
                    .collect::<Vec<_>>()
                    .join(".");
                index.entry(path).or_insert(PartEntry {
                    position: self.range.start + offset,
                    level: header.level,
                });
            }

            trace!(parts = index.len(), "built parts index");
            index
        })
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}
