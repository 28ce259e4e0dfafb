use serde::Serialize;

/// A block-level element recognised by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    /// Plain paragraph.
    Paragraph { spans: Vec<Inline> },
    /// `>` block quote.
    Quote { spans: Vec<Inline> },
    /// `#` header or `!` title.
    Header(Header),
    /// `-` or `+` list, with all of its nested items.
    List(List),
    /// `|` table or `.csv` table.
    Table(Table),
    /// Fenced code block.
    Code { lang: String, lines: Vec<String> },
    /// Raw `{ ... }` data block, kept verbatim.
    Data { content: String },
    /// `.name args` command line.
    Command { name: String, args: Vec<String> },
}

/// Header metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    /// 0 for the title, 1.. for `#`, `##`, ...
    pub level: usize,
    /// Display text with annotations removed.
    pub text: String,
    pub spans: Vec<Inline>,
    /// Normalized key, or the explicit `{#key}`.
    pub key: String,
    /// Explicit `{!type}` annotation, empty when absent.
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Unordered,
    Ordered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct List {
    pub kind: ListKind,
    pub items: Vec<ListItem>,
}

/// One list line. Levels start at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub level: usize,
    pub text: String,
    pub key: String,
}

/// Table rows plus the orientation flags that decide which cells are keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub rows: Vec<Vec<Cell>>,
    /// First row holds the column keys.
    pub hrow: bool,
    /// First column holds the row keys.
    pub hcol: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Inline run inside paragraph, quote and header text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inline {
    Text { text: String },
    /// `\name(arg, "quoted, arg")`. `name` is empty for `\(...)`.
    Escape { name: String, args: Vec<String> },
}

impl Block {
    /// Sentinel used for this block in the flat event stream.
    pub fn sentinel(&self) -> &'static str {
        match self {
            Block::Paragraph { .. } => "!p",
            Block::Quote { .. } => "!q",
            Block::Header(_) => "!h",
            Block::List(list) => match list.kind {
                ListKind::Unordered => "!ul",
                ListKind::Ordered => "!ol",
            },
            Block::Table(_) => "!tb",
            Block::Code { .. } => "!pre",
            Block::Data { .. } => "!g",
            Block::Command { .. } => "!x",
        }
    }

    pub fn as_header(&self) -> Option<&Header> {
        match self {
            Block::Header(header) => Some(header),
            _ => None,
        }
    }
}

impl ListKind {
    pub fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

impl Table {
    /// CSS class describing the orientation, if any.
    pub fn class(&self) -> Option<&'static str> {
        match (self.hrow, self.hcol) {
            (true, true) => Some("hboth"),
            (true, false) => Some("hrow"),
            (false, true) => Some("hcol"),
            (false, false) => None,
        }
    }

    /// Whether the cell at (`row`, `col`) is a header cell.
    pub fn is_header_cell(&self, row: usize, col: usize) -> bool {
        (self.hrow && row == 0) || (self.hcol && col == 0)
    }
}

impl Cell {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            key: None,
        }
    }

    /// Key used in the data projection: the explicit key when set, the text otherwise.
    pub fn data_key(&self) -> &str {
        match self.key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => &self.text,
        }
    }
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text { text: text.into() }
    }
}
