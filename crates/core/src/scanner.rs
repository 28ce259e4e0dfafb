//! Block scanner.
//!
//! Dispatches on the first character of each line and turns the input into
//! a list of [`Block`]s. Every block function consumes at least the line it
//! was dispatched on, so scanning always terminates.

use tracing::{debug, trace};

use crate::block::{Block, Cell, Header, List, ListItem, ListKind, Table};
use crate::csv;
use crate::inline::parse_spans;
use crate::normalize::{split_anchor, split_annotations};

/// Scans a whole document.
pub fn scan(input: &str) -> Vec<Block> {
    let mut scanner = Scanner::new(input);
    while scanner.block() {}
    trace!(blocks = scanner.blocks.len(), "scanned document");
    scanner.blocks
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    blocks: Vec<Block>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            blocks: Vec::new(),
        }
    }

    /// Scans one block. Returns false at end of input.
    fn block(&mut self) -> bool {
        self.skip_blank_lines();
        let Some(line) = self.peek_line() else {
            return false;
        };

        match line.as_bytes()[0] {
            b'#' => self.header(line),
            b'!' if line.starts_with("! ") => self.header(line),
            b'.' => self.command(line),
            b'>' => self.quote(),
            b'-' => self.list('-', ListKind::Unordered),
            b'+' => self.list('+', ListKind::Ordered),
            b'|' => self.table(),
            b'`' => self.code(line),
            b'{' => self.data(),
            _ => self.paragraph(),
        }
        true
    }

    fn peek_line(&self) -> Option<&'a str> {
        if self.pos >= self.src.len() {
            return None;
        }
        let rest = &self.src[self.pos..];
        let line = rest.find('\n').map_or(rest, |end| &rest[..end]);
        Some(line.strip_suffix('\r').unwrap_or(line))
    }

    fn next_line(&mut self) -> Option<&'a str> {
        let line = self.peek_line()?;
        let rest = &self.src[self.pos..];
        self.pos += rest.find('\n').map_or(rest.len(), |end| end + 1);
        Some(line)
    }

    fn skip_blank_lines(&mut self) {
        while self.peek_line().is_some_and(|line| line.trim().is_empty()) {
            self.next_line();
        }
    }

    /// `# text {!type} {#key}`, or `! title`.
    fn header(&mut self, line: &'a str) {
        let (level, rest) = match line.strip_prefix("! ") {
            Some(rest) => (0, rest),
            None => {
                let hashes = line.bytes().take_while(|&b| b == b'#').count();
                match line[hashes..].strip_prefix(' ') {
                    Some(rest) => (hashes, rest),
                    None => {
                        debug!(line, "header without space, reading as paragraph");
                        return self.paragraph();
                    }
                }
            }
        };
        self.next_line();

        let (key, kind, text) = split_annotations(rest);
        self.blocks.push(Block::Header(Header {
            level,
            spans: parse_spans(&text),
            text,
            key,
            kind,
        }));
    }

    /// `.name args`. `.csv [hmode]` starts a CSV table.
    fn command(&mut self, line: &'a str) {
        self.next_line();
        let mut words = line[1..].split_whitespace();
        let name = words.next().unwrap_or_default().to_string();
        let args: Vec<String> = words.map(str::to_string).collect();

        if name == "csv" {
            let hmode = args.first().map_or("", String::as_str);
            return self.csv_table(hmode);
        }
        if name != "nh" {
            debug!(command = %name, "unknown command kept as block");
        }
        self.blocks.push(Block::Command { name, args });
    }

    fn quote(&mut self) {
        let mut lines = Vec::new();
        while let Some(line) = self.peek_line() {
            let Some(body) = line.strip_prefix('>') else {
                break;
            };
            self.next_line();
            lines.push(body.strip_prefix(' ').unwrap_or(body));
        }

        let text = lines.join("\n");
        let text = text.trim();
        if !text.is_empty() {
            self.blocks.push(Block::Quote {
                spans: parse_spans(text),
            });
        }
    }

    /// Consumes every following line whose first non-blank character is `marker`.
    ///
    /// Indentation is kept as raw columns on a stack: a deeper column opens a
    /// level, a shallower one closes levels back to the matching column.
    fn list(&mut self, marker: char, kind: ListKind) {
        let mut items = Vec::new();
        let mut indents: Vec<usize> = Vec::new();

        while let Some(line) = self.peek_line() {
            let trimmed = line.trim_start();
            let Some(body) = trimmed.strip_prefix(marker) else {
                break;
            };
            self.next_line();

            let indent = line.len() - trimmed.len();
            while indents.len() > 1 && indents.last().is_some_and(|&top| indent < top) {
                indents.pop();
            }
            if indents.last().is_none_or(|&top| indent > top) {
                indents.push(indent);
            }

            let (key, text) = split_anchor(body);
            if text.is_empty() {
                continue;
            }
            items.push(ListItem {
                level: indents.len(),
                text,
                key,
            });
        }

        if !items.is_empty() {
            self.blocks.push(Block::List(List { kind, items }));
        }
    }

    /// `|`-delimited table. `||` on the first row marks a key column, a
    /// `---` separator line marks a key row.
    fn table(&mut self) {
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut hrow = false;
        let mut hcol = false;

        while let Some(line) = self.peek_line() {
            let Some(body) = line.strip_prefix('|') else {
                break;
            };
            self.next_line();

            let body = match body.strip_prefix('|') {
                Some(body) => {
                    if rows.is_empty() {
                        hcol = true;
                    }
                    body
                }
                None => body,
            };
            if is_separator(body) {
                hrow = true;
                continue;
            }

            let body = body.trim();
            let body = body.strip_suffix('|').unwrap_or(body);
            let cells: Vec<String> = body.split('|').map(|cell| cell.trim().to_string()).collect();
            if cells.iter().all(String::is_empty) {
                continue;
            }
            rows.push(cells);
        }

        if let Some(table) = build_table(rows, hrow, hcol) {
            self.blocks.push(Block::Table(table));
        }
    }

    /// Lines after `.csv` up to a blank line. `#` lines are comments.
    fn csv_table(&mut self, hmode: &str) {
        let mut rows = Vec::new();
        while let Some(line) = self.peek_line() {
            let line = line.trim();
            if line.is_empty() {
                break;
            }
            self.next_line();
            if line.starts_with('#') {
                continue;
            }
            let cells = csv::split(line);
            if cells.iter().all(String::is_empty) {
                continue;
            }
            rows.push(cells);
        }

        let (hrow, hcol) = match hmode {
            "" | "h" | "hrow" => (true, false),
            "v" | "hcol" => (false, true),
            "hv" | "hboth" => (true, true),
            other => {
                debug!(hmode = other, "unknown csv header mode");
                (false, false)
            }
        };

        if let Some(table) = build_table(rows, hrow, hcol) {
            self.blocks.push(Block::Table(table));
        }
    }

    /// Fenced code. The text after the opening backticks names the language.
    fn code(&mut self, line: &'a str) {
        self.next_line();
        let lang = line.trim_start_matches('`').trim();
        let lang = if lang.is_empty() { "code" } else { lang };

        let mut lines = Vec::new();
        let mut closed = false;
        while let Some(line) = self.next_line() {
            if line.starts_with('`') {
                closed = true;
                break;
            }
            lines.push(line.to_string());
        }
        if !closed {
            debug!(lang, "code fence runs to end of input");
        }

        self.blocks.push(Block::Code {
            lang: lang.to_string(),
            lines,
        });
    }

    /// `{` ... `}`; the opening line is discarded, the rest kept verbatim.
    fn data(&mut self) {
        self.next_line();
        let mut lines = Vec::new();
        while let Some(line) = self.next_line() {
            if line.starts_with('}') {
                break;
            }
            lines.push(line);
        }
        self.blocks.push(Block::Data {
            content: lines.join("\n"),
        });
    }

    /// Lines up to a blank line or a line that starts another block.
    fn paragraph(&mut self) {
        let mut lines = Vec::new();
        while let Some(line) = self.peek_line() {
            if !lines.is_empty() && (line.trim().is_empty() || starts_block(line)) {
                break;
            }
            self.next_line();
            lines.push(line);
        }

        let text = lines.join("\n");
        let text = text.trim();
        if !text.is_empty() {
            self.blocks.push(Block::Paragraph {
                spans: parse_spans(text),
            });
        }
    }
}

fn starts_block(line: &str) -> bool {
    matches!(
        line.as_bytes().first(),
        Some(b'#' | b'.' | b'>' | b'-' | b'+' | b'|' | b'`' | b'{')
    ) || line.starts_with("! ")
}

fn is_separator(body: &str) -> bool {
    body.contains("---")
        && body
            .chars()
            .all(|ch| matches!(ch, '-' | ':' | '|' | ' ' | '\t'))
}

/// Assigns keys: row 0 when either flag is set, column 0 when `hcol` is.
fn build_table(rows: Vec<Vec<String>>, hrow: bool, hcol: bool) -> Option<Table> {
    if rows.is_empty() {
        return None;
    }
    let keyed_header = hrow || hcol;

    let rows = rows
        .into_iter()
        .enumerate()
        .map(|(r, row)| {
            row.into_iter()
                .enumerate()
                .map(|(c, text)| {
                    if hcol && c == 0 {
                        column_key_cell(text)
                    } else if keyed_header && r == 0 {
                        keyed_cell(&text)
                    } else {
                        Cell::plain(text)
                    }
                })
                .collect()
        })
        .collect();

    Some(Table { rows, hrow, hcol })
}

fn keyed_cell(text: &str) -> Cell {
    let (key, text) = split_anchor(text);
    Cell {
        text,
        key: Some(key),
    }
}

/// Key column cells: empty becomes `_`, a leading `_` keeps the rest verbatim.
fn column_key_cell(text: String) -> Cell {
    if text.is_empty() {
        return Cell {
            text,
            key: Some("_".to_string()),
        };
    }
    match text.strip_prefix('_') {
        Some(raw) if !raw.is_empty() => Cell {
            text: raw.to_string(),
            key: Some(raw.to_string()),
        },
        _ => keyed_cell(&text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Inline;
    use pretty_assertions::assert_eq;

    fn header(level: usize, text: &str, key: &str, kind: &str) -> Block {
        Block::Header(Header {
            level,
            text: text.to_string(),
            spans: vec![Inline::text(text)],
            key: key.to_string(),
            kind: kind.to_string(),
        })
    }

    fn paragraph(text: &str) -> Block {
        Block::Paragraph {
            spans: vec![Inline::text(text)],
        }
    }

    fn levels(blocks: &[Block]) -> Vec<usize> {
        match &blocks[0] {
            Block::List(list) => list.items.iter().map(|item| item.level).collect(),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_has_no_blocks() {
        assert!(scan("").is_empty());
        assert!(scan("\n   \n\t\n").is_empty());
    }

    #[test]
    fn headers_with_annotations() {
        assert_eq!(
            scan("! Title\n# Intro {#start}\n## Details {!api}\n"),
            vec![
                header(0, "Title", "title", ""),
                header(1, "Intro", "start", ""),
                header(2, "Details", "details", "api"),
            ]
        );
    }

    #[test]
    fn header_text_ends_at_annotation() {
        assert_eq!(
            scan("# Intro {#start} trailing words
## Setup {!api} tail {#k}
"),
            vec![header(1, "Intro", "start", ""), header(2, "Setup", "k", "api")]
        );
    }

    #[test]
    fn blank_table_rows_are_skipped() {
        let blocks = scan("| a | b |
| |
| 1 | 2 |
");
        let Block::Table(table) = &blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][0].text, "1");

        assert!(scan("| |
|  |  |
").is_empty());
        let blocks = scan(".csv
x, y
 ,
1, 2
");
        let Block::Table(table) = &blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn malformed_header_is_a_paragraph() {
        assert_eq!(scan("#no-space-header\n"), vec![paragraph("#no-space-header")]);
        assert_eq!(scan("###\n"), vec![paragraph("###")]);
    }

    #[test]
    fn paragraph_stops_at_blocks_and_blank_lines() {
        assert_eq!(
            scan("one\ntwo\n\nthree\n# H\n"),
            vec![paragraph("one\ntwo"), paragraph("three"), header(1, "H", "h", "")]
        );
    }

    #[test]
    fn crlf_line_endings() {
        assert_eq!(
            scan("# A\r\ntext\r\n"),
            vec![header(1, "A", "a", ""), paragraph("text")]
        );
    }

    #[test]
    fn list_levels_follow_indentation() {
        assert_eq!(levels(&scan("- a\n  - b\n- c\n")), vec![1, 2, 1]);
        assert_eq!(
            levels(&scan("- a\n  - b\n    - c\n- d\n")),
            vec![1, 2, 3, 1]
        );
        assert_eq!(levels(&scan("- a\n    - b\n  - c\n")), vec![1, 2, 2]);
    }

    #[test]
    fn list_items_keep_task_markers_and_keys() {
        let blocks = scan("+ [x] done {#d1}\n+ [ ] open\n+\n");
        let Block::List(list) = &blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(list.kind, ListKind::Ordered);
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].text, "[x] done");
        assert_eq!(list.items[0].key, "d1");
        assert_eq!(list.items[1].text, "[ ] open");
    }

    #[test]
    fn table_orientation_flags() {
        let blocks = scan("| a | b |\n|---|---|\n| 1 | 2 |\n");
        let Block::Table(table) = &blocks[0] else {
            panic!("expected table");
        };
        assert!(table.hrow);
        assert!(!table.hcol);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][0].key.as_deref(), Some("a"));
        assert_eq!(table.rows[1][0], Cell::plain("1"));

        let blocks = scan("|| k | 1 | 2 |\n");
        let Block::Table(table) = &blocks[0] else {
            panic!("expected table");
        };
        assert!(table.hcol);
        assert!(!table.hrow);
        assert_eq!(table.rows[0].len(), 3);
        assert_eq!(table.rows[0][0].key.as_deref(), Some("k"));
    }

    #[test]
    fn key_column_special_cells() {
        let blocks = scan("|| | x |\n|| _Raw Key | y |\n");
        let Block::Table(table) = &blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(table.rows[0][0].key.as_deref(), Some("_"));
        assert_eq!(table.rows[1][0].key.as_deref(), Some("Raw Key"));
    }

    #[test]
    fn separator_only_table_emits_nothing() {
        assert!(scan("|---|---|\n").is_empty());
    }

    #[test]
    fn csv_command_builds_table() {
        let blocks = scan(".csv hcol\nname, \"a, b\"\n# comment\nx, 1\n\nafter\n");
        let Block::Table(table) = &blocks[0] else {
            panic!("expected table");
        };
        assert!(table.hcol);
        assert_eq!(table.rows[0][1].text, "a, b");
        assert_eq!(table.rows[1][0].key.as_deref(), Some("x"));
        assert_eq!(blocks[1], paragraph("after"));
    }

    #[test]
    fn other_commands_are_kept() {
        assert_eq!(
            scan(".nh\n.include other.md\n"),
            vec![
                Block::Command {
                    name: "nh".to_string(),
                    args: vec![],
                },
                Block::Command {
                    name: "include".to_string(),
                    args: vec!["other.md".to_string()],
                },
            ]
        );
    }

    #[test]
    fn code_keeps_blank_lines() {
        assert_eq!(
            scan("```rust\nfn main() {}\n\n// end\n```\ntext\n"),
            vec![
                Block::Code {
                    lang: "rust".to_string(),
                    lines: vec!["fn main() {}".into(), "".into(), "// end".into()],
                },
                paragraph("text"),
            ]
        );
        assert_eq!(
            scan("```\nopen"),
            vec![Block::Code {
                lang: "code".to_string(),
                lines: vec!["open".into()],
            }]
        );
    }

    #[test]
    fn data_block_is_verbatim() {
        assert_eq!(
            scan("{ ogdl\na\n  b\n}\nnext\n"),
            vec![
                Block::Data {
                    content: "a\n  b".to_string(),
                },
                paragraph("next"),
            ]
        );
    }

    #[test]
    fn quotes_strip_marker() {
        assert_eq!(
            scan("> first\n>second\nafter\n"),
            vec![
                Block::Quote {
                    spans: vec![Inline::text("first\nsecond")],
                },
                paragraph("after"),
            ]
        );
    }
}
