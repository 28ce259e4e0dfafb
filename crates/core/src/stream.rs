//! Flat, leveled event stream.
//!
//! Every entry is a `(text, level)` pair. Parentage is implicit: an entry at
//! level `L` belongs to the closest preceding entry at level `L - 1`. The
//! stream is append-only; `delete_last` is the only way to remove an entry and
//! it only ever touches the tail.

use std::fmt;

use serde::Serialize;

use crate::block::{Block, Inline};

/// One stream entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub text: String,
    pub level: usize,
}

/// Append-only sequence of leveled entries with a level cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventStream {
    current: usize,
    max: usize,
    entries: Vec<Entry>,
}

/// Explicit tree built from a stream by [`EventStream::to_tree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl EventStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flattens scanned blocks into the stream shapes consumers decode positionally.
    pub fn from_blocks(blocks: &[Block]) -> Self {
        let mut stream = Self::new();
        for block in blocks {
            stream.set_level(0);
            stream.emit_block(block);
        }
        stream.set_level(0);
        stream
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry at `index`, or `None` past either end.
    pub fn item(&self, index: usize) -> Option<(&str, usize)> {
        self.entries
            .get(index)
            .map(|entry| (entry.text.as_str(), entry.level))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Appends at the current level.
    pub fn add(&mut self, text: impl Into<String>) {
        self.entries.push(Entry {
            text: text.into(),
            level: self.current,
        });
    }

    /// Appends at an explicit level without moving the cursor.
    pub fn add_at(&mut self, text: impl Into<String>, level: usize) {
        self.entries.push(Entry {
            text: text.into(),
            level,
        });
        self.max = self.max.max(level);
    }

    /// Removes the most recently appended entry.
    pub fn delete_last(&mut self) -> Option<Entry> {
        self.entries.pop()
    }

    pub fn level(&self) -> usize {
        self.current
    }

    pub fn max_level(&self) -> usize {
        self.max
    }

    pub fn set_level(&mut self, level: usize) {
        self.current = level;
        self.max = self.max.max(level);
    }

    pub fn inc(&mut self) {
        self.current += 1;
        self.max = self.max.max(self.current);
    }

    /// Moves the cursor one level up, stopping at 0.
    pub fn dec(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    /// Materializes the implicit parent/child structure under an unnamed root.
    pub fn to_tree(&self) -> Node {
        let mut open = vec![Node::new("")];
        for entry in &self.entries {
            // A level deeper than any open parent attaches to the deepest one.
            let depth = (entry.level + 1).min(open.len());
            while open.len() > depth {
                close_last(&mut open);
            }
            open.push(Node::new(entry.text.clone()));
        }
        while open.len() > 1 {
            close_last(&mut open);
        }
        open.pop().unwrap_or_else(|| Node::new(""))
    }

    fn emit_block(&mut self, block: &Block) {
        let base = self.level();
        self.add(block.sentinel());
        self.inc();
        match block {
            Block::Paragraph { spans } | Block::Quote { spans } => self.emit_spans(spans),
            Block::Header(header) => {
                self.add(header.level.to_string());
                self.add(header.text.as_str());
                self.add(format!("#{}", header.key));
                self.add(format!("!{}", header.kind));
            }
            Block::List(list) => {
                let item_level = base + 1;
                for item in &list.items {
                    self.add_at("!li", item_level);
                    self.add_at(item.level.to_string(), item_level + 1);
                    self.add_at(item.text.as_str(), item_level + 1);
                    self.add_at(item.key.as_str(), item_level + 1);
                }
                if list.items.is_empty() {
                    self.delete_last();
                }
            }
            Block::Table(table) => {
                let row_level = base + 1;
                for row in &table.rows {
                    self.add_at("!tr", row_level);
                    for cell in row {
                        self.add_at(cell.text.as_str(), row_level + 1);
                        if let Some(key) = &cell.key {
                            self.add_at(key.as_str(), row_level + 2);
                        }
                    }
                }
                if table.rows.is_empty() {
                    self.delete_last();
                    self.set_level(base);
                    return;
                }
                if table.hcol {
                    self.add_at("!hcol", row_level);
                }
                if table.hrow {
                    self.add_at("!hrow", row_level);
                }
            }
            Block::Code { lang, lines } => {
                self.add(lang.as_str());
                for line in lines {
                    self.add(line.as_str());
                }
            }
            Block::Data { content } => self.add(content.as_str()),
            Block::Command { name, args } => {
                self.add(name.as_str());
                self.inc();
                for arg in args {
                    self.add(arg.as_str());
                }
            }
        }
        self.set_level(base);
    }

    fn emit_spans(&mut self, spans: &[Inline]) {
        let level = self.level();
        for span in spans {
            match span {
                Inline::Text { text } => self.add_at(text.as_str(), level),
                Inline::Escape { name, args } => {
                    self.add_at("!esc", level);
                    let arg_level = if name.is_empty() {
                        level + 1
                    } else {
                        self.add_at(name.as_str(), level + 1);
                        level + 2
                    };
                    for arg in args {
                        self.add_at(arg.as_str(), arg_level);
                    }
                }
            }
        }
    }
}

fn close_last(open: &mut Vec<Node>) {
    if let Some(node) = open.pop() {
        if let Some(parent) = open.last_mut() {
            parent.children.push(node);
        }
    }
}

impl Node {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            children: Vec::new(),
        }
    }
}

/// One entry per line, indented two spaces per level.
impl fmt::Display for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{:width$}{}", "", entry.text, width = entry.level * 2)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;
    use pretty_assertions::assert_eq;

    fn entries(stream: &EventStream) -> Vec<(&str, usize)> {
        stream.iter().map(|e| (e.text.as_str(), e.level)).collect()
    }

    #[test]
    fn cursor_moves_and_never_goes_negative() {
        let mut stream = EventStream::new();
        stream.add("a");
        stream.inc();
        stream.add("b");
        stream.dec();
        stream.dec();
        stream.dec();
        stream.add("c");
        stream.add_at("d", 4);

        assert_eq!(entries(&stream), vec![("a", 0), ("b", 1), ("c", 0), ("d", 4)]);
        assert_eq!(stream.level(), 0);
        assert_eq!(stream.max_level(), 4);
    }

    #[test]
    fn item_out_of_range_is_none() {
        let mut stream = EventStream::new();
        stream.add("only");
        assert_eq!(stream.item(0), Some(("only", 0)));
        assert_eq!(stream.item(1), None);
    }

    #[test]
    fn delete_last_only_touches_the_tail() {
        let mut stream = EventStream::new();
        stream.add("keep");
        stream.add("speculative");
        let removed = stream.delete_last();

        assert_eq!(removed.map(|e| e.text), Some("speculative".to_string()));
        assert_eq!(stream.len(), 1);
        assert_eq!(stream.item(0), Some(("keep", 0)));
    }

    #[test]
    fn header_has_fixed_arity() {
        let stream = EventStream::from_blocks(&scan("## Hello World {!note}\n"));
        assert_eq!(
            entries(&stream),
            vec![
                ("!h", 0),
                ("2", 1),
                ("Hello World", 1),
                ("#hello_world", 1),
                ("!note", 1),
            ]
        );
    }

    #[test]
    fn list_items_carry_level_text_and_key() {
        let stream = EventStream::from_blocks(&scan("- a\n  - b\n"));
        assert_eq!(
            entries(&stream),
            vec![
                ("!ul", 0),
                ("!li", 1),
                ("1", 2),
                ("a", 2),
                ("a", 2),
                ("!li", 1),
                ("2", 2),
                ("b", 2),
                ("b", 2),
            ]
        );
    }

    #[test]
    fn table_cells_nest_keys_and_flags() {
        let stream = EventStream::from_blocks(&scan("| A | B |\n|---|---|\n| 1 | 2 |\n"));
        assert_eq!(
            entries(&stream),
            vec![
                ("!tb", 0),
                ("!tr", 1),
                ("A", 2),
                ("a", 3),
                ("B", 2),
                ("b", 3),
                ("!tr", 1),
                ("1", 2),
                ("2", 2),
                ("!hrow", 1),
            ]
        );
    }

    #[test]
    fn escapes_become_subtrees() {
        let stream = EventStream::from_blocks(&scan("see \\b(bold, \"x, y\") now\n"));
        assert_eq!(
            entries(&stream),
            vec![
                ("!p", 0),
                ("see ", 1),
                ("!esc", 1),
                ("b", 2),
                ("bold", 3),
                ("x, y", 3),
                (" now", 1),
            ]
        );
    }

    #[test]
    fn tree_follows_levels() {
        let stream = EventStream::from_blocks(&scan("# A\ntext\n"));
        let tree = stream.to_tree();

        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].text, "!h");
        assert_eq!(tree.children[0].children.len(), 4);
        assert_eq!(tree.children[1].text, "!p");
        assert_eq!(tree.children[1].children[0].text, "text");
    }

    #[test]
    fn tree_attaches_skipped_levels_to_deepest_parent() {
        let mut stream = EventStream::new();
        stream.add_at("root", 0);
        stream.add_at("deep", 3);
        stream.add_at("next", 0);
        let tree = stream.to_tree();

        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].children[0].text, "deep");
    }

    #[test]
    fn display_indents_by_level() {
        let stream = EventStream::from_blocks(&scan("# A\n"));
        assert_eq!(stream.to_string(), "!h\n  1\n  A\n  #a\n  !\n");
    }
}
