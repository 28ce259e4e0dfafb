//! Data projection: headers as nested objects, tables as keyed values.

use serde_json::{Map, Value};

use crate::block::{Block, Table};
use crate::inline::render_spans;
use crate::options::DataOptions;

/// Builds the data tree for `blocks`.
pub fn project<'b, I>(blocks: I, options: &DataOptions) -> Value
where
    I: IntoIterator<Item = &'b Block>,
{
    let mut builder = Builder::default();
    for block in blocks {
        match block {
            Block::Header(header) if header.level == 0 => {
                builder
                    .root
                    .insert("_title".to_string(), Value::String(header.text.clone()));
            }
            Block::Header(header) => builder.open_section(header.level, &header.key, &header.kind),
            Block::Paragraph { spans } | Block::Quote { spans } if options.text => {
                builder.append_text(&render_spans(spans));
            }
            Block::Data { content } if options.text => builder.push_data(content),
            Block::Table(table) if options.tables => {
                if let Some((key, value)) = table_entry(table) {
                    builder.current().insert(key, value);
                } else {
                    for (key, value) in table_columns(table) {
                        builder.current().insert(key, value);
                    }
                }
            }
            _ => {}
        }
    }
    builder.finish()
}

/// Open header sections, innermost last. Each section is inserted into its
/// parent when it closes, so a later duplicate key replaces an earlier one.
#[derive(Default)]
struct Builder {
    root: Map<String, Value>,
    open: Vec<Section>,
}

struct Section {
    level: usize,
    key: String,
    fields: Map<String, Value>,
}

impl Builder {
    fn open_section(&mut self, level: usize, key: &str, kind: &str) {
        while self.open.last().is_some_and(|section| section.level >= level) {
            self.close_last();
        }
        let mut fields = Map::new();
        if !kind.is_empty() {
            fields.insert("_type".to_string(), Value::String(kind.to_string()));
        }
        self.open.push(Section {
            level,
            key: key.to_string(),
            fields,
        });
    }

    fn close_last(&mut self) {
        if let Some(section) = self.open.pop() {
            self.current()
                .insert(section.key, Value::Object(section.fields));
        }
    }

    fn current(&mut self) -> &mut Map<String, Value> {
        match self.open.last_mut() {
            Some(section) => &mut section.fields,
            None => &mut self.root,
        }
    }

    fn append_text(&mut self, text: &str) {
        let current = self.current();
        match current.get_mut("_text") {
            Some(Value::String(existing)) => {
                existing.push('\n');
                existing.push_str(text);
            }
            _ => {
                current.insert("_text".to_string(), Value::String(text.to_string()));
            }
        }
    }

    fn push_data(&mut self, content: &str) {
        let current = self.current();
        let entry = current
            .entry("_data")
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(items) => items.push(Value::String(content.to_string())),
            other => *other = Value::Array(vec![Value::String(content.to_string())]),
        }
    }

    fn finish(mut self) -> Value {
        while !self.open.is_empty() {
            self.close_last();
        }
        Value::Object(self.root)
    }
}

/// Tables keyed on both axes become one object under the corner cell's key.
fn table_entry(table: &Table) -> Option<(String, Value)> {
    if !(table.hrow && table.hcol) {
        return None;
    }
    let header = table.rows.first()?;
    let corner = header.first()?.data_key().to_string();

    let mut rows = Map::new();
    for row in table.rows.iter().skip(1) {
        let Some(first) = row.first() else {
            continue;
        };
        let mut fields = Map::new();
        for (col, cell) in row.iter().enumerate().skip(1) {
            if let Some(column) = header.get(col) {
                fields.insert(
                    column.data_key().to_string(),
                    Value::String(cell.text.clone()),
                );
            }
        }
        rows.insert(first.data_key().to_string(), Value::Object(fields));
    }
    Some((corner, Value::Object(rows)))
}

/// Single-axis tables: one array of values per column (hrow) or per row (hcol).
fn table_columns(table: &Table) -> Vec<(String, Value)> {
    if table.hrow {
        let Some(header) = table.rows.first() else {
            return Vec::new();
        };
        header
            .iter()
            .enumerate()
            .map(|(col, cell)| {
                let column = table
                    .rows
                    .iter()
                    .skip(1)
                    .filter_map(|row| row.get(col).map(|cell| cell.text.as_str()));
                (cell.data_key().to_string(), strings(column))
            })
            .collect()
    } else if table.hcol {
        table
            .rows
            .iter()
            .filter_map(|row| {
                let (first, rest) = row.split_first()?;
                let cells = rest.iter().map(|cell| cell.text.as_str());
                Some((first.data_key().to_string(), strings(cells)))
            })
            .collect()
    } else {
        Vec::new()
    }
}

fn strings<'a>(cells: impl Iterator<Item = &'a str>) -> Value {
    Value::Array(cells.map(|text| Value::String(text.to_string())).collect())
}

/// Dotted header-key paths present in `reference` but missing from `target`.
///
/// Keys starting with `_` are ignored. A missing section is reported once,
/// without listing its children.
pub fn missing_paths(reference: &Value, target: &Value) -> Vec<String> {
    let mut missing = Vec::new();
    if let Some(reference) = reference.as_object() {
        walk(reference, target.as_object(), "", &mut missing);
    }
    missing
}

fn walk(
    reference: &Map<String, Value>,
    target: Option<&Map<String, Value>>,
    prefix: &str,
    missing: &mut Vec<String>,
) {
    for (key, value) in reference {
        if key.starts_with('_') {
            continue;
        }
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match target.and_then(|target| target.get(key)) {
            Some(found) => {
                if let Some(children) = value.as_object() {
                    walk(children, found.as_object(), &path, missing);
                }
            }
            None => missing.push(path),
        }
    }
}
