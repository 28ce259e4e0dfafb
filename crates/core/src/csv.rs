//! CSV field splitting and typed CSV records.
//!
//! Records are keyed by their `name` field. A record whose `type` field names
//! another record inherits that record's fields, recursively.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::CsvError;

/// One CSV line mapped from field name to value. Empty values are omitted.
pub type Record = BTreeMap<String, String>;

/// Splits a line on commas that are not inside double quotes.
///
/// `\"` does not close a quote. Fields are trimmed and lose one layer of
/// surrounding quotes.
pub fn split(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    let mut prev = '\0';

    for (index, ch) in line.char_indices() {
        match ch {
            ',' if !in_quote => {
                fields.push(clean_field(&line[start..index]));
                start = index + 1;
            }
            '"' if !in_quote => in_quote = true,
            '"' if prev != '\\' => in_quote = false,
            _ => {}
        }
        prev = ch;
    }
    fields.push(clean_field(&line[start..]));
    fields
}

fn clean_field(field: &str) -> String {
    let field = field.trim();
    match field.strip_prefix('"').and_then(|f| f.strip_suffix('"')) {
        Some(inner) => inner.to_string(),
        None => field.to_string(),
    }
}

/// Parses CSV text. The first non-comment line holds the field names.
pub fn parse_records(text: &str) -> Vec<Record> {
    let mut lines = text
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'));

    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let names = split(header);

    lines
        .map(|line| {
            names
                .iter()
                .zip(split(line))
                .filter(|(_, value)| !value.is_empty())
                .map(|(name, value)| (name.clone(), value))
                .collect()
        })
        .collect()
}

pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<Record>, CsvError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| CsvError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_records(&text))
}

/// Applies type inheritance to `instances`.
///
/// Types are looked up by `name` among the instances and the catalogue.
/// Fields of the type overwrite those of the instance, except `tags`, which
/// are appended (`"child parent"`). `name` and `type` are never copied. The result is keyed by instance name.
pub fn resolve_types(
    instances: Vec<Record>,
    catalogue: &[Record],
) -> Result<BTreeMap<String, Record>, CsvError> {
    let mut index: HashMap<&str, &Record> = HashMap::new();
    for record in instances.iter().chain(catalogue) {
        if let Some(name) = record.get("name").filter(|name| !name.is_empty()) {
            index.insert(name, record);
        }
    }

    let mut resolved = BTreeMap::new();
    for instance in &instances {
        let mut chain = Vec::new();
        let record = resolve(instance, &index, &mut chain)?;
        let name = record.get("name").cloned().unwrap_or_default();
        resolved.insert(name, record);
    }
    Ok(resolved)
}

/// Reads the instance file and the type files, then resolves types.
pub fn read_typed<P: AsRef<Path>>(
    instances: P,
    types: &[P],
) -> Result<BTreeMap<String, Record>, CsvError> {
    let instances = read_records(instances)?;
    let mut catalogue = Vec::new();
    for path in types {
        catalogue.extend(read_records(path)?);
    }
    resolve_types(instances, &catalogue)
}

fn resolve<'a>(
    record: &'a Record,
    index: &HashMap<&str, &'a Record>,
    chain: &mut Vec<&'a str>,
) -> Result<Record, CsvError> {
    let mut merged = record.clone();
    let Some(type_name) = record.get("type").filter(|t| !t.is_empty()) else {
        return Ok(merged);
    };

    if chain.contains(&type_name.as_str()) {
        chain.push(type_name);
        return Err(CsvError::TypeCycle {
            chain: chain.join(" -> "),
        });
    }
    let Some(&parent) = index.get(type_name.as_str()) else {
        warn!(type_name = %type_name, "type not found");
        return Ok(merged);
    };

    chain.push(type_name);
    let parent = resolve(parent, index, chain)?;
    chain.pop();

    for (key, value) in parent {
        match key.as_str() {
            "name" | "type" => {}
            "tags" => {
                let tags = match merged.get("tags") {
                    Some(own) => format!("{own} {value}"),
                    None => value,
                };
                merged.insert(key, tags);
            }
            _ => {
                merged.insert(key, value);
            }
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(fields: &[(&str, &str)]) -> Record {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn split_respects_quotes() {
        assert_eq!(split("a, \"b, c\", d"), vec!["a", "b, c", "d"]);
        assert_eq!(split("one"), vec!["one"]);
        assert_eq!(split("a,,b"), vec!["a", "", "b"]);
    }

    #[test]
    fn escaped_quote_does_not_close() {
        assert_eq!(split(r#""say \"x, y\"", z"#), vec![r#"say \"x, y\""#, "z"]);
    }

    #[test]
    fn parses_records_and_drops_empty_values() {
        let records = parse_records("# items\nname, type, size\nbox, container,\nlid, , 3\n");
        assert_eq!(
            records,
            vec![
                record(&[("name", "box"), ("type", "container")]),
                record(&[("name", "lid"), ("size", "3")]),
            ]
        );
        assert!(parse_records("# only comments\n").is_empty());
    }

    #[test]
    fn inherits_fields_recursively() {
        let instances = vec![record(&[
            ("name", "crate1"),
            ("type", "crate"),
            ("tags", "heavy"),
            ("color", "red"),
        ])];
        let catalogue = vec![
            record(&[("name", "crate"), ("type", "box"), ("color", "brown")]),
            record(&[("name", "box"), ("tags", "storage"), ("shape", "cube")]),
        ];

        let resolved = resolve_types(instances, &catalogue).unwrap();
        assert_eq!(
            resolved["crate1"],
            record(&[
                ("name", "crate1"),
                ("type", "crate"),
                ("tags", "heavy storage"),
                ("color", "brown"),
                ("shape", "cube"),
            ])
        );
    }

    #[test]
    fn type_fields_overwrite_instance_fields() {
        let instances = vec![record(&[("name", "b1"), ("type", "box"), ("color", "red")])];
        let catalogue = vec![record(&[
            ("name", "box"),
            ("type", "thing"),
            ("color", "brown"),
        ])];

        let resolved = resolve_types(instances, &catalogue).unwrap();
        assert_eq!(resolved["b1"]["color"], "brown");
        assert_eq!(resolved["b1"]["name"], "b1");
        assert_eq!(resolved["b1"]["type"], "box");
    }

    #[test]
    fn unknown_type_is_skipped() {
        let instances = vec![record(&[("name", "x"), ("type", "missing")])];
        let resolved = resolve_types(instances, &[]).unwrap();
        assert_eq!(resolved["x"], record(&[("name", "x"), ("type", "missing")]));
    }

    #[test]
    fn type_cycle_is_an_error() {
        let instances = vec![record(&[("name", "x"), ("type", "a")])];
        let catalogue = vec![
            record(&[("name", "a"), ("type", "b")]),
            record(&[("name", "b"), ("type", "a")]),
        ];

        let err = resolve_types(instances, &catalogue).unwrap_err();
        match err {
            CsvError::TypeCycle { chain } => assert_eq!(chain, "a -> b -> a"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_records("/nonexistent/items.csv").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/items.csv"));
    }
}
