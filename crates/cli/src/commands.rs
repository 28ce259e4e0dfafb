use anyhow::{Context, Result, bail};
use docflow_core::{DataOptions, Document, HtmlOptions, RewriteOptions, StreamingRewriter, csv};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads a document, narrowed to `part` when given.
pub fn load(path: &Path, part: Option<&str>) -> Result<Document> {
    let doc = Document::from_path(path)?;
    debug!(path = %path.display(), blocks = doc.blocks().len(), "loaded document");

    match part {
        Some(part) => {
            let section = doc.part(part);
            if section.is_empty() {
                bail!("no section `{part}` in {}", path.display());
            }
            Ok(section)
        }
        None => Ok(doc),
    }
}

/// Renders HTML into `out`, through lol_html when any rewrite is enabled.
pub fn html<W: Write>(
    doc: &Document,
    out: W,
    options: &HtmlOptions,
    rewrite: RewriteOptions,
) -> Result<W> {
    if !rewrite.enforce_img_loading_lazy && !rewrite.external_links_noopener {
        return doc.write_html(out, options).context("writing html");
    }

    let rewriter = doc
        .write_html(StreamingRewriter::new(out, rewrite), options)
        .context("writing html")?;
    rewriter.into_inner().context("finishing html rewrite")
}

pub fn data(doc: &Document, options: &DataOptions) -> Result<String> {
    serde_json::to_string_pretty(&doc.data(options)).context("serializing data tree")
}

pub fn stream(doc: &Document) -> String {
    doc.stream().to_string()
}

pub fn tree(doc: &Document) -> Result<String> {
    serde_json::to_string_pretty(&doc.stream().to_tree()).context("serializing stream tree")
}

/// Returns whether `target` has every header path of `reference`, and the
/// missing paths.
pub fn check(reference: &Path, target: &Path) -> Result<(bool, String)> {
    let reference = load(reference, None)?;
    let target = load(target, None)?;
    Ok(target.compare_structure(&reference))
}

pub fn typed_csv(instances: &Path, types: &[PathBuf]) -> Result<String> {
    let types: Vec<&Path> = types.iter().map(PathBuf::as_path).collect();
    let records = csv::read_typed(instances, &types)?;
    serde_json::to_string_pretty(&records).context("serializing csv records")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_a_part() {
        let doc = file("# A\nintro\n## B\nbody\n");
        let part = load(doc.path(), Some("a.b")).unwrap();
        assert_eq!(part.blocks().len(), 2);
    }

    #[test]
    fn missing_part_is_an_error() {
        let doc = file("# A\n");
        let err = load(doc.path(), Some("nope")).unwrap_err();
        assert!(err.to_string().contains("no section `nope`"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load(Path::new("/nonexistent/doc.md"), None).is_err());
    }

    #[test]
    fn html_with_and_without_rewrites() {
        let doc = Document::new("![x](/x.png)\n");
        let plain = html(
            &doc,
            Vec::new(),
            &HtmlOptions::default(),
            RewriteOptions {
                enforce_img_loading_lazy: false,
                external_links_noopener: false,
            },
        )
        .unwrap();
        assert_eq!(String::from_utf8(plain).unwrap(), "<p><img src=\"/x.png\" alt=\"x\"></p>\n");

        let lazy = html(&doc, Vec::new(), &HtmlOptions::default(), RewriteOptions::default())
            .unwrap();
        assert!(String::from_utf8(lazy).unwrap().contains("loading=\"lazy\""));
    }

    #[test]
    fn data_is_pretty_json() {
        let doc = Document::new("# A\ntext\n");
        let options = DataOptions {
            text: false,
            tables: true,
        };
        assert_eq!(data(&doc, &options).unwrap(), "{\n  \"a\": {}\n}");
    }

    #[test]
    fn typed_csv_resolves_types() {
        let items = file("name, type, tags\nbox1, box, red\n");
        let types = file("name, tags, size\nbox, storage, 3\n");
        let json = typed_csv(items.path(), &[types.path().to_path_buf()]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["box1"]["tags"], "red storage");
        assert_eq!(value["box1"]["size"], "3");
    }

    #[test]
    fn check_reports_missing_paths() {
        let reference = file("# A\n## B\n");
        let target = file("# A\n");
        let (ok, diagnostic) = check(reference.path(), target.path()).unwrap();
        assert!(!ok);
        assert_eq!(diagnostic, "a.b");
    }
}
