use docflow_core::{DataOptions, Document, HtmlOptions, RewriteOptions, StreamingRewriter};
use js_sys::Function;
use serde::de::DeserializeOwned;
use std::io::{self, Write};
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;

/// Renders a document into an HTML `String`.
///
/// `options_json` is an optional JSON object such as
/// `{"url_base": "/docs", "numbered": true}`; missing fields take defaults.
#[wasm_bindgen(js_name = render_html)]
pub fn render_html(input: &str, options_json: Option<String>) -> Result<String, JsError> {
    let options: HtmlOptions = parse_options(options_json.as_deref()).map_err(to_js_error)?;
    Ok(Document::new(input).html_with(&options))
}

/// Returns the data tree of a document as a JSON string.
#[wasm_bindgen(js_name = render_data)]
pub fn render_data(input: &str, options_json: Option<String>) -> Result<String, JsError> {
    let options: DataOptions = parse_options(options_json.as_deref()).map_err(to_js_error)?;
    serde_json::to_string(&Document::new(input).data(&options)).map_err(to_js_error)
}

/// Renders only the section at the dotted header `path`. Unknown paths
/// render as an empty string.
#[wasm_bindgen(js_name = render_part)]
pub fn render_part(
    input: &str,
    path: &str,
    options_json: Option<String>,
) -> Result<String, JsError> {
    let options: HtmlOptions = parse_options(options_json.as_deref()).map_err(to_js_error)?;
    Ok(Document::new(input).part(path).html_with(&options))
}

/// Lists the header paths of `reference` that `target` lacks, one per line.
/// An empty string means the structure matches.
#[wasm_bindgen(js_name = compare_structure)]
pub fn compare_structure(reference: &str, target: &str) -> String {
    let (_, diagnostic) = Document::new(target).compare_structure(&Document::new(reference));
    diagnostic
}

/// Streams rendered HTML chunks into the provided JavaScript callback.
///
/// The callback is invoked with each UTF-8 chunk produced by the streaming
/// rewriter, so callers can forward output to a `WritableStream`, append to the
/// DOM incrementally, or buffer it manually.
#[wasm_bindgen(js_name = stream_html)]
pub fn stream_html(
    input: &str,
    chunk_callback: &Function,
    enforce_img_loading_lazy: Option<bool>,
) -> Result<(), JsError> {
    let options = RewriteOptions {
        enforce_img_loading_lazy: enforce_img_loading_lazy.unwrap_or(true),
        ..RewriteOptions::default()
    };

    let writer = JsChunkWriter::new(chunk_callback.clone());
    let rewriter = Document::new(input)
        .write_html(StreamingRewriter::new(writer, options), &HtmlOptions::default())
        .map_err(to_js_error)?;

    rewriter.into_inner().map_err(to_js_error)?;
    Ok(())
}

#[wasm_bindgen(js_name = version)]
pub fn version() -> String {
    docflow_core::version().to_string()
}

fn parse_options<T: DeserializeOwned + Default>(json: Option<&str>) -> serde_json::Result<T> {
    match json.map(str::trim) {
        Some(json) if !json.is_empty() => serde_json::from_str(json),
        _ => Ok(T::default()),
    }
}

fn to_js_error<E: ToString>(err: E) -> JsError {
    JsError::new(&err.to_string())
}

struct JsChunkWriter {
    callback: Function,
}

impl JsChunkWriter {
    fn new(callback: Function) -> Self {
        Self { callback }
    }
}

impl Write for JsChunkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let chunk = std::str::from_utf8(buf)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        self.callback
            .call1(&JsValue::UNDEFINED, &JsValue::from_str(chunk))
            .map_err(js_callback_error)?;

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn js_callback_error(err: JsValue) -> io::Error {
    let message = err
        .as_string()
        .or_else(|| {
            js_sys::JSON::stringify(&err)
                .ok()
                .and_then(|s| s.as_string())
        })
        .unwrap_or_else(|| "callback threw".to_string());
    io::Error::other(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_when_absent() {
        let options: HtmlOptions = parse_options(None).unwrap();
        assert_eq!(options, HtmlOptions::default());

        let options: DataOptions = parse_options(Some("  ")).unwrap();
        assert_eq!(options, DataOptions::default());
    }

    #[test]
    fn options_parse_partial_json() {
        let options: HtmlOptions = parse_options(Some(r#"{"numbered": true}"#)).unwrap();
        assert!(options.numbered);
        assert!(options.url_base.is_none());

        assert!(parse_options::<DataOptions>(Some("{not json")).is_err());
    }
}
