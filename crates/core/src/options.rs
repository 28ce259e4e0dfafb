use serde::{Deserialize, Serialize};

/// HTML rendering options. Every field is optional when deserialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlOptions {
    /// When set, header text links to `{url_base}/{anchor path}`.
    pub url_base: Option<String>,
    /// Prefix headers with `1.2.` style numbers without needing `.nh`.
    pub numbered: bool,
}

/// Data projection options (all on by default).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataOptions {
    /// Fold paragraph and quote text into `_text`, raw data into `_data`.
    #[serde(default = "default_true")]
    pub text: bool,
    #[serde(default = "default_true")]
    pub tables: bool,
}

impl Default for DataOptions {
    fn default() -> Self {
        Self {
            text: true,
            tables: true,
        }
    }
}

impl DataOptions {
    /// Headers only.
    pub fn outline() -> Self {
        Self {
            text: false,
            tables: false,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let html: HtmlOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(html, HtmlOptions::default());

        let data: DataOptions = serde_json::from_str(r#"{"tables": false}"#).unwrap();
        assert!(data.text);
        assert!(!data.tables);
    }

    #[test]
    fn parses_url_base() {
        let html: HtmlOptions =
            serde_json::from_str(r#"{"url_base": "/docs", "numbered": true}"#).unwrap();
        assert_eq!(html.url_base.as_deref(), Some("/docs"));
        assert!(html.numbered);
    }
}
