use serde::Serialize;

use crate::banner::BannerBuffer;
use crate::patterns::HTML_TAG_PATTERNS;

/// One extracted field of a banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BannerField {
    /// Field label ("Server", "Location", "Via", "Title").
    pub name: String,
    /// Extracted value, lossily decoded as UTF-8.
    pub value: String,
}

/// A banner lifted back into structured form for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct BannerReport {
    /// Fields in discovery order.
    pub fields: Vec<BannerField>,
}

impl BannerReport {
    /// Structure the contents of a banner buffer.
    pub fn from_banner(banner: &BannerBuffer) -> Self {
        Self::from_bytes(banner.as_bytes())
    }

    /// Structure a flat banner according to the emission rules: header
    /// fields appear as `Label\nvalue` pairs, HTML tags as `Label:content`
    /// lines, with a newline between consecutive fields.
    pub fn from_bytes(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let mut fields = Vec::new();

        let mut lines = text.split('\n');
        while let Some(line) = lines.next() {
            if line.is_empty() {
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                if HTML_TAG_PATTERNS.iter().any(|e| e.label == name) {
                    fields.push(BannerField {
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                    continue;
                }
            }
            // Header-style pair: this line is the label, the next the value.
            let value = lines.next().unwrap_or("");
            fields.push(BannerField {
                name: line.to_string(),
                value: value.to_string(),
            });
        }

        BannerReport { fields }
    }

    /// Look up the first field with the given label.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Serialize a [`BannerReport`] to a JSON string.
///
/// When `pretty` is `true` the output is indented for readability.
pub fn format_json(report: &BannerReport, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(report).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    } else {
        serde_json::to_string(report).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

/// Render a [`BannerReport`] as one `Label: value` line per field.
pub fn format_text(report: &BannerReport) -> String {
    let mut out = String::with_capacity(32 + report.fields.len() * 40);
    for field in &report.fields {
        out.push_str(&format!("{}: {}\n", field.name, field.value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structures_header_pairs_and_tag_lines() {
        let report = BannerReport::from_bytes(b"Server\nApache/2.4\nTitle:Home");
        assert_eq!(report.fields.len(), 2);
        assert_eq!(report.field_value("Server"), Some("Apache/2.4"));
        assert_eq!(report.field_value("Title"), Some("Home"));
    }

    #[test]
    fn value_containing_colon_stays_a_header_value() {
        let report = BannerReport::from_bytes(b"Location\nhttp://example.com/");
        assert_eq!(
            report.field_value("Location"),
            Some("http://example.com/")
        );
    }

    #[test]
    fn tag_content_keeps_interior_colons() {
        let report = BannerReport::from_bytes(b"Title:a:b");
        assert_eq!(report.field_value("Title"), Some("a:b"));
    }

    #[test]
    fn empty_banner_is_empty_report() {
        assert!(BannerReport::from_bytes(b"").is_empty());
    }
}
