use anyhow::Result;
use chrono::Local;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

use crate::airtable::{AirtableClient, AirtableRecord};

/// Rendering options for the Airtable-to-markdown exporter.
///
/// `title_field` and `date_field` lead each record; `hero_field` (or
/// `ImageURL` when unset) renders as the opening image; `image_fields`
/// render as inline images; `exclude_fields` are dropped entirely.
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    pub title_field: String,
    pub date_field: String,
    pub hero_field: Option<String>,
    pub exclude_fields: Vec<String>,
    pub image_fields: Vec<String>,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            title_field: "EntryTitle".to_string(),
            date_field: "DateOccured".to_string(),
            hero_field: None,
            exclude_fields: Vec::new(),
            image_fields: Vec::new(),
        }
    }
}

/// Render a batch of records as one markdown document: hero image,
/// `##` title, italic date, then a `###` section per remaining field.
/// Empty and null fields are skipped; each record ends with a rule.
pub fn format_markdown(records: &[AirtableRecord], options: &MarkdownOptions) -> String {
    let mut out = String::new();

    for record in records {
        let fields = &record.fields;
        let title = scalar_text(&fields[&options.title_field]);

        let hero_key = options.hero_field.as_deref().unwrap_or("ImageURL");
        if let Some(url) = fields[hero_key].as_str().filter(|u| !u.is_empty()) {
            let alt = if title.is_empty() {
                "hero image"
            } else {
                title.as_str()
            };
            out.push_str(&format!("![{alt}]({url})\n\n"));
        }

        if !title.is_empty() {
            out.push_str(&format!("## {title}\n\n"));
        }
        if let Some(date) = fields[&options.date_field].as_str().filter(|d| !d.is_empty()) {
            out.push_str(&format!("*{date}*\n\n"));
        }

        if let Some(map) = fields.as_object() {
            for (key, value) in map {
                if key == &options.title_field
                    || key == &options.date_field
                    || key == hero_key
                    || options.exclude_fields.iter().any(|f| f == key)
                {
                    continue;
                }

                if key == "ImageURL" || options.image_fields.iter().any(|f| f == key) {
                    if let Some(url) = value.as_str().filter(|u| !u.is_empty()) {
                        out.push_str(&format!("![{key}]({url})\n\n"));
                    }
                    continue;
                }

                match value {
                    Value::Array(items) => {
                        let joined = items
                            .iter()
                            .map(scalar_text)
                            .collect::<Vec<_>>()
                            .join(", ");
                        if !joined.is_empty() {
                            out.push_str(&format!("### {key}\n{joined}\n\n"));
                        }
                    }
                    Value::Null => {}
                    Value::String(s) if s.is_empty() => {}
                    other => {
                        out.push_str(&format!("### {key}\n{}\n\n", scalar_text(other)));
                    }
                }
            }
        }

        out.push_str("---\n\n");
    }

    out
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Exports every record in an Airtable view to a markdown file.
pub struct ViewExporter {
    client: AirtableClient,
    options: MarkdownOptions,
}

impl ViewExporter {
    pub fn new(client: AirtableClient, options: MarkdownOptions) -> Self {
        Self { client, options }
    }

    /// Fetch a view and write it as markdown. Without an explicit output
    /// path the file lands in the current directory as
    /// `airtable-export-{timestamp}.md`.
    pub async fn export(
        &self,
        table: &str,
        view: &str,
        output: Option<PathBuf>,
    ) -> Result<PathBuf> {
        let records = self.client.list_view_records(table, view).await?;
        let markdown = format_markdown(&records, &self.options);

        let path = output.unwrap_or_else(|| {
            PathBuf::from(format!(
                "airtable-export-{}.md",
                Local::now().format("%Y%m%d%H%M%S")
            ))
        });
        tokio::fs::write(&path, markdown).await?;
        info!("💾 Exported {} records to {}", records.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: Value) -> AirtableRecord {
        AirtableRecord {
            id: "recTEST".to_string(),
            created_time: Some("2025-03-14T00:00:00.000Z".to_string()),
            fields,
        }
    }

    #[test]
    fn test_title_date_and_sections() {
        let records = vec![record(json!({
            "EntryTitle": "Studio day one",
            "DateOccured": "2025-03-14",
            "Notes": "Two cameras on sticks",
            "Crew": ["Jane", "Sam"],
        }))];

        let md = format_markdown(&records, &MarkdownOptions::default());
        assert!(md.contains("## Studio day one\n\n"));
        assert!(md.contains("*2025-03-14*\n\n"));
        assert!(md.contains("### Notes\nTwo cameras on sticks\n\n"));
        assert!(md.contains("### Crew\nJane, Sam\n\n"));
        assert!(md.ends_with("---\n\n"));
    }

    #[test]
    fn test_image_url_is_default_hero() {
        let records = vec![record(json!({
            "EntryTitle": "Studio day one",
            "ImageURL": "https://example.com/a.jpg",
        }))];

        let md = format_markdown(&records, &MarkdownOptions::default());
        assert!(md.starts_with("![Studio day one](https://example.com/a.jpg)\n\n"));
        // The hero field is not repeated as an inline image.
        assert_eq!(md.matches("https://example.com/a.jpg").count(), 1);
    }

    #[test]
    fn test_explicit_hero_frees_image_url_for_inline_use() {
        let records = vec![record(json!({
            "EntryTitle": "Studio day one",
            "HeroShot": "https://example.com/hero.jpg",
            "ImageURL": "https://example.com/inline.jpg",
        }))];

        let options = MarkdownOptions {
            hero_field: Some("HeroShot".to_string()),
            ..Default::default()
        };
        let md = format_markdown(&records, &options);
        assert!(md.starts_with("![Studio day one](https://example.com/hero.jpg)\n\n"));
        assert!(md.contains("![ImageURL](https://example.com/inline.jpg)\n\n"));
    }

    #[test]
    fn test_untitled_record_gets_placeholder_alt_text() {
        let records = vec![record(json!({
            "ImageURL": "https://example.com/a.jpg",
        }))];

        let md = format_markdown(&records, &MarkdownOptions::default());
        assert!(md.starts_with("![hero image](https://example.com/a.jpg)\n\n"));
        assert!(!md.contains("## "));
    }

    #[test]
    fn test_empty_and_excluded_fields_are_skipped() {
        let records = vec![record(json!({
            "EntryTitle": "Entry",
            "Blank": "",
            "Missing": null,
            "Internal": "do not publish",
            "Tags": [],
        }))];

        let options = MarkdownOptions {
            exclude_fields: vec!["Internal".to_string()],
            ..Default::default()
        };
        let md = format_markdown(&records, &options);
        assert!(!md.contains("Blank"));
        assert!(!md.contains("Missing"));
        assert!(!md.contains("Internal"));
        assert!(!md.contains("Tags"));
    }

    #[test]
    fn test_records_are_separated_by_rules() {
        let records = vec![
            record(json!({"EntryTitle": "First"})),
            record(json!({"EntryTitle": "Second"})),
        ];

        let md = format_markdown(&records, &MarkdownOptions::default());
        assert_eq!(md.matches("---\n\n").count(), 2);
        let first = md.find("## First").unwrap();
        let second = md.find("## Second").unwrap();
        assert!(first < second);
    }
}
