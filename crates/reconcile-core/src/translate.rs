//! Message catalogs for text written into generated records.
//!
//! Placeholders use `{name}` syntax. A key missing from the active locale
//! falls back to English, then to the key itself.

use std::collections::HashMap;

pub trait Translator {
    fn format(&self, key: &str, params: &[(&str, &str)]) -> String;
}

pub const DEFAULT_LOCALE: &str = "en";

const EN: &str = r#"{
    "maintenance.task_title": "Maintenance: {schedule} ({equipment})",
    "maintenance.task_description": "Scheduled maintenance \"{schedule}\" for {equipment} is due by {next_service}. Service interval: every {interval} days.",
    "sheet.task_description_fallback": "Imported from spreadsheet row {row}."
}"#;

const FR: &str = r#"{
    "maintenance.task_title": "Maintenance : {schedule} ({equipment})",
    "maintenance.task_description": "La maintenance planifiée « {schedule} » pour {equipment} est à effectuer avant le {next_service}. Intervalle : tous les {interval} jours.",
    "sheet.task_description_fallback": "Importé depuis la ligne {row} du tableur."
}"#;

#[derive(Debug, Clone)]
pub struct Catalog {
    locale: String,
    messages: HashMap<String, String>,
    fallback: HashMap<String, String>,
}

impl Catalog {
    /// Built-in catalog for `locale`; unknown locales use English.
    pub fn builtin(locale: &str) -> Self {
        let fallback = parse_catalog(EN);
        let (locale, messages) = match locale.to_ascii_lowercase().as_str() {
            "fr" => ("fr".to_string(), parse_catalog(FR)),
            _ => (DEFAULT_LOCALE.to_string(), fallback.clone()),
        };
        Self {
            locale,
            messages,
            fallback,
        }
    }

    pub fn with_messages(locale: impl Into<String>, messages: HashMap<String, String>) -> Self {
        Self {
            locale: locale.into(),
            messages,
            fallback: parse_catalog(EN),
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin(DEFAULT_LOCALE)
    }
}

impl Translator for Catalog {
    fn format(&self, key: &str, params: &[(&str, &str)]) -> String {
        let template = self
            .messages
            .get(key)
            .or_else(|| self.fallback.get(key))
            .map(String::as_str)
            .unwrap_or(key);
        substitute(template, params)
    }
}

/// Expands `{name}` placeholders in one pass over the template, so braces
/// inside substituted values are left as they are. Unknown placeholders stay
/// literal.
fn substitute(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let value = tail.find('}').and_then(|close| {
            let name = &tail[1..close];
            params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn parse_catalog(raw: &str) -> HashMap<String, String> {
    // Catalogs are compiled in; a parse failure yields an empty map and every
    // lookup falls through to the key.
    serde_json::from_str(raw).unwrap_or_default()
}
