use serde::{Deserialize, Serialize};

pub const DEFAULT_LOCALE: &str = "en-GB";
pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(
        rename = "Locale",
        default,
        deserialize_with = "crate::upstream::string_or_default"
    )]
    pub locale: String,
    #[serde(
        rename = "Description",
        default,
        deserialize_with = "crate::upstream::string_or_default"
    )]
    pub text: String,
}

impl LocalizedText {
    pub fn new(locale: &str, text: &str) -> Self {
        Self {
            locale: locale.to_string(),
            text: text.to_string(),
        }
    }
}

/// Fallback order: exact preferred tag, first `en*` tag, first non-empty text,
/// first entry, then `"Unknown"`. Never returns an empty string.
pub fn resolve_localized(list: &[LocalizedText], preferred: Option<&str>) -> String {
    resolve_localized_opt(list, preferred).unwrap_or_else(|| UNKNOWN_NAME.to_string())
}

pub fn resolve_localized_opt(list: &[LocalizedText], preferred: Option<&str>) -> Option<String> {
    let preferred = preferred.unwrap_or(DEFAULT_LOCALE);
    let picked = list
        .iter()
        .find(|entry| entry.locale == preferred)
        .or_else(|| list.iter().find(|entry| is_english_tag(&entry.locale)))
        .or_else(|| list.iter().find(|entry| !entry.text.trim().is_empty()))
        .or_else(|| list.first())?;
    let text = picked.text.trim();
    if !text.is_empty() {
        return Some(text.to_string());
    }
    // A populated tag with blank text still must not surface as "".
    list.iter()
        .map(|entry| entry.text.trim())
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

fn is_english_tag(tag: &str) -> bool {
    tag.get(..2)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("en"))
}
