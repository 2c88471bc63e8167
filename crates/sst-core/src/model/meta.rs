//! Per-unit size and type tags, kept in the theme document.
//!
//! The theme is otherwise opaque: entries are keyed by unit number and keys
//! this module does not own are carried through untouched.

use serde::{Deserialize, Serialize};

use super::range::Unit;
use super::snapshot::Theme;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMeta {
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

impl UnitMeta {
    /// Read `unit`'s entry. A missing entry reads as empty.
    ///
    /// # Errors
    ///
    /// Returns the decode error when the entry is not a `{sizes, types}`
    /// object.
    pub fn from_theme(theme: &Theme, unit: Unit) -> Result<Self, serde_json::Error> {
        match theme.get(&unit.to_string()) {
            Some(value) => Self::deserialize(value),
            None => Ok(Self::default()),
        }
    }

    /// Replace `unit`'s entry.
    ///
    /// # Errors
    ///
    /// Returns the encode error from `serde_json`.
    pub fn write_to(&self, theme: &mut Theme, unit: Unit) -> Result<(), serde_json::Error> {
        theme.insert(unit.to_string(), serde_json::to_value(self)?);
        Ok(())
    }
}

/// Trim tags, drop blanks, and keep the first of any repeats.
#[must_use]
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|seen| seen == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_keyed_by_unit_and_other_keys_survive() -> Result<(), serde_json::Error> {
        let mut theme: Theme = serde_json::from_str(r##"{"accent":"#336699"}"##)?;
        assert_eq!(UnitMeta::from_theme(&theme, 4)?, UnitMeta::default());

        let meta = UnitMeta {
            sizes: vec!["10x10".to_string()],
            types: vec!["drive-up".to_string()],
        };
        meta.write_to(&mut theme, 4)?;
        assert_eq!(
            serde_json::to_string(&theme)?,
            r##"{"4":{"sizes":["10x10"],"types":["drive-up"]},"accent":"#336699"}"##
        );
        assert_eq!(UnitMeta::from_theme(&theme, 4)?, meta);
        Ok(())
    }

    #[test]
    fn malformed_entry_is_an_error() {
        let theme: Theme = serde_json::from_str(r#"{"4":"big"}"#).expect("theme");
        assert!(UnitMeta::from_theme(&theme, 4).is_err());
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let raw = [" 5x5", "", "5x5 ", "climate"].map(String::from);
        assert_eq!(normalize_tags(&raw), vec!["5x5", "climate"]);
    }
}
