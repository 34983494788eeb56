//! Language name and code lookup

use crate::core::errors::{Result, TranslationError};

/// Code used for automatic source detection
pub const AUTO: &str = "auto";

/// Display name and provider code, `Auto` first
pub const LANGUAGES: &[(&str, &str)] = &[
    ("Auto", AUTO),
    ("English", "en"),
    ("Spanish", "es"),
    ("French", "fr"),
    ("German", "de"),
    ("Italian", "it"),
    ("Portuguese", "pt"),
    ("Russian", "ru"),
    ("Chinese (Simplified)", "zh"),
    ("Chinese (Traditional)", "zh-TW"),
    ("Japanese", "ja"),
    ("Korean", "ko"),
    ("Arabic", "ar"),
    ("Hindi", "hi"),
    ("Bengali", "bn"),
    ("Urdu", "ur"),
    ("Persian", "fa"),
    ("Turkish", "tr"),
    ("Polish", "pl"),
    ("Dutch", "nl"),
    ("Swedish", "sv"),
    ("Danish", "da"),
    ("Norwegian", "no"),
    ("Finnish", "fi"),
    ("Greek", "el"),
    ("Hebrew", "he"),
];

/// Code for a display name or code, case-insensitive
pub fn code_for(language: &str) -> Option<&'static str> {
    let language = language.trim();
    LANGUAGES
        .iter()
        .find(|(name, code)| name.eq_ignore_ascii_case(language) || code.eq_ignore_ascii_case(language))
        .map(|(_, code)| *code)
}

/// Display name for a code
pub fn name_for(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(_, c)| c.eq_ignore_ascii_case(code))
        .map(|(name, _)| *name)
}

/// All display names, `Auto` first
pub fn supported() -> Vec<&'static str> {
    LANGUAGES.iter().map(|(name, _)| *name).collect()
}

/// Resolve a source language; `Auto` is allowed
pub fn resolve_source(language: &str) -> Result<&'static str> {
    code_for(language).ok_or_else(|| TranslationError::UnsupportedLanguage {
        language: language.to_string(),
    })
}

/// Resolve a target language; `Auto` is rejected
pub fn resolve_target(language: &str) -> Result<&'static str> {
    match code_for(language) {
        Some(AUTO) => Err(TranslationError::UnsupportedLanguage {
            language: "Cannot translate to 'Auto' language".to_string(),
        }),
        Some(code) => Ok(code),
        None => Err(TranslationError::UnsupportedLanguage {
            language: language.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_and_codes_resolve() {
        assert_eq!(code_for("Spanish"), Some("es"));
        assert_eq!(code_for("spanish"), Some("es"));
        assert_eq!(code_for("zh-tw"), Some("zh-TW"));
        assert_eq!(code_for("Klingon"), None);
        assert_eq!(name_for("ja"), Some("Japanese"));
    }

    #[test]
    fn test_auto_only_valid_as_source() {
        assert_eq!(resolve_source("Auto").unwrap(), AUTO);
        assert!(resolve_target("Auto").is_err());
        assert!(resolve_target("Klingon").is_err());
        assert_eq!(resolve_target("German").unwrap(), "de");
    }

    #[test]
    fn test_supported_lists_auto_first() {
        let languages = supported();
        assert_eq!(languages[0], "Auto");
        assert_eq!(languages.len(), LANGUAGES.len());
    }
}
