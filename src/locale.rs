use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, Result};
use crate::types::{AchievementDefinition, SchemaRecord};

pub(crate) const ENGLISH: &str = "english";

/// One entry of the canonical platform language table. `api` keys the
/// per-language achievement lists, `webapi` is the short web code, and
/// `iso` the locale code used by archive file names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct LanguageDescriptor {
    pub(crate) api: String,
    pub(crate) webapi: String,
    pub(crate) iso: String,
}

// (api, webapi, iso)
const LANGUAGES: &[(&str, &str, &str)] = &[
    ("arabic", "ar", "ar-SA"),
    ("bulgarian", "bg", "bg-BG"),
    ("schinese", "zh-CN", "zh-CN"),
    ("tchinese", "zh-TW", "zh-TW"),
    ("czech", "cs", "cs-CZ"),
    ("danish", "da", "da-DK"),
    ("dutch", "nl", "nl-NL"),
    ("english", "en", "en-US"),
    ("finnish", "fi", "fi-FI"),
    ("french", "fr", "fr-FR"),
    ("german", "de", "de-DE"),
    ("greek", "el", "el-GR"),
    ("hungarian", "hu", "hu-HU"),
    ("italian", "it", "it-IT"),
    ("japanese", "ja", "ja-JP"),
    ("koreana", "ko", "ko-KR"),
    ("norwegian", "no", "nb-NO"),
    ("polish", "pl", "pl-PL"),
    ("portuguese", "pt", "pt-PT"),
    ("brazilian", "pt-BR", "pt-BR"),
    ("romanian", "ro", "ro-RO"),
    ("russian", "ru", "ru-RU"),
    ("spanish", "es", "es-ES"),
    ("latam", "es-419", "es-MX"),
    ("swedish", "sv", "sv-SE"),
    ("thai", "th", "th-TH"),
    ("turkish", "tr", "tr-TR"),
    ("ukrainian", "uk", "uk-UA"),
    ("vietnamese", "vn", "vi-VN"),
];

/// Map a locale code from an archive file name to its canonical
/// descriptor: exact ISO match first, then a substring match against
/// the web-API code (so `en-GB` still binds to english).
pub(crate) fn language_for_iso(iso: &str) -> Result<LanguageDescriptor> {
    LANGUAGES
        .iter()
        .find(|(_, _, table_iso)| *table_iso == iso)
        .or_else(|| LANGUAGES.iter().find(|(_, webapi, _)| iso.contains(webapi)))
        .map(|&(api, webapi, table_iso)| LanguageDescriptor {
            api: api.to_string(),
            webapi: webapi.to_string(),
            iso: table_iso.to_string(),
        })
        .ok_or_else(|| ResolveError::UnsupportedLocale {
            code: iso.to_string(),
        })
}

/// Narrow a schema to one language: the requested list if present, the
/// english list otherwise. Borrows only; the other language lists stay
/// intact because the full record may be cached or shared again.
pub(crate) fn select<'a>(
    schema: &'a SchemaRecord,
    language: &str,
) -> Result<&'a Vec<AchievementDefinition>> {
    schema
        .achievement
        .list
        .get(language)
        .or_else(|| schema.achievement.list.get(ENGLISH))
        .ok_or_else(|| ResolveError::UnsupportedLocale {
            code: language.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AchievementBlock, ImageSet};

    fn definition(name: &str) -> AchievementDefinition {
        AchievementDefinition {
            name: name.to_string(),
            display_name: format!("Display {name}"),
            description: format!("Description {name}"),
            icon: format!("/img/{name}.png"),
            icon_gray: format!("/img/{name}.png"),
        }
    }

    fn sample_schema() -> SchemaRecord {
        let mut block = AchievementBlock::default();
        block.list.insert(
            "english".to_string(),
            vec![definition("A"), definition("B"), definition("C")],
        );
        block
            .list
            .insert("french".to_string(), vec![definition("A"), definition("B")]);
        block.total = 3;
        SchemaRecord {
            name: "Sample".to_string(),
            appid: "42".to_string(),
            system: "uplay".to_string(),
            img: ImageSet::default(),
            languages: Vec::new(),
            achievement: block,
        }
    }

    #[test]
    fn test_language_for_iso_exact() {
        let lang = language_for_iso("fr-FR").unwrap();
        assert_eq!(lang.api, "french");
        assert_eq!(lang.webapi, "fr");
    }

    #[test]
    fn test_language_for_iso_substring() {
        let lang = language_for_iso("en-GB").unwrap();
        assert_eq!(lang.api, "english");
    }

    #[test]
    fn test_language_for_iso_unknown() {
        let err = language_for_iso("xx-XX").unwrap_err();
        assert!(matches!(
            err,
            ResolveError::UnsupportedLocale { code } if code == "xx-XX"
        ));
    }

    #[test]
    fn test_select_requested_language() {
        let schema = sample_schema();
        let list = select(&schema, "french").unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_select_falls_back_to_english() {
        let schema = sample_schema();
        let list = select(&schema, "german").unwrap();
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_select_does_not_mutate() {
        let schema = sample_schema();
        let _ = select(&schema, "french").unwrap();
        assert_eq!(schema.achievement.list["english"].len(), 3);
        assert_eq!(schema.achievement.list["french"].len(), 2);
    }

    #[test]
    fn test_select_without_english_fails() {
        let mut schema = sample_schema();
        schema.achievement.list.remove("english");
        let err = select(&schema, "german").unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedLocale { .. }));
    }
}
