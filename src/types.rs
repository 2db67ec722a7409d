use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::locale::LanguageDescriptor;

/// One crosswalk cache row: a platform-native id bound to its canonical
/// (Steam-equivalent) id. Immutable once written; last write wins on a
/// duplicate foreign id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CrosswalkEntry {
    pub(crate) foreign_id: String,
    pub(crate) canonical_id: String,
}

/// A title discovered in the platform's configuration store. `index` is
/// the opaque key binding the title to its achievement archive.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct LocalIndexEntry {
    pub(crate) index: String,
    pub(crate) name: String,
    pub(crate) background: Option<String>,
    pub(crate) header: Option<String>,
    pub(crate) icon: Option<String>,
}

/// An achievement archive discovered on disk, keyed by numeric appid.
#[derive(Debug, Clone)]
pub(crate) struct LocalArchiveEntry {
    pub(crate) appid: String,
    pub(crate) index: String,
    pub(crate) archive_path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ImageSet {
    pub(crate) background: Option<String>,
    pub(crate) header: Option<String>,
    pub(crate) icon: Option<String>,
}

/// One achievement definition within one language list. `name` is the
/// internal identifier and is unique within its list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AchievementDefinition {
    pub(crate) name: String,
    #[serde(rename = "displayName")]
    pub(crate) display_name: String,
    pub(crate) description: String,
    pub(crate) icon: String,
    #[serde(rename = "icongray")]
    pub(crate) icon_gray: String,
}

/// `total` always equals the length of the english list; every other
/// key was populated by exactly one locale source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct AchievementBlock {
    pub(crate) total: usize,
    pub(crate) list: BTreeMap<String, Vec<AchievementDefinition>>,
}

/// The normalized, language-aware achievement schema for one title.
/// Wire field names follow the remote schema service's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SchemaRecord {
    pub(crate) name: String,
    pub(crate) appid: String,
    pub(crate) system: String,
    #[serde(default)]
    pub(crate) img: ImageSet,
    #[serde(rename = "game_lang", default)]
    pub(crate) languages: Vec<LanguageDescriptor>,
    pub(crate) achievement: AchievementBlock,
}

/// A schema narrowed to one language. The full record is kept alongside
/// the selected list so it can be cached or shared again later.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ResolvedSchema {
    pub(crate) language: String,
    pub(crate) list: Vec<AchievementDefinition>,
    pub(crate) schema: SchemaRecord,
}

/// One title discovered by a crosswalk scan.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ScanHit {
    pub(crate) canonical_id: String,
    pub(crate) source_path: PathBuf,
}
