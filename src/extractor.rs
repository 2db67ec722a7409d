use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use regex::Regex;

use crate::error::{ResolveError, Result};
use crate::locale::{self, LanguageDescriptor};
use crate::types::{
    AchievementBlock, AchievementDefinition, ImageSet, LocalArchiveEntry, LocalIndexEntry,
    SchemaRecord,
};

pub(crate) const SYSTEM: &str = "uplay";

/// Each structured document in the configuration store starts with this
/// literal; everything before the first occurrence is binary garbage.
const VERSION_MARKER: &str = "version: 2.0";

/// Entry that must be present for an achievement archive to be trusted.
const ARCHIVE_MARKER: &str = "achievements.dat";

static ARCHIVE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)_([^_]+)").expect("archive name pattern"));
static IMAGE_ENTRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+").expect("image entry pattern"));
static LOCALE_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z]+-[A-Z]+)_loc\.txt").expect("locale entry pattern"));

// Ordered name sources for a configuration document. The store mixes
// documents wrapped in a `root` envelope with bare ones, so every path
// starting with `root` is also probed without it.
const NAME_SOURCES: &[&[&str]] = &[
    &["root", "installer", "game_identifier"],
    &["localizations", "default", "l1"],
    &["root", "name"],
];

// Image anchors: a primary field that may hold a placeholder literal,
// and the localized fallback holding the real asset name.
struct ImageSource {
    primary: &'static [&'static str],
    localized: &'static [&'static str],
    placeholder: &'static str,
}

const BACKGROUND_SOURCE: ImageSource = ImageSource {
    primary: &["root", "background_image"],
    localized: &["localizations", "default", "BACKGROUNDIMAGE"],
    placeholder: "BACKGROUNDIMAGE",
};
const HEADER_SOURCE: ImageSource = ImageSource {
    primary: &["root", "logo_image"],
    localized: &["localizations", "default", "LOGOIMAGE"],
    placeholder: "LOGOIMAGE",
};
const ICON_SOURCE: ImageSource = ImageSource {
    primary: &["root", "icon_image"],
    localized: &["localizations", "default", "ICONIMAGE"],
    placeholder: "ICONIMAGE",
};

/// Extracts normalized achievement schemas from a local platform
/// installation. The two sub-indexes are built once on first use and
/// reused for the lifetime of the extractor.
pub(crate) struct Extractor {
    install_dir: Option<PathBuf>,
    cache_root: PathBuf,
    index: OnceCell<Vec<LocalIndexEntry>>,
    archives: OnceCell<Vec<LocalArchiveEntry>>,
}

impl Extractor {
    pub(crate) fn new(install_dir: Option<PathBuf>, cache_root: PathBuf) -> Self {
        Self {
            install_dir,
            cache_root,
            index: OnceCell::new(),
            archives: OnceCell::new(),
        }
    }

    fn require_install_dir(&self) -> Result<&Path> {
        match self.install_dir.as_deref() {
            Some(dir) if dir.is_dir() => Ok(dir),
            Some(dir) => Err(ResolveError::NotInstalled {
                reason: format!("{} does not exist", dir.display()),
            }),
            None => Err(ResolveError::NotInstalled {
                reason: "no install dir configured (set --install-dir or TROPHYVAULT_INSTALL_DIR)"
                    .to_string(),
            }),
        }
    }

    /// Titles declared in the configuration store, keyed by archive
    /// index. Built once.
    pub(crate) fn configuration_index(&self) -> Result<&[LocalIndexEntry]> {
        self.index
            .get_or_try_init(|| self.build_configuration_index())
            .map(Vec::as_slice)
    }

    /// Achievement archives present on disk, keyed by numeric appid.
    /// Built once.
    pub(crate) fn archive_index(&self) -> Result<&[LocalArchiveEntry]> {
        self.archives
            .get_or_try_init(|| self.build_archive_index())
            .map(Vec::as_slice)
    }

    fn build_configuration_index(&self) -> Result<Vec<LocalIndexEntry>> {
        let install = self.require_install_dir()?;
        let file = install.join("cache/configuration/configurations");
        if !file.exists() {
            return Err(ResolveError::NotInstalled {
                reason: format!("no configuration store at {}", file.display()),
            });
        }

        tracing::debug!(target: "trophy::index", file = %file.display(), "parsing configuration store");
        let raw = fs::read(&file).map_err(|e| ResolveError::io(e, &file))?;
        let text = printable_only(&raw);

        let mut entries = Vec::new();
        // The first split segment is the pre-marker garbage.
        for (i, segment) in text.split(VERSION_MARKER).enumerate().skip(1) {
            let cleaned = clean_segment(segment);
            let doc: serde_yaml::Value = match serde_yaml::from_str(&cleaned) {
                Ok(doc) => doc,
                Err(err) => {
                    tracing::debug!(target: "trophy::index", segment = i, error = %err, "segment failed to parse");
                    continue;
                }
            };

            let name = match resolve_name(&doc) {
                Ok(name) => name,
                Err(err) => {
                    tracing::debug!(target: "trophy::index", segment = i, error = %err, "segment skipped");
                    continue;
                }
            };
            let Some(archive) = field_str(&doc, &["root", "uplay", "achievements"]) else {
                tracing::debug!(target: "trophy::index", name = %name, "no achievements anchor");
                continue;
            };

            let background = resolve_image(&doc, &BACKGROUND_SOURCE);
            let header = resolve_image(&doc, &HEADER_SOURCE);
            let icon = resolve_image(&doc, &ICON_SOURCE);
            if background.is_none() && header.is_none() && icon.is_none() {
                tracing::debug!(target: "trophy::index", name = %name, "no image anchors");
            }

            entries.push(LocalIndexEntry {
                index: archive.trim_end_matches(".zip").to_string(),
                name,
                background,
                header,
                icon,
            });
        }
        tracing::debug!(target: "trophy::index", entries = entries.len(), "configuration index built");
        Ok(entries)
    }

    fn build_archive_index(&self) -> Result<Vec<LocalArchiveEntry>> {
        let dir = self.require_install_dir()?.join("cache/achievements");
        let mut list = Vec::new();
        let read = fs::read_dir(&dir).map_err(|e| ResolveError::io(e, &dir))?;
        for entry in read {
            let Ok(entry) = entry else { continue };
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(caps) = ARCHIVE_NAME.captures(name) else {
                continue;
            };
            list.push(LocalArchiveEntry {
                appid: caps[1].to_string(),
                index: caps[2].trim_end_matches(".zip").to_string(),
                archive_path: entry.path(),
            });
        }
        Ok(list)
    }

    /// Build the schema for one canonical appid from the local archive.
    pub(crate) fn extract(&self, appid: &str) -> Result<SchemaRecord> {
        let archive_entry = self
            .archive_index()?
            .iter()
            .find(|entry| entry.appid == appid)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound {
                appid: appid.to_string(),
            })?;
        let index_entry = self
            .configuration_index()?
            .iter()
            .find(|entry| entry.index == archive_entry.index)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound {
                appid: appid.to_string(),
            })?;

        tracing::debug!(target: "trophy::extract", name = %index_entry.name, appid = %appid, "generating schema from local archive");

        let image_dir = self.cache_root.join("img").join(appid);
        let file = fs::File::open(&archive_entry.archive_path)
            .map_err(|e| ResolveError::io(e, &archive_entry.archive_path))?;
        let mut archive =
            zip::ZipArchive::new(file).map_err(|err| ResolveError::CorruptArchive {
                path: archive_entry.archive_path.clone(),
                reason: err.to_string(),
            })?;
        if archive.index_for_name(ARCHIVE_MARKER).is_none() {
            return Err(ResolveError::CorruptArchive {
                path: archive_entry.archive_path.clone(),
                reason: format!("missing {ARCHIVE_MARKER} marker"),
            });
        }

        let mut list: BTreeMap<String, Vec<AchievementDefinition>> = BTreeMap::new();
        let mut languages: Vec<LanguageDescriptor> = Vec::new();

        for i in 0..archive.len() {
            let mut entry = match archive.by_index(i) {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(target: "trophy::extract", index = i, error = %err, "archive entry skipped");
                    continue;
                }
            };
            let entry_name = entry.name().to_string();

            if IMAGE_ENTRY.is_match(&entry_name) {
                if let Err(err) = extract_asset(&mut entry, &image_dir.join(&entry_name)) {
                    tracing::debug!(target: "trophy::extract", entry = %entry_name, error = %err, "image entry skipped");
                }
            } else if let Some(caps) = LOCALE_ENTRY.captures(&entry_name) {
                let iso = caps[1].to_string();
                tracing::debug!(target: "trophy::extract", entry = %entry_name, "parsing locale file");
                let lang = match locale::language_for_iso(&iso) {
                    Ok(lang) => lang,
                    Err(err) => {
                        tracing::debug!(target: "trophy::extract", entry = %entry_name, error = %err, "locale skipped");
                        continue;
                    }
                };
                // First-seen wins when two files map to one language.
                if list.contains_key(&lang.api) {
                    tracing::debug!(target: "trophy::extract", lang = %lang.api, iso = %iso, "language already populated, discarding");
                    continue;
                }
                let mut content = String::new();
                if let Err(err) = entry.read_to_string(&mut content) {
                    tracing::debug!(target: "trophy::extract", entry = %entry_name, error = %err, "locale unreadable, skipped");
                    continue;
                }
                list.insert(lang.api.clone(), parse_locale_rows(&content, &image_dir));
                languages.push(lang);
            }
        }

        let total = list
            .get(locale::ENGLISH)
            .map(Vec::len)
            .ok_or_else(|| ResolveError::NoEnglishList {
                appid: appid.to_string(),
            })?;

        let install = self.require_install_dir()?;
        let img = copy_title_images(install, &index_entry, &image_dir);

        Ok(SchemaRecord {
            name: index_entry.name,
            appid: appid.to_string(),
            system: SYSTEM.to_string(),
            img,
            languages,
            achievement: AchievementBlock { total, list },
        })
    }
}

// Strip every byte outside printable ASCII, keeping line structure.
fn printable_only(raw: &[u8]) -> String {
    raw.iter()
        .copied()
        .filter(|&b| (0x20..=0x7e).contains(&b) || b == b'\n' || b == b'\r' || b == b'\t')
        .map(char::from)
        .collect()
}

// Drop comment lines and lines without a key:value delimiter; what
// remains parses as a plain document.
fn clean_segment(segment: &str) -> String {
    segment
        .lines()
        .filter(|line| !line.contains('#'))
        .filter(|line| line.contains(':'))
        .collect::<Vec<_>>()
        .join("\n")
}

fn lookup<'a>(doc: &'a serde_yaml::Value, path: &[&str]) -> Option<&'a serde_yaml::Value> {
    let mut current = doc;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

fn yaml_str(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn field_str(doc: &serde_yaml::Value, path: &[&str]) -> Option<String> {
    if let Some(value) = lookup(doc, path).and_then(yaml_str) {
        return Some(value);
    }
    if path.first() == Some(&"root") {
        return lookup(doc, &path[1..]).and_then(yaml_str);
    }
    None
}

fn resolve_name(doc: &serde_yaml::Value) -> Result<String> {
    for path in NAME_SOURCES {
        if let Some(name) = field_str(doc, path) {
            return Ok(name);
        }
    }
    Err(ResolveError::NoName)
}

fn resolve_image(doc: &serde_yaml::Value, source: &ImageSource) -> Option<String> {
    match field_str(doc, source.primary) {
        Some(value) if value != source.placeholder => Some(value),
        _ => field_str(doc, source.localized),
    }
}

fn parse_locale_rows(content: &str, image_dir: &Path) -> Vec<AchievementDefinition> {
    content
        .trim()
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut cols = line.split('\t');
            let name = cols.next().unwrap_or_default().to_string();
            let display_name = cols.next().unwrap_or_default().to_string();
            let description = cols.next().unwrap_or_default().to_string();
            let icon = image_dir
                .join(format!("{name}.png"))
                .to_string_lossy()
                .replace('\\', "/");
            AchievementDefinition {
                icon_gray: icon.clone(),
                icon,
                name,
                display_name,
                description,
            }
        })
        .collect()
}

fn extract_asset(reader: &mut impl Read, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| ResolveError::io(e, parent))?;
    }
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| ResolveError::io(e, dest))?;
    fs::write(dest, bytes).map_err(|e| ResolveError::io(e, dest))?;
    Ok(())
}

// Copy the title's store assets into its image cache dir. Each asset is
// independent; a failure leaves that field empty.
fn copy_title_images(install: &Path, entry: &LocalIndexEntry, image_dir: &Path) -> ImageSet {
    let assets = install.join("cache/assets");
    let games = install.join("data/games");
    ImageSet {
        background: copy_asset(&assets, entry.background.as_deref(), image_dir, "background"),
        header: copy_asset(&assets, entry.header.as_deref(), image_dir, "header"),
        icon: copy_asset(&games, entry.icon.as_deref(), image_dir, "icon"),
    }
}

fn copy_asset(
    source_dir: &Path,
    asset: Option<&str>,
    image_dir: &Path,
    stem: &str,
) -> Option<String> {
    let asset = asset?;
    let file_name = match Path::new(asset).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    };
    let source = source_dir.join(asset);
    let dest = image_dir.join(file_name);
    let copied = fs::create_dir_all(image_dir).and_then(|_| fs::copy(&source, &dest));
    match copied {
        Ok(_) => Some(dest.to_string_lossy().replace('\\', "/")),
        Err(err) => {
            tracing::debug!(target: "trophy::extract", asset = %asset, error = %err, "asset copy failed");
            None
        }
    }
}
