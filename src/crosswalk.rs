use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::cache;
use crate::config::CANONICAL_PLATFORM;
use crate::error::{ResolveError, Result};
use crate::remote::http_agent;
use crate::types::{CrosswalkEntry, ScanHit};

#[derive(Debug, Deserialize)]
struct ReleaseMapping {
    game: ReleaseGame,
}

#[derive(Debug, Deserialize)]
struct ReleaseGame {
    #[serde(default)]
    releases: Vec<Release>,
}

#[derive(Debug, Deserialize)]
struct Release {
    platform_id: String,
    external_id: String,
}

/// Maps platform-native ids onto the canonical id space for one foreign
/// source. The cache file is loaded once per resolver and persisted on
/// every update outside of scans; scans batch a single write at the end.
pub(crate) struct CrosswalkResolver {
    source: String,
    cache_path: PathBuf,
    directory_base: String,
    agent: ureq::Agent,
    cache: Option<Vec<CrosswalkEntry>>,
}

impl CrosswalkResolver {
    pub(crate) fn new(source: &str, cache_path: PathBuf, directory_base: &str) -> Self {
        Self {
            source: source.to_string(),
            cache_path,
            directory_base: directory_base.trim_end_matches('/').to_string(),
            agent: http_agent(),
            cache: None,
        }
    }

    fn ensure_cache(&mut self) -> Result<()> {
        if self.cache.is_none() {
            self.cache = Some(cache::load_collection(&self.cache_path)?);
        }
        Ok(())
    }

    fn cached(&self, foreign_id: &str) -> Option<String> {
        self.cache.as_ref().and_then(|entries| {
            entries
                .iter()
                .find(|entry| entry.foreign_id == foreign_id)
                .map(|entry| entry.canonical_id.clone())
        })
    }

    /// Cache-only lookup; never touches the network.
    pub(crate) fn lookup(&mut self, foreign_id: &str) -> Result<Option<String>> {
        self.ensure_cache()?;
        Ok(self.cached(foreign_id))
    }

    /// Cache-then-remote resolution. New mappings are appended and the
    /// cache file is persisted before returning.
    pub(crate) fn resolve(&mut self, foreign_id: &str) -> Result<String> {
        if let Some(canonical) = self.lookup(foreign_id)? {
            return Ok(canonical);
        }
        let canonical = self.resolve_remote(foreign_id)?;
        if let Some(entries) = self.cache.as_mut() {
            entries.push(CrosswalkEntry {
                foreign_id: foreign_id.to_string(),
                canonical_id: canonical.clone(),
            });
            cache::save_collection(&self.cache_path, entries)?;
        }
        Ok(canonical)
    }

    fn resolve_remote(&self, foreign_id: &str) -> Result<String> {
        let url = format!(
            "{}/platforms/{}/external_releases/{}",
            self.directory_base,
            self.source,
            urlencoding::encode(foreign_id)
        );
        let response = self.agent.get(&url).call().map_err(|err| match err {
            ureq::Error::Status(404, _) => ResolveError::Unresolvable {
                foreign_id: foreign_id.to_string(),
            },
            other => ResolveError::RemoteUnavailable {
                reason: other.to_string(),
            },
        })?;
        let mapping: ReleaseMapping =
            response
                .into_json()
                .map_err(|err| ResolveError::RemoteUnavailable {
                    reason: format!("release mapping decode: {err}"),
                })?;
        mapping
            .game
            .releases
            .into_iter()
            .find(|release| release.platform_id == CANONICAL_PLATFORM)
            .map(|release| release.external_id)
            .ok_or_else(|| ResolveError::Unresolvable {
                foreign_id: foreign_id.to_string(),
            })
    }

    /// Enumerate candidate title directories under an emulator save
    /// root (`<root>/<user>/<game>/`) and resolve each one. Entries
    /// that fail to resolve are dropped; one bad title never aborts the
    /// scan. The cache file is written once, after the walk.
    pub(crate) fn scan(&mut self, root: &Path) -> Result<Vec<ScanHit>> {
        self.ensure_cache()?;
        let mut hits = Vec::new();
        let mut added = false;

        for entry in WalkDir::new(root).min_depth(2).max_depth(2) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(target: "trophy::crosswalk", error = %err, "skipping unreadable scan entry");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let Some(foreign_id) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            let canonical = match self.cached(&foreign_id) {
                Some(canonical) => canonical,
                None => match self.resolve_remote(&foreign_id) {
                    Ok(canonical) => {
                        if let Some(entries) = self.cache.as_mut() {
                            entries.push(CrosswalkEntry {
                                foreign_id: foreign_id.clone(),
                                canonical_id: canonical.clone(),
                            });
                        }
                        added = true;
                        canonical
                    }
                    Err(err) => {
                        tracing::debug!(target: "trophy::crosswalk", foreign_id = %foreign_id, error = %err, "dropping unresolved title");
                        continue;
                    }
                },
            };
            hits.push(ScanHit {
                canonical_id: canonical,
                source_path: entry.path().to_path_buf(),
            });
        }

        if added {
            if let Some(entries) = self.cache.as_ref() {
                cache::save_collection(&self.cache_path, entries)?;
            }
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("trophyvault_test")
            .join(format!("crosswalk_{}_{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn seed_cache(path: &Path, rows: &[(&str, &str)]) {
        let entries: Vec<CrosswalkEntry> = rows
            .iter()
            .map(|(foreign, canonical)| CrosswalkEntry {
                foreign_id: foreign.to_string(),
                canonical_id: canonical.to_string(),
            })
            .collect();
        cache::save_collection(path, &entries).unwrap();
    }

    // Answers `count` requests, picking the body by URL substring.
    fn serve(routes: Vec<(&'static str, String, u16)>, count: usize) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let base = format!("http://{}", server.server_addr().to_ip().unwrap());
        std::thread::spawn(move || {
            for _ in 0..count {
                let Ok(request) = server.recv() else { return };
                let url = request.url().to_string();
                let (body, status) = routes
                    .iter()
                    .find(|(needle, _, _)| url.contains(needle))
                    .map(|(_, body, status)| (body.clone(), *status))
                    .unwrap_or_else(|| ("{}".to_string(), 404));
                let response = tiny_http::Response::from_string(body).with_status_code(status);
                let _ = request.respond(response);
            }
        });
        base
    }

    fn mapping_body(steam_id: &str) -> String {
        format!(
            r#"{{"game":{{"releases":[{{"platform_id":"gog","external_id":"g"}},{{"platform_id":"steam","external_id":"{steam_id}"}}]}}}}"#
        )
    }

    #[test]
    fn test_lookup_is_cache_only() {
        let dir = temp_dir("lookup");
        let cache_path = dir.join("gog.json");
        seed_cache(&cache_path, &[("g1", "100")]);

        // An unreachable directory base proves no network is involved.
        let mut resolver = CrosswalkResolver::new("gog", cache_path, "http://127.0.0.1:1");
        assert_eq!(resolver.lookup("g1").unwrap(), Some("100".to_string()));
        assert_eq!(resolver.lookup("g1").unwrap(), Some("100".to_string()));
        assert_eq!(resolver.lookup("g2").unwrap(), None);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_resolve_remote_persists_entry() {
        let dir = temp_dir("resolve");
        let cache_path = dir.join("gog.json");
        let base = serve(vec![("/external_releases/g2", mapping_body("220"), 200)], 1);

        let mut resolver = CrosswalkResolver::new("gog", cache_path.clone(), &base);
        assert_eq!(resolver.resolve("g2").unwrap(), "220");

        let persisted: Vec<CrosswalkEntry> = cache::load_collection(&cache_path).unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].canonical_id, "220");

        // Second resolution must come from the cache (server is done).
        assert_eq!(resolver.resolve("g2").unwrap(), "220");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_resolve_without_canonical_release() {
        let dir = temp_dir("unresolvable");
        let body = r#"{"game":{"releases":[{"platform_id":"gog","external_id":"g3"}]}}"#;
        let base = serve(vec![("/external_releases/g3", body.to_string(), 200)], 1);

        let mut resolver = CrosswalkResolver::new("gog", dir.join("gog.json"), &base);
        let err = resolver.resolve("g3").unwrap_err();
        assert!(matches!(err, ResolveError::Unresolvable { .. }));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_scan_drops_failures_and_persists_once() {
        let dir = temp_dir("scan");
        let root = dir.join("saves");
        std::fs::create_dir_all(root.join("user1").join("gameA")).unwrap();
        std::fs::create_dir_all(root.join("user1").join("gameB")).unwrap();
        std::fs::create_dir_all(root.join("user1").join("gameC")).unwrap();

        let cache_path = dir.join("gog.json");
        seed_cache(&cache_path, &[("gameA", "100")]);

        // gameB resolves remotely; gameC has no mapping and is dropped.
        let base = serve(
            vec![
                ("/external_releases/gameB", mapping_body("200"), 200),
                ("/external_releases/gameC", String::new(), 404),
            ],
            2,
        );

        let mut resolver = CrosswalkResolver::new("gog", cache_path.clone(), &base);
        let mut hits = resolver.scan(&root).unwrap();
        hits.sort_by(|a, b| a.canonical_id.cmp(&b.canonical_id));

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].canonical_id, "100");
        assert_eq!(hits[1].canonical_id, "200");

        let persisted: Vec<CrosswalkEntry> = cache::load_collection(&cache_path).unwrap();
        assert_eq!(persisted.len(), 2);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_scan_of_missing_root_is_empty() {
        let dir = temp_dir("scan_missing");
        let mut resolver =
            CrosswalkResolver::new("gog", dir.join("gog.json"), "http://127.0.0.1:1");
        let hits = resolver.scan(&dir.join("nope")).unwrap();
        assert!(hits.is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }
}
