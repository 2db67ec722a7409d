use std::env;
use std::path::PathBuf;

pub(crate) const DEFAULT_CACHE_DIR: &str = "./trophyvault_cache";
const DEFAULT_SCHEMA_API: &str = "https://api.trophyvault.io/uplay";
const DEFAULT_GAMESDB_API: &str = "https://gamesdb.gog.com";

/// Platform tag identifying the canonical id space in release mappings.
pub(crate) const CANONICAL_PLATFORM: &str = "steam";

pub(crate) fn env_optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Resolved runtime paths and endpoints. Precedence per field:
/// CLI argument, then environment, then built-in default.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) cache_root: PathBuf,
    pub(crate) install_dir: Option<PathBuf>,
    pub(crate) schema_api_base: String,
    pub(crate) gamesdb_base: String,
}

impl Config {
    pub(crate) fn resolve(cache_root: Option<PathBuf>, install_dir: Option<PathBuf>) -> Self {
        let cache_root = cache_root
            .or_else(|| env_optional("TROPHYVAULT_CACHE_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));
        let install_dir =
            install_dir.or_else(|| env_optional("TROPHYVAULT_INSTALL_DIR").map(PathBuf::from));
        let schema_api_base = env_optional("TROPHYVAULT_SCHEMA_API")
            .unwrap_or_else(|| DEFAULT_SCHEMA_API.to_string());
        let gamesdb_base = env_optional("TROPHYVAULT_GAMESDB_API")
            .unwrap_or_else(|| DEFAULT_GAMESDB_API.to_string());
        Self {
            cache_root,
            install_dir,
            schema_api_base,
            gamesdb_base,
        }
    }

    pub(crate) fn crosswalk_cache_path(&self, source: &str) -> PathBuf {
        self.cache_root
            .join("crosswalk")
            .join(format!("{source}.json"))
    }
}
