use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub(crate) type Result<T> = std::result::Result<T, ResolveError>;

/// Canonical error surface for schema and identity resolution.
///
/// Three families: transient remote failures (fall through to the next
/// tier), per-unit data errors (logged and skipped by the surrounding
/// batch), and fatal-to-request errors surfaced to the caller.
#[derive(Debug, Error)]
pub(crate) enum ResolveError {
    #[error("I/O error: {source}")]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    #[error("serialization error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("cache file is corrupt: {path}: {reason}")]
    CorruptCache { path: PathBuf, reason: String },

    #[error("remote service unavailable: {reason}")]
    RemoteUnavailable { reason: String },

    #[error("remote service has no schema for {appid}")]
    RemoteMiss { appid: String },

    #[error("no release mapping for foreign id {foreign_id}")]
    Unresolvable { foreign_id: String },

    #[error("platform installation not available: {reason}")]
    NotInstalled { reason: String },

    #[error("{appid} not found in the local installation indexes")]
    NotFound { appid: String },

    #[error("unexpected archive content: {path}: {reason}")]
    CorruptArchive { path: PathBuf, reason: String },

    #[error("no english achievement list for {appid}")]
    NoEnglishList { appid: String },

    #[error("unsupported locale: {code}")]
    UnsupportedLocale { code: String },

    #[error("configuration entry has no resolvable name")]
    NoName,

    #[error("schema unavailable for {appid}: {source}")]
    SchemaUnavailable {
        appid: String,
        #[source]
        source: Box<ResolveError>,
    },
}

impl ResolveError {
    pub(crate) fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ResolveError::Io {
            source,
            path: Some(path.into()),
        }
    }
}
