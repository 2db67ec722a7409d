use std::path::PathBuf;

use crate::cache;
use crate::error::{ResolveError, Result};
use crate::extractor::Extractor;
use crate::locale;
use crate::remote::SchemaService;
use crate::types::{ResolvedSchema, SchemaRecord};

/// Tiered schema resolution: local cache, then the remote schema
/// service, then extraction from the local installation. Tiers are
/// tried strictly once, in order; callers wanting a retry re-invoke
/// the whole resolution.
pub(crate) struct SchemaResolver<S: SchemaService> {
    cache_root: PathBuf,
    service: S,
    extractor: Extractor,
}

impl<S: SchemaService> SchemaResolver<S> {
    pub(crate) fn new(cache_root: PathBuf, service: S, extractor: Extractor) -> Self {
        Self {
            cache_root,
            service,
            extractor,
        }
    }

    fn schema_cache_path(&self, appid: &str) -> PathBuf {
        self.cache_root.join("schema").join(format!("{appid}.json"))
    }

    pub(crate) fn resolve(&self, appid: &str, language: &str) -> Result<ResolvedSchema> {
        let schema = self.obtain(appid)?;
        let list = locale::select(&schema, language)?.clone();
        let selected = if schema.achievement.list.contains_key(language) {
            language
        } else {
            locale::ENGLISH
        };
        Ok(ResolvedSchema {
            language: selected.to_string(),
            list,
            schema,
        })
    }

    fn obtain(&self, appid: &str) -> Result<SchemaRecord> {
        let cache_path = self.schema_cache_path(appid);
        match cache::load_record::<SchemaRecord>(&cache_path) {
            Ok(Some(schema)) => {
                tracing::debug!(target: "trophy::resolve", appid, "schema cache hit");
                return Ok(schema);
            }
            Ok(None) => {}
            // A corrupt cache file is one bad unit; fall through and
            // let a later tier overwrite it.
            Err(err) => {
                tracing::warn!(target: "trophy::resolve", appid, error = %err, "schema cache unreadable, treating as miss");
            }
        }

        match self.service.fetch(appid, None) {
            Ok(schema) => {
                cache::save_record(&cache_path, &schema)?;
                tracing::debug!(target: "trophy::resolve", appid, "schema fetched from remote service");
                return Ok(schema);
            }
            Err(err) => {
                tracing::debug!(target: "trophy::resolve", appid, error = %err, "remote schema fetch failed, trying local extraction");
            }
        }

        let schema = match self.extractor.extract(appid) {
            Ok(schema) => schema,
            Err(err) => {
                return Err(ResolveError::SchemaUnavailable {
                    appid: appid.to_string(),
                    source: Box::new(err),
                });
            }
        };
        cache::save_record(&cache_path, &schema)?;

        // Share-back is opportunistic; its outcome never changes the
        // resolution result.
        let image_dir = self.cache_root.join("img").join(appid);
        match self.service.share(&schema, &image_dir) {
            Ok(()) => {
                tracing::debug!(target: "trophy::resolve", appid, "schema shared back to remote service");
            }
            Err(err) => {
                tracing::warn!(target: "trophy::resolve", appid, error = %err, "schema share-back failed");
            }
        }
        Ok(schema)
    }
}
