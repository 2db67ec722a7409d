use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ResolveError, Result};
use crate::types::SchemaRecord;

// 2 minutes: prevents hanging on unresponsive external services.
const HTTP_TIMEOUT_MS: u64 = 120_000;

pub(crate) fn http_agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_millis(HTTP_TIMEOUT_MS))
        .timeout_read(Duration::from_millis(HTTP_TIMEOUT_MS))
        .timeout_write(Duration::from_millis(HTTP_TIMEOUT_MS))
        .build()
}

/// The remote schema service seam the resolver is wired through.
pub(crate) trait SchemaService {
    /// Fetch the full multi-language schema for a canonical appid.
    fn fetch(&self, appid: &str, lang: Option<&str>) -> Result<SchemaRecord>;

    /// Share a locally extracted schema (plus its image assets) back to
    /// the service. Best-effort from the caller's point of view.
    fn share(&self, schema: &SchemaRecord, image_dir: &Path) -> Result<()>;
}

// The service wraps every answer in {"data": ...} or {"error": ...}.
#[derive(Debug, Deserialize)]
struct SchemaEnvelope {
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    data: Option<SchemaRecord>,
}

pub(crate) struct HttpSchemaService {
    base: String,
    agent: ureq::Agent,
}

impl HttpSchemaService {
    pub(crate) fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            agent: http_agent(),
        }
    }
}

impl SchemaService for HttpSchemaService {
    fn fetch(&self, appid: &str, lang: Option<&str>) -> Result<SchemaRecord> {
        let mut url = format!("{}/ach/{}", self.base, urlencoding::encode(appid));
        if let Some(lang) = lang {
            url.push_str("?lang=");
            url.push_str(&urlencoding::encode(lang));
        }
        let response = self.agent.get(&url).call().map_err(|err| match err {
            ureq::Error::Status(404, _) => ResolveError::RemoteMiss {
                appid: appid.to_string(),
            },
            other => ResolveError::RemoteUnavailable {
                reason: other.to_string(),
            },
        })?;
        let envelope: SchemaEnvelope =
            response
                .into_json()
                .map_err(|err| ResolveError::RemoteUnavailable {
                    reason: format!("schema decode: {err}"),
                })?;
        if envelope.error.is_some() {
            return Err(ResolveError::RemoteMiss {
                appid: appid.to_string(),
            });
        }
        envelope.data.ok_or_else(|| ResolveError::RemoteMiss {
            appid: appid.to_string(),
        })
    }

    fn share(&self, schema: &SchemaRecord, image_dir: &Path) -> Result<()> {
        let archive = build_share_archive(schema, image_dir)?;
        tracing::debug!(target: "trophy::share", name = %schema.name, appid = %schema.appid, bytes = archive.len(), "sharing schema");

        let part = reqwest::blocking::multipart::Part::bytes(archive)
            .file_name(format!("{} - {}.zip", schema.name, schema.appid))
            .mime_str("application/zip")
            .map_err(|err| ResolveError::RemoteUnavailable {
                reason: format!("share prepare: {err}"),
            })?;
        let form = reqwest::blocking::multipart::Form::new()
            .text("appid", schema.appid.clone())
            .part("schema", part);

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(HTTP_TIMEOUT_MS))
            .build()
            .map_err(|err| ResolveError::RemoteUnavailable {
                reason: err.to_string(),
            })?;
        let response = client
            .post(format!("{}/share/", self.base))
            .multipart(form)
            .send()
            .map_err(|err| ResolveError::RemoteUnavailable {
                reason: err.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(ResolveError::RemoteUnavailable {
                reason: format!("share rejected: {}", response.status()),
            });
        }
        Ok(())
    }
}

/// Zip the schema record plus every extracted image asset for the title
/// into an in-memory archive, mirroring the layout the service serves.
pub(crate) fn build_share_archive(schema: &SchemaRecord, image_dir: &Path) -> Result<Vec<u8>> {
    let zip_err = |err: zip::result::ZipError| ResolveError::RemoteUnavailable {
        reason: format!("share archive: {err}"),
    };
    let options = zip::write::SimpleFileOptions::default();
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

    writer.start_file("schema.json", options).map_err(zip_err)?;
    let bytes = serde_json::to_vec_pretty(schema)?;
    writer
        .write_all(&bytes)
        .map_err(|e| ResolveError::io(e, "schema.json"))?;

    if image_dir.is_dir() {
        let entries = fs::read_dir(image_dir).map_err(|e| ResolveError::io(e, image_dir))?;
        for entry in entries {
            let entry = entry.map_err(|e| ResolveError::io(e, image_dir))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            writer.start_file(name, options).map_err(zip_err)?;
            let bytes = fs::read(&path).map_err(|e| ResolveError::io(e, &path))?;
            writer
                .write_all(&bytes)
                .map_err(|e| ResolveError::io(e, &path))?;
        }
    }

    let cursor = writer.finish().map_err(zip_err)?;
    Ok(cursor.into_inner())
}
