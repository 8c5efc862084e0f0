use crate::error::{OrgBridgeError, Result};
use crate::model::{FieldValue, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct CachedFile {
    headers: Vec<String>,
    rows: Vec<Row>,
    dirty: bool,
}

/// Read-through cache over flat files, shared across the whole job so the
/// same file is never re-read for multiple lookups. Mutations mark the
/// in-memory representation dirty; `flush_dirty` is the single
/// serialization point run between phases.
#[derive(Debug, Default)]
pub struct CsvCache {
    files: RwLock<HashMap<PathBuf, CachedFile>>,
}

impl CsvCache {
    pub fn new() -> Self {
        Self::default()
    }

    async fn load_file(path: &Path) -> Result<CachedFile> {
        if !path.exists() {
            return Err(OrgBridgeError::NotFound(format!(
                "file not found: {}",
                path.display()
            )));
        }
        let mut reader = csv::Reader::from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row = Row::new();
            for (i, header) in headers.iter().enumerate() {
                let raw = record.get(i).unwrap_or_default();
                if raw.is_empty() {
                    row.set(header.clone(), FieldValue::Null);
                } else {
                    row.set(header.clone(), FieldValue::Str(raw.to_string()));
                }
            }
            rows.push(row);
        }
        debug!("loaded {} rows from {}", rows.len(), path.display());
        Ok(CachedFile {
            headers,
            rows,
            dirty: false,
        })
    }

    pub async fn exists(&self, path: &Path) -> bool {
        self.files.read().await.contains_key(path) || path.exists()
    }

    /// Rows of a file, loading it on first access
    pub async fn rows(&self, path: &Path) -> Result<Vec<Row>> {
        {
            let files = self.files.read().await;
            if let Some(cached) = files.get(path) {
                return Ok(cached.rows.clone());
            }
        }
        let loaded = Self::load_file(path).await?;
        let rows = loaded.rows.clone();
        self.files.write().await.insert(path.to_path_buf(), loaded);
        Ok(rows)
    }

    /// Column headers of a file, loading it on first access
    pub async fn headers(&self, path: &Path) -> Result<Vec<String>> {
        {
            let files = self.files.read().await;
            if let Some(cached) = files.get(path) {
                return Ok(cached.headers.clone());
            }
        }
        let loaded = Self::load_file(path).await?;
        let headers = loaded.headers.clone();
        self.files.write().await.insert(path.to_path_buf(), loaded);
        Ok(headers)
    }

    /// Replace a file's in-memory representation and mark it dirty
    pub async fn store(&self, path: &Path, headers: Vec<String>, rows: Vec<Row>) {
        self.files.write().await.insert(
            path.to_path_buf(),
            CachedFile {
                headers,
                rows,
                dirty: true,
            },
        );
    }

    pub async fn has_dirty(&self) -> bool {
        self.files.read().await.values().any(|f| f.dirty)
    }

    /// Write all dirty files back to disk. Never concurrent with itself:
    /// the write lock is held for the whole flush.
    pub async fn flush_dirty(&self) -> Result<()> {
        let mut files = self.files.write().await;
        for (path, cached) in files.iter_mut() {
            if !cached.dirty {
                continue;
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut writer = csv::Writer::from_path(path)?;
            writer.write_record(&cached.headers)?;
            for row in &cached.rows {
                let record: Vec<String> =
                    cached.headers.iter().map(|h| row.str_value(h)).collect();
                writer.write_record(&record)?;
            }
            writer.flush()?;
            cached.dirty = false;
            info!("flushed {} rows to {}", cached.rows.len(), path.display());
        }
        Ok(())
    }
}
