// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small JSON state files owned by individual workflows
//!
//! Writes go to a sibling temp file and are renamed into place while holding
//! an exclusive lock on `<path>.lock`, so readers never see a partial file and
//! two writers cannot interleave.

use fs2::FileExt;
use serde_json::{Map, Value};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateFileError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid state file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load and save workflow state files
#[derive(Debug, Clone, Copy, Default)]
pub struct StateStore;

impl StateStore {
    /// Read a state file. A missing file reads as an empty object.
    pub fn load(path: &Path) -> Result<Value, StateFileError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Value::Object(Map::new()));
            }
            Err(source) => {
                return Err(StateFileError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        serde_json::from_str(&content).map_err(|source| StateFileError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Replace a state file with pretty-printed JSON
    pub fn save(path: &Path, data: &Value) -> Result<(), StateFileError> {
        let io_err = |source| StateFileError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(sibling(path, "lock"))
            .map_err(io_err)?;
        lock.lock_exclusive().map_err(io_err)?;

        let result = Self::write_atomic(path, data);

        if let Err(e) = FileExt::unlock(&lock) {
            tracing::warn!(path = %path.display(), error = %e, "failed to release state lock");
        }
        result
    }

    fn write_atomic(path: &Path, data: &Value) -> Result<(), StateFileError> {
        let io_err = |source| StateFileError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut content = serde_json::to_string_pretty(data).map_err(|source| {
            StateFileError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        content.push('\n');

        let tmp = sibling(path, "tmp");
        let mut file = File::create(&tmp).map_err(io_err)?;
        file.write_all(content.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }
}

fn sibling(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

#[cfg(test)]
#[path = "state_file_tests.rs"]
mod tests;
