use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelMapError {
    #[error("failed to read labels {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse labels {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("label key {0:?} is not a class index")]
    BadIndex(String),
    #[error("label file defines no classes")]
    Empty,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelFile {
    List(Vec<String>),
    Indexed(BTreeMap<String, String>),
}

/// Class index → person name, as produced alongside the classifier model.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelMap {
    labels: BTreeMap<usize, String>,
}

impl LabelMap {
    /// Reads a JSON label file: either `["alice", "bob"]` or
    /// `{"0": "alice", "1": "bob"}`.
    pub fn load(path: &Path) -> Result<Self, LabelMapError> {
        let json = fs::read_to_string(path).map_err(|source| LabelMapError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: LabelFile =
            serde_json::from_str(&json).map_err(|source| LabelMapError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_file(file)
    }

    fn from_file(file: LabelFile) -> Result<Self, LabelMapError> {
        let labels: BTreeMap<usize, String> = match file {
            LabelFile::List(names) => names.into_iter().enumerate().collect(),
            LabelFile::Indexed(map) => map
                .into_iter()
                .map(|(k, v)| {
                    k.trim()
                        .parse::<usize>()
                        .map(|idx| (idx, v))
                        .map_err(|_| LabelMapError::BadIndex(k))
                })
                .collect::<Result<_, _>>()?,
        };
        if labels.is_empty() {
            return Err(LabelMapError::Empty);
        }
        Ok(Self { labels })
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: names.into_iter().map(Into::into).enumerate().collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(&index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
