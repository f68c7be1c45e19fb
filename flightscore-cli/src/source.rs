use std::path::{Path, PathBuf};

use flightscore_core::{FlightSource, ScoringError};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

/// Reads flight documents from the filesystem, relative to a base directory.
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    base: PathBuf,
}

impl FileSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }
}

impl FlightSource for FileSource {
    type Error = SourceError;

    fn read_document(&self, name: &str) -> Result<String, Self::Error> {
        let path = self.resolve(name);
        log::debug!("reading flight document {}", path.display());
        std::fs::read_to_string(&path).map_err(|source| SourceError::Io { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reports_path() {
        let source = FileSource::new(std::env::temp_dir());
        let err = source
            .load_flight("flightscore-does-not-exist.json")
            .unwrap_err();
        assert!(err.to_string().contains("flightscore-does-not-exist.json"));
    }

    #[test]
    fn absolute_paths_ignore_base() {
        let source = FileSource::new("/nowhere");
        let absolute = std::env::temp_dir().join("x.json");
        assert_eq!(source.resolve(absolute.to_str().unwrap()), absolute);
        assert_eq!(source.resolve("y.json"), Path::new("/nowhere/y.json"));
    }
}
