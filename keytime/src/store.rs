use crate::errors::Result;
use crate::keystroke::Log;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

/// Saved logs, kept as a single JSON array on disk
#[derive(Debug, Clone)]
pub struct LogStore {
    path: PathBuf,
}

impl LogStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every saved log. A missing file holds no logs.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn load_all(&self) -> Result<Vec<Log>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Log file does not exist yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let logs: Vec<Log> = serde_json::from_str(&content)?;
        debug!(count = logs.len(), "Loaded logs");
        Ok(logs)
    }

    /// Validate and append a log, rewriting the file atomically.
    ///
    /// If the existing file cannot be read or parsed it is left untouched.
    #[instrument(skip(self, log), fields(id = %log.id))]
    pub fn append(&self, log: Log) -> Result<()> {
        log.validate()?;
        let mut logs = self.load_all()?;
        logs.push(log);
        self.write_all(&logs)?;
        info!(count = logs.len(), path = %self.path.display(), "Log saved");
        Ok(())
    }

    /// Find a log whose id or typed string equals `identifier`.
    pub fn find(&self, identifier: &str) -> Result<Option<Log>> {
        let found = self
            .load_all()?
            .into_iter()
            .find(|log| log.id == identifier || log.string == identifier);
        if found.is_none() {
            warn!(identifier, "No saved log matches");
        }
        Ok(found)
    }

    fn write_all(&self, logs: &[Log]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut file = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut file, logs)?;
        file.flush()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
