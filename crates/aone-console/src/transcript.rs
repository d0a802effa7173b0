//! Assistant transcript persistence.
//!
//! The message log is kept as a single JSON file so a restarted console
//! resumes with its history. Layout:
//!
//! ```text
//! base_dir/
//! └── transcript.json
//! ```

use anyhow::{Context, Result};
use aone_core::message::AssistantMessage;
use std::fs;
use std::path::{Path, PathBuf};

/// Stores the assistant console transcript on the filesystem.
pub struct TranscriptStore {
    base_dir: PathBuf,
}

impl TranscriptStore {
    /// Creates a store rooted at the given directory, creating it if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).context("Failed to create transcript directory")?;
        Ok(Self { base_dir })
    }

    /// Creates a store at the default location (~/.aone).
    pub fn default_location() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Failed to get home directory")?;
        Self::new(home_dir.join(".aone"))
    }

    /// Writes the full log, replacing the previous file.
    pub fn save(&self, log: &[AssistantMessage]) -> Result<()> {
        let file_path = self.transcript_path();
        let json =
            serde_json::to_string_pretty(log).context("Failed to serialize transcript")?;
        fs::write(&file_path, json)
            .context(format!("Failed to write transcript file: {:?}", file_path))?;
        Ok(())
    }

    /// Loads the persisted log; a missing or unreadable file yields an empty
    /// log rather than an error, so a fresh install starts clean.
    pub fn load(&self) -> Vec<AssistantMessage> {
        let file_path = self.transcript_path();
        let Ok(json) = fs::read_to_string(&file_path) else {
            return Vec::new();
        };
        match serde_json::from_str(&json) {
            Ok(log) => log,
            Err(e) => {
                tracing::warn!(
                    "[Transcript] Failed to parse {:?}, starting empty: {}",
                    file_path,
                    e
                );
                Vec::new()
            }
        }
    }

    /// Deletes the persisted transcript, if any.
    pub fn delete(&self) -> Result<()> {
        let file_path = self.transcript_path();
        if file_path.exists() {
            fs::remove_file(&file_path)
                .context(format!("Failed to delete transcript file: {:?}", file_path))?;
        }
        Ok(())
    }

    fn transcript_path(&self) -> PathBuf {
        self.base_dir.join("transcript.json")
    }
}
