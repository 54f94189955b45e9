//! Journaling sink selection (§9 open question: mode is a flag on the
//! journaling sink only; the detector/executor pipeline never branches on
//! it).

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JournalMode {
    /// Writes through to `path` via [`crate::core::journal::FileJournal`].
    Realistic,
    /// Same sink as `Realistic`; kept as a distinct mode so operators can
    /// tell a simulated run's records apart from a live one at a glance.
    Paper,
    /// In-memory only via [`crate::core::journal::MemoryJournal`]; nothing
    /// touches disk.
    #[default]
    DryRun,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JournalConfig {
    #[serde(default)]
    pub mode: JournalMode,
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            mode: JournalMode::default(),
            path: default_path(),
        }
    }
}

fn default_path() -> String {
    "journal.ndjson".to_string()
}
