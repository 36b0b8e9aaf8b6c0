use super::error::Result;
use chrono::{DateTime, Local};
use fs2::FileExt;
use serde::Deserialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

const CLOSING_RULE: &str = "=======================================";

/// A diagnostic record as the endpoint receives it.
///
/// `userAgent`, `timestamp` and `unsupportedReasons` are required; a `null`
/// counts as missing. `url` and `deviceType` are optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingReport {
    pub user_agent: String,
    pub timestamp: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    pub unsupported_reasons: Vec<String>,
}

impl IncomingReport {
    /// Render the fixed log block for this report, stamped with `received`.
    pub fn to_log_entry(&self, received: DateTime<Local>) -> String {
        let mut entry = format!(
            "===== {} =====\n设备类型: {}\n浏览器标识: {}\n访问URL: {}\n不支持的功能:\n",
            received.format("%Y-%m-%d %H:%M:%S"),
            self.device_type.as_deref().unwrap_or("unknown"),
            self.user_agent,
            self.url.as_deref().unwrap_or("unknown"),
        );
        entry.push_str("- ");
        entry.push_str(&self.unsupported_reasons.join("\n- "));
        entry.push('\n');
        entry.push_str(CLOSING_RULE);
        entry.push_str("\n\n");
        entry
    }
}

/// Append-only log file shared by every request handler.
#[derive(Debug, Clone)]
pub struct UpgradeLog {
    path: PathBuf,
}

impl UpgradeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry while holding an exclusive lock on the file.
    ///
    /// The entry goes out in a single write under the lock, so concurrent
    /// appenders, in this process or another, never interleave.
    pub fn append(&self, entry: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;
        let written = file.write_all(entry.as_bytes()).and_then(|_| file.flush());
        let unlocked = FileExt::unlock(&file);
        written?;
        unlocked?;
        Ok(())
    }
}
