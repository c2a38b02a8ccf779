//! Where the final document goes.

use docsmith_core::fs::atomic_write_str;
use docsmith_core::AppResult;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;

/// Destination of the final draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Written atomically (temp file in the same directory, then rename)
    File(PathBuf),
    Stdout,
    /// Kept only in `PipelineResult::content`
    Memory,
}

impl OutputTarget {
    /// Write `content`; returns the persisted path for file targets.
    pub fn write(&self, content: &str) -> AppResult<Option<PathBuf>> {
        match self {
            Self::File(path) => {
                atomic_write_str(path, content)?;
                Ok(Some(path.clone()))
            }
            Self::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(content.as_bytes())?;
                if !content.ends_with('\n') {
                    stdout.write_all(b"\n")?;
                }
                stdout.flush()?;
                Ok(None)
            }
            Self::Memory => Ok(None),
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Stdout => f.write_str("stdout"),
            Self::Memory => f.write_str("memory"),
        }
    }
}
