use std::env;
use std::path::{Path, PathBuf};

/// Resolve a configured path against the host's directories.
///
/// Rules:
/// - `./rest` resolves against the process execution directory;
/// - `~/rest` resolves against the configured work root;
/// - anything else is used verbatim.
pub fn resolve_configured_path(raw: &str, execution_dir: &Path, work_root: &Path) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("./") {
        execution_dir.join(rest)
    } else if let Some(rest) = raw.strip_prefix("~/") {
        work_root.join(rest)
    } else {
        PathBuf::from(raw)
    }
}

/// Directory containing the running executable, falling back to the current
/// working directory when the executable path cannot be determined.
pub fn execution_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}
