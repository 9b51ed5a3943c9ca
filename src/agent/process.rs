// src/agent/process.rs
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{AgentError, ResolutionError};
use crate::flags::FlagSet;

pub const KUBELET_COMM: &str = "kubelet";

/// Finds the kubelet's `<proc-root>/<pid>` directory in a host /proc snapshot.
pub fn find_kubelet(proc_root: &Path) -> Result<PathBuf, ResolutionError> {
    let pattern = format!(
        "{}/[0-9]*/comm",
        glob::Pattern::escape(&proc_root.to_string_lossy())
    );
    let entries =
        glob::glob(&pattern).map_err(|_| ResolutionError::KubeletNotFound(proc_root.to_path_buf()))?;

    for entry in entries.flatten() {
        // processes come and go while we scan; unreadable entries are skipped
        let Ok(comm) = fs::read_to_string(&entry) else {
            continue;
        };
        if comm.trim() == KUBELET_COMM {
            if let Some(dir) = entry.parent() {
                debug!(proc_dir = %dir.display(), "Found kubelet process");
                return Ok(dir.to_path_buf());
            }
        }
    }

    Err(ResolutionError::KubeletNotFound(proc_root.to_path_buf()))
}

pub fn read_cmdline(proc_dir: &Path) -> Result<FlagSet, AgentError> {
    let path = proc_dir.join("cmdline");
    let raw = fs::read(&path).map_err(|source| AgentError::Read { path, source })?;
    Ok(FlagSet::from_cmdline(&raw))
}
