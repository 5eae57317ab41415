pub mod enqueue;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use knitloop_core::BackendConfig;

/// Load the backend config named by `--config` / `$KNIT_BACKEND_CONFIG`.
pub(crate) fn load_backend_config(path: Option<&Path>) -> Result<BackendConfig> {
    let path = non_empty(path)
        .context("no backend config given; pass --config or set KNIT_BACKEND_CONFIG")?;
    BackendConfig::load(&path).context("cannot load backend config")
}

/// An empty path (e.g. an exported but empty env var) counts as absent.
pub(crate) fn non_empty(path: Option<&Path>) -> Option<PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty()).map(Path::to_path_buf)
}
