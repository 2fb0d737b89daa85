//! Run directory, hyperparameter dump, and time-series persistence.

use std::path::{Path, PathBuf};

use anyhow::Context;

use hunt::training::HuntHistory;

/// Create a uniquely timestamped run directory under `base`.
pub fn create_run_dir(base: &Path) -> anyhow::Result<PathBuf> {
    let stamp = chrono::Local::now().format("%m-%d_%H_%M_%S").to_string();
    let mut dir = base.join(format!("hunt_{stamp}"));
    let mut suffix = 1;
    while dir.exists() {
        dir = base.join(format!("hunt_{stamp}_{suffix}"));
        suffix += 1;
    }
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating run directory {}", dir.display()))?;
    Ok(dir)
}

/// Write the hyperparameter dump: one `name: value` line per entry.
pub fn write_params(path: &Path, params: &[(&str, String)]) -> anyhow::Result<()> {
    let mut out = String::new();
    for (name, value) in params {
        out.push_str(&format!("{name}: {value}\n"));
    }
    std::fs::write(path, out).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Persist the collected time series as pretty-printed JSON.
pub fn write_history(path: &Path, history: &HuntHistory) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, history)
        .with_context(|| format!("serializing history to {}", path.display()))?;
    Ok(())
}
