use std::path::Path;

use anyhow::{Context, Result};
use cem_multi::{aggregate, default_report_path, write_report, ArtifactStore};
use cem_scenarios::load_config_from_path;

pub fn handle(config: &Path, workdir: &Path, solver_name: &str, out: Option<&Path>) -> Result<()> {
    let scenario = load_config_from_path(config)?;
    if !workdir.is_dir() {
        anyhow::bail!("working directory '{}' does not exist", workdir.display());
    }
    let store = ArtifactStore::open(workdir)?;
    let report = aggregate(&scenario, &store, solver_name)
        .with_context(|| format!("merging results from '{}'", workdir.display()))?;
    let path = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_report_path(&scenario));
    write_report(&path, &report)?;
    println!(
        "Merged {} years into {}",
        report.years.len(),
        path.display()
    );
    Ok(())
}
