use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use cem_multi::{ArtifactStore, PriorState, TemplateGenerator, TemplateOptions};
use cem_scenarios::load_config_from_path;
use tracing::info;

pub fn handle(
    config: &Path,
    year: u32,
    workdir: Option<&Path>,
    fast: bool,
    out: Option<&Path>,
) -> Result<()> {
    let scenario = load_config_from_path(config)?;
    let generator = TemplateGenerator::new(
        &scenario,
        TemplateOptions {
            truncated_window: fast,
        },
    )?;

    // Later years reference the previous year's artifact; it need not exist yet.
    let prior = match scenario.previous_year(year) {
        Some(previous) => {
            let store = ArtifactStore::open(workdir.unwrap_or_else(|| Path::new(".")))?;
            Some(PriorState {
                year: previous,
                artifact: store.carry_forward_path(previous),
            })
        }
        None => None,
    };
    let template = generator
        .generate(year, prior.as_ref())
        .with_context(|| format!("rendering template for {year}"))?;

    match out {
        Some(path) => {
            template.write_to(path)?;
            info!(year, path = %path.display(), "template written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(template.text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
