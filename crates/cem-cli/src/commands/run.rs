use anyhow::{bail, Result};
use cem_cli::cli::RunArgs;
use cem_multi::{ArtifactStore, Orchestrator, RunOptions, SolverPlugin, TemplateOptions};
use cem_scenarios::load_config_from_path;
use tracing::info;

pub fn handle(args: &RunArgs) -> Result<()> {
    let mut scenario = load_config_from_path(&args.config)?;
    if args.cluster {
        scenario.cluster = true;
    }
    if args.no_cluster {
        scenario.cluster = false;
    }
    if let Some(k) = args.clusters {
        if k == 0 {
            bail!("--clusters must be at least 1");
        }
        scenario.cluster_sets = Some(k);
    }
    if scenario.cluster && scenario.cluster_sets.is_none() {
        bail!("clustering is enabled but no cluster count is set (use --clusters)");
    }

    let store = match &args.workdir {
        Some(dir) => ArtifactStore::open(dir)?,
        None => ArtifactStore::temporary()?,
    };
    info!(workdir = %store.root().display(), "using working directory");

    let mut plugin = SolverPlugin::new(&args.solver).with_args(args.solver_args.iter().cloned());
    if let Some(name) = &args.solver_name {
        plugin = plugin.with_label(name.clone());
    }

    let options = RunOptions {
        template: TemplateOptions {
            truncated_window: args.fast,
        },
        report_path: args.out.clone(),
    };
    let orchestrator = Orchestrator::new(
        &scenario,
        store,
        plugin.clone(),
        plugin.clone(),
        plugin,
        options,
    );
    let summary = orchestrator.run()?;

    println!(
        "Scenario '{}' solved for {} years",
        scenario.name,
        summary.records.len()
    );
    for record in &summary.records {
        match record.objective {
            Some(obj) => println!("  {}  objective {:.2}", record.year, obj),
            None => println!("  {}  objective n/a", record.year),
        }
    }
    println!("Report written to {}", summary.report_path.display());
    println!(
        "Artifacts kept in {}",
        orchestrator.store().root().display()
    );
    Ok(())
}
