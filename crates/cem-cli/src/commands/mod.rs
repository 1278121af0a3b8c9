use anyhow::Result;
use cem_cli::cli::Commands;

pub mod merge;
pub mod run;
pub mod template;
pub mod validate;

pub fn handle(command: &Commands) -> Result<()> {
    match command {
        Commands::Validate { config } => validate::handle(config),
        Commands::Template {
            config,
            year,
            workdir,
            fast,
            out,
        } => template::handle(config, *year, workdir.as_deref(), *fast, out.as_deref()),
        Commands::Run(args) => run::handle(args),
        Commands::Merge {
            config,
            workdir,
            solver_name,
            out,
        } => merge::handle(config, workdir, solver_name, out.as_deref()),
    }
}
