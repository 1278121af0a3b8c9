use clap::Parser;
use tracing_subscriber::FmtSubscriber;

use cem_cli::Cli;

mod commands;

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so `cem template` can stream to stdout.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install log subscriber: {err}");
    }

    if let Err(err) = commands::handle(&cli.command) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
