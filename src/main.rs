mod args;
mod prep;

use clap::Parser;
use log::{info, warn};
use snafu::ErrorCompat;

use crate::args::Args;
use crate::prep::RunOverrides;

const DEFAULT_CONFIG: &str = "survey-config.json";

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    info!("args: {:?}", args);

    let config_path = args.config.clone().unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let overrides = RunOverrides {
        input: args.input.clone(),
        output_directory: args.out.clone(),
        reference: args.reference.clone(),
    };

    match prep::run_preparation(&config_path, &overrides) {
        Ok(summary) => {
            info!(
                "{} eligible respondents, {} duplicate emails, winner in row {}",
                summary.eligible,
                summary.duplicate_emails.len(),
                summary.winner.row
            );
            for p in summary.written.iter() {
                info!("output: {}", p.display());
            }
        }
        Err(e) => {
            warn!("Error occured {:?}", e);
            eprintln!("An error occured: {}", e);
            let mut source = std::error::Error::source(e.as_ref());
            while let Some(s) = source {
                eprintln!("  caused by: {}", s);
                source = s.source();
            }
            if let Some(bt) = ErrorCompat::backtrace(e.as_ref()) {
                eprintln!("trace: {}", bt);
            }
            std::process::exit(1);
        }
    }
}
