//! Command line entry point.

use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    let args = maskcraft_cli::Args::parse();
    log::info!("Starting Maskcraft session on {}", args.image.display());

    match maskcraft_cli::run(&args) {
        Ok(artifacts) => {
            println!("frame:   {}", artifacts.frame.display());
            println!("mask:    {}", artifacts.mask.display());
            println!("strokes: {}", artifacts.strokes.display());
            println!("events:  {}", artifacts.events.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
