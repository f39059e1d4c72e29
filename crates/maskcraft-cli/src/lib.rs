//! Maskcraft command line shell.
//!
//! Loads a base image (and optionally an external mask and an engine
//! config), replays a JSON session script through the engine and writes
//! the resulting frame, mask, strokes and event log.

mod error;
pub mod script;
pub mod session;

pub use error::{CliError, CliResult};
pub use script::{LayoutSpec, Script, Step};
pub use session::{Artifacts, EventRecord, Session};

use clap::Parser;
use maskcraft_core::EngineConfig;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "maskcraft",
    about = "Replay a mask editing session headlessly",
    long_about = "Replay pointer and tool events from a JSON script against an image,\n\
                  then write the rendered frame, the binary mask, the quill strokes\n\
                  and the emitted events.\n\n\
                  Example:\n  \
                  maskcraft --image photo.png --script session.json --out-dir out/"
)]
pub struct Args {
    /// Base image (PNG, JPEG or WebP).
    #[arg(short, long, value_name = "FILE")]
    pub image: PathBuf,

    /// External mask loaded before the script runs. Black pixels are background.
    #[arg(short, long, value_name = "FILE")]
    pub mask: Option<PathBuf>,

    /// Engine configuration as (partial) JSON.
    #[arg(short, long, value_name = "CONFIG.json")]
    pub config: Option<PathBuf>,

    /// Session script to replay.
    #[arg(short, long, value_name = "SCRIPT.json")]
    pub script: Option<PathBuf>,

    /// Directory for frame.png, mask.png, strokes.json and events.json.
    #[arg(short, long, default_value = "out", value_name = "DIR")]
    pub out_dir: PathBuf,
}

fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let json = String::from_utf8_lossy(&error::read(path)?).into_owned();
    Ok(EngineConfig::from_json(&json)?)
}

/// Run a full session from parsed arguments.
pub fn run(args: &Args) -> CliResult<Artifacts> {
    let config = load_config(args.config.as_deref())?;
    let image = error::read(&args.image)?;
    let mut session = Session::open(&image, config, &args.out_dir)?;

    if let Some(mask) = &args.mask {
        session.load_mask(&error::read(mask)?)?;
    }
    if let Some(path) = &args.script {
        let script = Script::load(path)?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        session.run_script(&script, base_dir)?;
    }
    session.write_artifacts()
}
