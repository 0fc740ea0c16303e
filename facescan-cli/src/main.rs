mod args;
mod batch;
mod config;
mod input;

use anyhow::Result;
use clap::Parser;
use facescan_utils::init_logging;

use crate::args::RunArgs;

fn main() -> Result<()> {
    init_logging(log::LevelFilter::Info)?;
    let args = RunArgs::parse();
    batch::run(&args)?;
    Ok(())
}
