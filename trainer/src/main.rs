use std::env;

use anyhow::{Context, Result};
use env_logger::Env;
use log::info;

use trainer::{TrainConfig, session};

const DEFAULT_CONFIG: &str = "train.json";

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());

    let cfg = TrainConfig::from_file(&path).with_context(|| format!("reading config {path}"))?;
    info!("config loaded from {path}");

    session::run(&cfg)?;
    Ok(())
}
