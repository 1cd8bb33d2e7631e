//! `collector`: submit a batch of video URLs to the analysis backend and
//! follow it through collection, entity detection and analysis.
mod app;
mod config;
mod logging;
mod render;
mod selection;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run(app::Cli::parse()).await
}
