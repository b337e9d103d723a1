mod app;
mod cli;
mod components;
mod views;

use anyhow::Result;
use clap::Parser;
use xphub_client::logging::{init_tracing, DEFAULT_FILTER};
use xphub_client::ClientConfig;

use crate::app::App;
use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let command = Cli::parse().into_command();
    init_tracing(DEFAULT_FILTER);

    let config = ClientConfig::from_env();
    tracing::debug!(api = %config.api_url, ?command, "starting");

    let app = App::new(config)?;
    app.run(command).await
}
