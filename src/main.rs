use anyhow::Context;
use clap::Parser;
use dirharvest::{
    configuration::get_configuration,
    startup::{run, Cli},
};
use env_logger::Env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let configuration = get_configuration().context("Failed to read configuration.")?;

    run(cli.command, configuration).await
}
