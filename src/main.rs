use anyhow::Result;
use log::info;

use mbtcp_master::cli::{build_cli, handle_subcommands};
use mbtcp_master::config::Config;
use mbtcp_master::services::PollService;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = build_cli().get_matches();
    let config = Config::from_matches(&matches)?;

    info!(
        "mbtcp_master v{} - target {}:{} ({} transport)",
        mbtcp_master::VERSION,
        config.host,
        config.port,
        config.transport
    );

    let mut service = PollService::new(config.clone())?;

    if handle_subcommands(&matches, &config, &mut service)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
    {
        return Ok(());
    }

    service.run().await?;
    Ok(())
}
