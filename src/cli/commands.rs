use clap::{Arg, ArgAction, ArgMatches, Command};
use log::info;

use crate::config::Config;
use crate::services::PollService;

pub fn build_cli() -> Command {
    Command::new("mbtcp_master")
        .version(crate::VERSION)
        .about("Modbus TCP master client for polling industrial slave devices")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to a TOML configuration file"),
        )
        .arg(
            Arg::new("host")
                .short('H')
                .long("host")
                .value_name("HOST")
                .help("Target server hostname or IP"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Target server port (default 502)"),
        )
        .arg(
            Arg::new("transport")
                .short('t')
                .long("transport")
                .value_name("KIND")
                .help("Transport realization: 'event' or 'polling'"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("MS")
                .help("Response wait timeout in milliseconds"),
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .value_name("SECONDS")
                .help("Poll interval in seconds"),
        )
        .arg(
            Arg::new("devices")
                .short('d')
                .long("devices")
                .value_name("ADDR,ADDR,...")
                .help("Comma-separated unit addresses to poll"),
        )
        .arg(
            Arg::new("backoff")
                .long("backoff")
                .action(ArgAction::SetTrue)
                .help("Enable exponential backoff between reconnect attempts"),
        )
        .subcommand(
            Command::new("getdata").about("Poll every configured device once and print readings"),
        )
        .subcommand(
            Command::new("writeconfig")
                .about("Write the effective configuration to a file")
                .arg(
                    Arg::new("path")
                        .value_name("FILE")
                        .required(true)
                        .help("Destination path"),
                ),
        )
}

/// Runs one-shot subcommands. Returns true when a subcommand was handled and
/// the process should exit instead of entering the poll loop.
pub async fn handle_subcommands(
    matches: &ArgMatches,
    config: &Config,
    service: &mut PollService,
) -> Result<bool, Box<dyn std::error::Error>> {
    if matches.subcommand_matches("getdata").is_some() {
        info!("executing getdata command...");
        service.read_all_devices_once().await?;
        println!("{}", serde_json::to_string_pretty(&service.snapshot())?);
        return Ok(true);
    }

    if let Some(matches) = matches.subcommand_matches("writeconfig") {
        let path = matches.get_one::<String>("path").unwrap();
        config.save_to_file(path)?;
        println!("configuration written to {}", path);
        return Ok(true);
    }

    Ok(false)
}
