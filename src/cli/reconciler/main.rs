use anyhow::Result;
use clap::{App, AppSettings, Arg, SubCommand};
use std::path::Path;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::ReconcilerCommands;
use reward_models::GroupId;
use reward_reconciler::ReconcilerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = App::new("Reward Reconciler")
        .version("0.1")
        .about("Builds reward commitments, publishes roots and withdraws fee distributors")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
                .takes_value(true)
                .global(true),
        )
        .subcommand(SubCommand::with_name("report").about("Build and persist the commitment only"))
        .subcommand(SubCommand::with_name("run").about("Build, publish and withdraw"))
        .subcommand(
            SubCommand::with_name("proof")
                .about("Print the value and proof of one group from the persisted tree")
                .arg(
                    Arg::with_name("group")
                        .short("g")
                        .long("group")
                        .value_name("ID")
                        .help("Distributor group id")
                        .takes_value(true)
                        .required(true),
                ),
        )
        .subcommand(SubCommand::with_name("verify").about("Verify every proof of the persisted tree"))
        .subcommand(SubCommand::with_name("withdraw").about("Withdraw using the persisted tree"))
        .get_matches();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config_path = matches
        .value_of("config")
        .or_else(|| matches.subcommand().1.and_then(|m| m.value_of("config")));
    let config = ReconcilerConfig::load(config_path.map(Path::new))?;
    let commands = ReconcilerCommands::new(config);

    match matches.subcommand() {
        ("report", Some(_)) => commands.report().await?,
        ("run", Some(_)) => commands.run().await?,
        ("proof", Some(sub_matches)) => {
            let group_id = sub_matches.value_of("group").unwrap_or_default().parse::<GroupId>()?;
            commands.proof(group_id).await?;
        }
        ("verify", Some(_)) => commands.verify().await?,
        ("withdraw", Some(_)) => commands.withdraw().await?,
        _ => {
            println!("No subcommand specified. Use --help for usage information.");
        }
    }

    Ok(())
}
