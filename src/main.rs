use clap::Parser;
use pcbmill::cli::{Cli, Command};
use pcbmill::commands::{self, MillKind};
use pcbmill::{init_logging, Config};
use tracing::debug;

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    if let Some(path) = &cli.config {
        return Ok(Config::load_from_file(path)?);
    }
    match Config::default_path() {
        Ok(path) => Ok(Config::load_or_default(&path)?),
        Err(err) => {
            debug!("{}, using default config", err);
            Ok(Config::default())
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    debug!("pcbmill {} built {}", pcbmill::VERSION, pcbmill::BUILD_DATE);

    match &cli.command {
        Command::InitConfig { path } => {
            let path = match path {
                Some(path) => path.clone(),
                None => Config::default_path()?,
            };
            commands::init_config(&path)?;
        }
        Command::Generate(args) => {
            let config = load_config(&cli)?;
            let job = commands::generate(&config, args)?;
            if args.output.is_none() {
                print!("{}", job.source_text);
            }
        }
        Command::DrillMill(args) | Command::SlotMill(args) => {
            let kind = if matches!(cli.command, Command::DrillMill(_)) {
                MillKind::Drills
            } else {
                MillKind::Slots
            };
            let config = load_config(&cli)?;
            let geometry = commands::mill(&config, args, kind)?;
            if args.output.is_none() {
                println!("{}", serde_json::to_string_pretty(&geometry)?);
            }
        }
    }
    Ok(())
}
