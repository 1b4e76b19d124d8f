use anyhow::Result;
use clap::Parser;

use orchestrator_cli::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    let name = args.command.name();
    logging::init_subscriber(args.verbose, args.command.is_machine_readable(), name);
    let log = logging::Logger::new(name);

    match &args.command {
        cli::Command::Deploy => commands::deploy::run(&args.global, &log),
        cli::Command::ShowConfig(opts) => commands::show_config::run(&args.global, opts, &log),
        cli::Command::DetectPlatform(opts) => {
            commands::detect_platform::run(&args.global, opts, &log)
        }
        cli::Command::ExportConfig(opts) => commands::export_config::run(&args.global, opts, &log),
        cli::Command::Validate(opts) => commands::validate::run(&args.global, opts, &log),
        cli::Command::CheckEnv => commands::check_env::run(&args.global, &log),
        cli::Command::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
