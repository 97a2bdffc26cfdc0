//! sitecheck CLI entry point
//!
//! Runs audit profiles against sites and reports the results.

use clap::Parser;
use sitecheck::cli::args::{Cli, Command, ProfileRunArgs};
use sitecheck::config::Config;
use sitecheck::logging::{init_logging, LogConfig};
use sitecheck::registry::Registry;
use sitecheck::version::get_build_info;
use sitecheck::{run_profile, RunConfig, Verbosity};

use std::io::IsTerminal;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Command::Version = cli.command {
        print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(3);
        }
    };

    let verbosity = cli.verbosity();
    if let Err(e) = init_logging(LogConfig::for_verbosity(verbosity).format(config.log_format)) {
        eprintln!("Warning: {}", e);
    }

    let registry = match build_registry(&cli, &config) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(3);
        }
    };

    match &cli.command {
        Command::ProfileList => {
            print_profile_list(&registry);
            ExitCode::SUCCESS
        }
        Command::PolicyList => {
            print_policy_list(&registry);
            ExitCode::SUCCESS
        }
        Command::TargetList => {
            print_target_list(&registry);
            ExitCode::SUCCESS
        }
        Command::ProfileRun(args) => {
            let color = config.color && !cli.no_color && std::io::stdout().is_terminal();
            run(&registry, args, &config, verbosity, color)
        }
        Command::Version => ExitCode::SUCCESS,
    }
}

fn print_version() {
    let info = get_build_info();
    println!("{}", info);
}

fn build_registry(cli: &Cli, config: &Config) -> sitecheck::Result<Registry> {
    let mut registry = Registry::builtin()?;
    for dir in config.profile_dirs.iter().chain(&cli.profile_dirs) {
        let loaded = registry.load_profile_dir(dir)?;
        tracing::debug!(dir = %dir.display(), loaded, "Loaded profiles");
    }
    Ok(registry)
}

fn print_profile_list(registry: &Registry) {
    println!("Available profiles:");
    println!();
    for profile in registry.profiles() {
        println!("  {:<24} {}", profile.name, profile.title);
        for binding in profile.bindings() {
            println!("      - {}", binding.policy);
        }
    }
}

fn print_policy_list(registry: &Registry) {
    println!("Available policies:");
    println!();
    for policy in registry.policies() {
        let marker = if policy.can_remediate() { " [remediable]" } else { "" };
        println!("  {:<24} {}{}", policy.name, policy.title, marker);
    }
}

fn print_target_list(registry: &Registry) {
    println!("Available target types:");
    println!();
    for kind in registry.target_types() {
        println!("  {:<24} {}", kind.name(), kind.description());
    }
}

fn run(
    registry: &Registry,
    args: &ProfileRunArgs,
    config: &Config,
    verbosity: Verbosity,
    color: bool,
) -> ExitCode {
    let run_config = RunConfig::from_args(args, &config.default_format, verbosity, color);

    let report = match run_profile(registry, run_config) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(3);
        }
    };

    let summary = report.summary();
    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
