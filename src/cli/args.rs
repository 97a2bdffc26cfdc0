//! Command line surface.

use crate::Verbosity;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// sitecheck - run audit profiles against sites
#[derive(Parser, Debug)]
#[command(name = "sitecheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (default: ./sitecheck.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Extra directory of profile files (repeatable)
    #[arg(long = "profile-dir", global = true, value_name = "DIR")]
    pub profile_dirs: Vec<PathBuf>,

    /// Disable coloured output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a profile against a target
    #[command(name = "profile:run", visible_alias = "profile-run")]
    ProfileRun(ProfileRunArgs),

    /// List available profiles
    #[command(name = "profile:list", visible_alias = "profile-list")]
    ProfileList,

    /// List available policies
    #[command(name = "policy:list", visible_alias = "policy-list")]
    PolicyList,

    /// List available target types
    #[command(name = "target:list", visible_alias = "target-list")]
    TargetList,

    /// Print version and build information
    Version,
}

/// Arguments of `profile:run`.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ProfileRunArgs {
    /// The name of the profile to run
    pub profile: String,

    /// The target to run the profile against, as type:data (e.g. local:/var/www/html, @site.prod)
    pub target: String,

    /// Remediate failed checks where the policy supports it
    #[arg(short = 'r', long)]
    pub remediate: bool,

    /// Report format: console, json or html
    #[arg(short = 'f', long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Uri to run against (repeatable); defaults to the site's default uri
    #[arg(short = 'l', long = "uri", value_name = "URI")]
    pub uris: Vec<String>,

    /// Write the report to this file instead of stdout
    #[arg(short = 'o', long = "report-filename", value_name = "FILE", default_value = "stdout")]
    pub report_filename: String,
}
