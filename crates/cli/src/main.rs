mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kiln_lib::install::InstallError;

use crate::output::print_error;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about = "Declarative package builds", long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

/// Where a build reads sources from and installs to.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
  /// Install prefix (default: <root>/cellar/<name>/<version>)
  #[arg(long)]
  pub prefix: Option<PathBuf>,

  /// Unpacked source tree to build in
  #[arg(long, default_value = ".")]
  pub source_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
  /// Build and install a formula
  Install {
    /// Path to the formula file
    formula: PathBuf,

    #[command(flatten)]
    target: TargetArgs,

    /// Show what would run without running it
    #[arg(long)]
    dry_run: bool,

    /// Abort the build after this long (e.g. "30m", "2h")
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Formula options, after every kiln flag: --with-<name>, --with-<name>=<value>, --without-<name>
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "FLAGS")]
    flags: Vec<String>,
  },

  /// Print the build plan without executing it
  Plan {
    /// Path to the formula file
    formula: PathBuf,

    #[command(flatten)]
    target: TargetArgs,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Formula options, after every kiln flag
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "FLAGS")]
    flags: Vec<String>,
  },

  /// List the options a formula accepts
  Options {
    /// Path to the formula file
    formula: PathBuf,
  },

  /// Resolve dependencies against this host
  Deps {
    /// Path to the formula file
    formula: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Formula options, after every kiln flag
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "FLAGS")]
    flags: Vec<String>,
  },

  /// Show formula metadata and caveats
  Info {
    /// Path to the formula file
    formula: PathBuf,
  },

  /// Check a source archive against the formula's checksum
  Verify {
    /// Path to the formula file
    formula: PathBuf,

    /// Downloaded source archive
    archive: PathBuf,
  },
}

fn main() -> ExitCode {
  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    Err(e) => {
      let _ = e.print();
      return if e.use_stderr() {
        ExitCode::from(1)
      } else {
        ExitCode::SUCCESS
      };
    }
  };

  init_logging(cli.verbose);

  let result = match cli.command {
    Commands::Install {
      formula,
      target,
      dry_run,
      timeout,
      flags,
    } => cmd::cmd_install(&formula, &target, &flags, dry_run, timeout, cli.verbose),
    Commands::Plan {
      formula,
      target,
      json,
      flags,
    } => cmd::cmd_plan(&formula, &target, &flags, json),
    Commands::Options { formula } => cmd::cmd_options(&formula),
    Commands::Deps { formula, json, flags } => cmd::cmd_deps(&formula, &flags, json),
    Commands::Info { formula } => cmd::cmd_info(&formula),
    Commands::Verify { formula, archive } => cmd::cmd_verify(&formula, &archive),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{err:#}"));
      ExitCode::from(exit_code(&err))
    }
  }
}

/// `RUST_LOG` wins; otherwise library progress at info, everything at debug with `-v`.
fn init_logging(verbose: bool) {
  let default = if verbose { "debug" } else { "kiln_lib=info,warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn exit_code(err: &anyhow::Error) -> u8 {
  err
    .chain()
    .find_map(|e| e.downcast_ref::<InstallError>())
    .and_then(|e| u8::try_from(e.exit_code()).ok())
    .unwrap_or(1)
}
