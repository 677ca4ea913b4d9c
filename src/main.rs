mod build;
mod commands;
mod core;
mod manifest;
mod registry;
mod release;
mod state;
#[cfg(test)]
mod testing;
mod ui;
mod utils;
mod version;

use clap::{Parser, Subcommand};
use commands::upload::UploadArgs;
use core::error::{ForgeError, print_error};
use std::path::PathBuf;

/// Resolve, release and finalize per-platform builds of Python tools
#[derive(Parser, Debug)]
#[command(name = "pexforge")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Workspace root holding pexforge.toml (default: current directory)
  #[arg(long, global = true)]
  root: Option<PathBuf>,

  /// Increase log verbosity (-v info, -vv debug); PEXFORGE_LOG overrides
  #[arg(short, long, global = true, action = clap::ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
  // ============================================================================
  // Inspection
  // ============================================================================
  /// Show which upstream versions each package resolves to, and their runtimes
  Resolve {
    /// Packages to resolve (default: every package)
    packages: Vec<String>,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Show the cached lifecycle of every recorded version (no network)
  Status {
    /// Output status in JSON format
    #[arg(long)]
    json: bool,
  },

  // ============================================================================
  // Reconciliation
  // ============================================================================
  /// Reconcile resolved versions against the release store
  Sync {
    /// Packages to sync (default: every package)
    packages: Vec<String>,
    /// Actually perform the actions (default: dry-run mode showing the plan)
    #[arg(long)]
    apply: bool,
    /// Output plan or report in JSON format (useful for CI/automation)
    #[arg(long)]
    json: bool,
  },

  /// Upload this platform's artifact into an open prerelease
  Upload {
    /// Package name
    package: String,
    /// Upstream version the artifact was built for
    #[arg(value_name = "VERSION")]
    pkg_version: String,
    /// Path to the built archive
    file: PathBuf,
    /// Override the target OS (default: this machine)
    #[arg(long)]
    os: Option<String>,
    /// Override the target architecture (default: this machine)
    #[arg(long)]
    arch: Option<String>,
    /// Actually upload (default: dry-run)
    #[arg(long)]
    apply: bool,
    /// Output the result in JSON format
    #[arg(long)]
    json: bool,
  },

  // ============================================================================
  // Projection
  // ============================================================================
  /// Render the Hermit manifest from complete versions
  Manifest {
    /// Packages to render (default: every package)
    packages: Vec<String>,
    /// Output directory (default: [manifest] out_dir, else the workspace root)
    #[arg(long)]
    out: Option<PathBuf>,
    /// Write the files (default: print them)
    #[arg(long)]
    apply: bool,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_tracing(verbose: u8) {
  let default_level = match verbose {
    0 => "warn",
    1 => "info",
    _ => "debug",
  };
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_env("PEXFORGE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
    )
    .with_writer(std::io::stderr)
    .with_target(false)
    .without_time()
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let workspace_root = match cli.root {
    Some(root) => root,
    None => match std::env::current_dir() {
      Ok(dir) => dir,
      Err(e) => {
        eprintln!("Error: Failed to get current directory: {}", e);
        std::process::exit(1);
      }
    },
  };

  // Collaborators are built once; every command borrows them
  let ctx = match core::context::ForgeContext::build(&workspace_root) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  let result = match cli.command {
    Commands::Resolve { packages, json } => commands::run_resolve(&ctx, &packages, json),
    Commands::Status { json } => commands::run_status(&ctx, json),
    Commands::Sync { packages, apply, json } => commands::run_sync(&ctx, &packages, apply, json),
    Commands::Upload {
      package,
      pkg_version,
      file,
      os,
      arch,
      apply,
      json,
    } => commands::run_upload(
      &ctx,
      UploadArgs {
        package: &package,
        version: &pkg_version,
        artifact: &file,
        os: os.as_deref(),
        arch: arch.as_deref(),
        apply,
        json,
      },
    ),
    Commands::Manifest {
      packages,
      out,
      apply,
      json,
    } => commands::run_manifest(&ctx, &packages, out.as_deref(), apply, json),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: ForgeError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::CommandFactory;

  #[test]
  fn test_cli_definition_is_consistent() {
    Cli::command().debug_assert();
  }

  #[test]
  fn test_upload_takes_positional_version() {
    let cli = Cli::try_parse_from([
      "pexforge", "upload", "ruff", "0.4.2", "dist/ruff.tar.gz", "--os", "linux", "--apply",
    ])
    .unwrap();
    match cli.command {
      Commands::Upload {
        package,
        pkg_version,
        file,
        os,
        apply,
        ..
      } => {
        assert_eq!(package, "ruff");
        assert_eq!(pkg_version, "0.4.2");
        assert_eq!(file, PathBuf::from("dist/ruff.tar.gz"));
        assert_eq!(os.as_deref(), Some("linux"));
        assert!(apply);
      }
      _ => panic!("expected the upload command"),
    }
  }

  #[test]
  fn test_version_flag_still_propagates() {
    let err = Cli::try_parse_from(["pexforge", "upload", "--version"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
  }
}
