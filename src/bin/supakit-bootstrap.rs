//! supakit-bootstrap: generate secrets and write every env file of the stack.
//!
//! ```text
//! supakit-bootstrap [development|production] [--root DIR] [--config PATH]
//! ```

use std::path::PathBuf;

use supakit::bootstrap::{self, BootstrapError, DeploymentMode, Layout};
use supakit::error::AppError;
use supakit::logger::{self, LogStyle};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        if matches!(e, AppError::Bootstrap(BootstrapError::Usage(_))) {
            eprintln!();
            print_usage();
        }
        std::process::exit(1);
    }
}

struct CliArgs {
    mode: DeploymentMode,
    root: PathBuf,
    config: Option<PathBuf>,
}

fn run() -> Result<(), AppError> {
    let args = parse_cli_args(std::env::args().skip(1))?;

    logger::init("warn", false, LogStyle::Cli)?;

    let mut layout = Layout::under(&args.root);
    if let Some(config) = args.config {
        layout.config = config;
    }

    println!("Deployment mode: {}", args.mode);
    let report = bootstrap::run(&layout, args.mode)?;

    for path in &report.written {
        println!("Updated {}", path.display());
    }
    for path in &report.skipped {
        println!("Skipped {} (not found)", path.display());
    }

    match (report.mode, report.endpoints) {
        (DeploymentMode::Production, Some(ep)) => {
            println!("Environment files created successfully for PRODUCTION!");
            println!("Frontend URL: {}", ep.frontend_url);
            println!("Backend URL: {}", ep.api_url);
            println!("Supabase URL: {}", ep.supabase_url);
        }
        _ => println!("Environment files created successfully for DEVELOPMENT!"),
    }
    Ok(())
}

fn parse_cli_args(args: impl Iterator<Item = String>) -> Result<CliArgs, BootstrapError> {
    let mut mode = None;
    let mut root = PathBuf::from(".");
    let mut config = None;

    let mut iter = args;
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "--root" | "-C" => {
                root = iter
                    .next()
                    .map(PathBuf::from)
                    .ok_or_else(|| BootstrapError::Usage(format!("{arg} requires a directory")))?;
            }
            "--config" | "-f" => {
                config = Some(
                    iter.next()
                        .map(PathBuf::from)
                        .ok_or_else(|| BootstrapError::Usage(format!("{arg} requires a path")))?,
                );
            }
            a if a.starts_with('-') => {
                return Err(BootstrapError::Usage(format!("unknown option '{a}'")));
            }
            a if mode.is_none() => mode = Some(a.parse::<DeploymentMode>()?),
            a => return Err(BootstrapError::Usage(format!("unexpected argument '{a}'"))),
        }
    }

    Ok(CliArgs { mode: mode.unwrap_or_default(), root, config })
}

fn print_usage() {
    println!("Usage: supakit-bootstrap [MODE] [OPTIONS]");
    println!();
    println!("Modes:");
    println!("  development, dev           Localhost URLs (default)");
    println!("  production, prod           https://<domain> URLs from *_DOMAIN keys");
    println!();
    println!("Options:");
    println!("  -C, --root <DIR>           Project root (default: .)");
    println!("  -f, --config <PATH>        Source config (default: <root>/.setup/.env.config)");
    println!("  -h, --help                 Print help");
}
