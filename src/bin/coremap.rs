//! coremap command-line driver
//!
//! Loads a JSON run configuration, builds the core, applies its schedule and
//! writes the run manifest as JSON.

use std::path::PathBuf;

use coremap::CoreConfig;
use tracing::error;

/// Command-line options
struct Args {
    /// Run configuration file
    config: PathBuf,
    /// Manifest destination; stdout when absent
    output: Option<PathBuf>,
    /// Build and validate only, skip the schedule
    check: bool,
}

fn usage() {
    println!("coremap - reactor core geometry and loading-pattern preprocessor");
    println!();
    println!("USAGE:");
    println!("    coremap [OPTIONS] <CONFIG>");
    println!();
    println!("OPTIONS:");
    println!("    -o, --output <FILE>       Write the run manifest to FILE [default: stdout]");
    println!("    -c, --check               Validate the configuration without running the schedule");
    println!("    -h, --help                Print help information");
    println!();
    println!("Log verbosity follows RUST_LOG (default: info).");
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config = None;
    let mut output = None;
    let mut check = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--output" | "-o" => {
                if i + 1 < args.len() {
                    output = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    eprintln!("error: --output requires a value");
                    std::process::exit(1);
                }
            }
            "--check" | "-c" => {
                check = true;
                i += 1;
            }
            "--help" | "-h" => {
                usage();
                std::process::exit(0);
            }
            arg if arg.starts_with('-') => {
                eprintln!("error: unknown argument: {arg}");
                std::process::exit(1);
            }
            arg => {
                if config.is_some() {
                    eprintln!("error: unexpected argument: {arg}");
                    std::process::exit(1);
                }
                config = Some(PathBuf::from(arg));
                i += 1;
            }
        }
    }

    let Some(config) = config else {
        eprintln!("error: missing <CONFIG>");
        std::process::exit(1);
    };
    Args {
        config,
        output,
        check,
    }
}

fn run(args: &Args) -> coremap::CoreResult<()> {
    let mut config = CoreConfig::load(&args.config)?;
    if args.check {
        config.schedule = None;
    }
    let (_, manifest) = config.run()?;
    let json = serde_json::to_string_pretty(&manifest)?;
    match &args.output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn main() {
    // Logs go to stderr so the manifest can be piped.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = parse_args();
    if let Err(err) = run(&args) {
        error!(config = %args.config.display(), "{err}");
        std::process::exit(1);
    }
}
