//! Config validation CLI tool
//!
//! Validates a rejoind configuration file and reports admitted and
//! rejected instances.

use rejoin_config::{ConfigError, CURRENT_CONFIG_VERSION};
use rejoin_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1).map(String::as_str) {
        Some("-h") | Some("--help") => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a rejoind configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
        Some(path) => PathBuf::from(path),
        None => default_config_path(),
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match rejoin_config::load_config(&config_path) {
        Ok(run) => {
            if run.rejected.is_empty() {
                println!("✓ Configuration is valid");
            } else {
                println!("✗ Configuration has rejected instances");
            }
            println!();
            println!("Summary:");
            println!("  Config version: {}", CURRENT_CONFIG_VERSION);
            println!("  Admitted instances: {}", run.instances.len());
            println!("  Rejected instances: {}", run.rejected.len());
            println!("  Disabled instances: {}", run.disabled.len());
            match &run.reporter {
                Some(reporter) => println!(
                    "  Reporter: every {} min as '{}'",
                    reporter.interval.as_secs() / 60,
                    reporter.device_name
                ),
                None => println!("  Reporter: off"),
            }

            if !run.instances.is_empty() {
                println!();
                println!("Instances:");
                for inst in &run.instances {
                    let token = if inst.sub_token.is_some() { " (private)" } else { "" };
                    println!(
                        "  - {} [{}]: place {}{} every {}s, {}",
                        inst.id,
                        inst.label,
                        inst.target,
                        token,
                        inst.poll_interval.as_secs(),
                        inst.session.describe()
                    );
                }
            }

            if !run.rejected.is_empty() {
                println!();
                println!("Rejected:");
                for rejected in &run.rejected {
                    println!("  - {}", rejected.id);
                    for err in &rejected.errors {
                        println!("      {}", err);
                    }
                }
                return ExitCode::from(1);
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver, CURRENT_CONFIG_VERSION
                    );
                }
                ConfigError::Session { .. } => {
                    eprintln!("{}", e);
                }
            }
            ExitCode::from(1)
        }
    }
}
