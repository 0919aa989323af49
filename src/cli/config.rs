use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

const SAMPLE_CONFIG: &str = include_str!("../../samples/sample-config.yml");

pub fn init(stdout: bool) -> ExitCode {
    if stdout {
        print!("{SAMPLE_CONFIG}");
        return ExitCode::SUCCESS;
    }

    let config_path = match dirs::home_dir() {
        Some(home) => home.join(".config/logpulse/config.yml"),
        None => PathBuf::from("/etc/logpulse/config.yml"),
    };

    if config_path.exists() {
        eprintln!("Error: config file already exists at {}", config_path.display());
        eprintln!("Remove it first or use --stdout to print the config");
        return ExitCode::from(super::run::EXIT_CONFIG);
    }

    if let Some(parent) = config_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Error: could not create directory {}: {}", parent.display(), e);
            return ExitCode::from(super::run::EXIT_CONFIG);
        }
    }

    match fs::write(&config_path, SAMPLE_CONFIG) {
        Ok(()) => {
            println!("Config file written to {}", config_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: could not write {}: {}", config_path.display(), e);
            ExitCode::from(super::run::EXIT_CONFIG)
        }
    }
}

pub fn validate(config_path: Option<PathBuf>) -> ExitCode {
    let path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("No config file found. Use --config to specify a path.");
            return ExitCode::from(super::run::EXIT_CONFIG);
        }
    };

    println!("Validating config file: {}", path.display());
    match crate::config::load_config(&path) {
        Ok(config) => {
            println!(
                "Config is valid ({} parser(s) configured)",
                config.parsers.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Config validation failed:\n{e}");
            ExitCode::from(super::run::EXIT_CONFIG)
        }
    }
}
