//! Config command handlers

use std::fs;

use crate::cli::{ConfigInitArgs, ConfigValidateArgs};
use crate::config::EngineConfig;

const EXAMPLE_CONFIG: &str = include_str!("../../rotor.example.toml");

/// Handle `rotor config init` command
pub fn handle_config_init(args: &ConfigInitArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.output.exists() && !args.force {
        return Err(format!(
            "File already exists: {}. Use --force to overwrite.",
            args.output.display()
        )
        .into());
    }

    fs::write(&args.output, EXAMPLE_CONFIG)?;

    println!("✓ Configuration file created: {}", args.output.display());
    println!("  Edit this file to configure your proxy and relay pools.");

    Ok(())
}

/// Handle `rotor config validate` command
pub fn handle_config_validate(args: &ConfigValidateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::load(Some(&args.config))?;
    config.validate()?;

    println!("✓ Configuration is valid: {}", args.config.display());
    println!(
        "  {} proxies, {} relays, strategy: {}",
        config.proxies.len(),
        config.relays.len(),
        config.rotation.strategy
    );

    Ok(())
}
