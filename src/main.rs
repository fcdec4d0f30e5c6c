use clap::Parser;
use rotor::cli::{
    handle_completions, handle_config_init, handle_config_validate, run, servers, Cli, Commands,
    ConfigCommands, ServersCommands,
};
use rotor::config::EngineConfig;
use rotor::registry::{load_servers_from_config, ServerRegistry};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => run::run(args).await,
        Commands::Servers(cmd) => match cmd {
            ServersCommands::List(args) => {
                let config =
                    EngineConfig::load(Some(&args.config)).unwrap_or_else(|_| EngineConfig::default());
                let registry = Arc::new(ServerRegistry::new());

                if let Err(e) = load_servers_from_config(&config, &registry) {
                    eprintln!("Warning: Failed to load servers: {}", e);
                }

                match servers::handle_servers_list(&args, &registry) {
                    Ok(output) => {
                        println!("{}", output);
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
        },
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
            ConfigCommands::Validate(args) => handle_config_validate(&args),
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
