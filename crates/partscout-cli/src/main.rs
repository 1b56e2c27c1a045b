mod search;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "partscout")]
#[command(about = "PartScout marketplace search command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search the configured marketplaces and print ranked results as JSON.
    Search(search::SearchArgs),
    /// List the providers that are enabled and fully configured.
    Providers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Search(args) => search::run(args).await,
        Commands::Providers => {
            let config = partscout_core::load_app_config()?;
            let providers = partscout_providers::build_providers(&config)?;
            if providers.is_empty() {
                println!("no providers configured");
            }
            for provider in &providers {
                println!("{}", provider.id());
            }
            Ok(())
        }
    }
}
