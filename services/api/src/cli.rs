use crate::estimate::{run_estimate, run_listing_url, run_markets, EstimateArgs, ListingUrlArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use stay_pricing::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "stay-pricing",
    about = "Recommend nightly prices for short-term rental listings",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Price a single listing and print the recommendation
    Estimate(EstimateArgs),
    /// List the markets found in the artifacts directory
    Markets,
    /// Print the public page of a reference listing
    ListingUrl(ListingUrlArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Estimate(args) => run_estimate(args),
        Command::Markets => run_markets(),
        Command::ListingUrl(args) => {
            run_listing_url(args);
            Ok(())
        }
    }
}
