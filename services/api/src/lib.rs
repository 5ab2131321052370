mod cli;
mod estimate;
mod infra;
mod routes;
mod server;

use stay_pricing::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
