mod batch;
mod cli;
mod infra;
mod routes;
mod server;

use decision_desk::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
