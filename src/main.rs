//! piobrew command line entry point

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    piobrew::cli::run().await
}
