use clap::Parser;

use dayboard_lib::config::{Args, Config};
use dayboard_lib::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::try_from(Args::parse())?;
    let _logger = init_logging(&config.log_dir)?;
    dayboard_lib::run(config).await
}
