use std::env;

use anyhow::Result;
use log::{info, warn};

pub mod config;
pub mod stream;
pub mod util;

#[tokio::main]
async fn main() -> Result<()> {
    util::init_logger();
    info!("initializing klinetape");
    // get the config path from args
    let args: Vec<String> = env::args().collect();
    let config_path = match args.len() {
        1 => None,
        2 => Some(args[1].as_str()),
        _ => {
            warn!("ignoring extra arguments, using config path {:?}", args[1]);
            Some(args[1].as_str())
        }
    };
    let config = config::Config::load(config_path)?;
    info!("found configuration: {:?}", config);

    // runs until the feed closes, a read fails or we get interrupted
    stream::run(&config).await
}
