
use env_logger::{Builder, Target};
use std::env;

// summaries own stdout, so log lines go to stderr
pub fn init_logger() {
    let mut builder = Builder::from_default_env();
    builder.target(Target::Stderr);

    if env::var("RUST_LOG").is_err() {
        builder.filter_level(log::LevelFilter::Info);
    }

    builder.init();
}
