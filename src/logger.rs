use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

/// Overrides the default filters, same syntax as `RUST_LOG`.
const LOG_ENV: &str = "CHARTS_LOG";

fn builder() -> Builder {
    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{}: {}: [{}] {}",
                buf.timestamp(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info)
        // http stacks are chatty at info
        .filter_module("hyper", LevelFilter::Warn)
        .filter_module("reqwest", LevelFilter::Warn)
        .filter_module("warp", LevelFilter::Warn)
        .parse_env(Env::new().filter(LOG_ENV));
    builder
}

pub fn start_log() {
    builder().init();
}
