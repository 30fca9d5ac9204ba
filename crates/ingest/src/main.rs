use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ingest::configuration::IngestConfig;
use ingest::metric::Metrics;
use ingest::server::Server;

#[derive(Parser, Debug)]
#[command(name = "ingest-server", about = "Accepts security findings over HTTP")]
struct Args {
    /// Path to the JSON or YAML config file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,
}

fn main() {
    // Enable basic logging; set RUST_LOG=info for visibility.
    env_logger::init();

    let args = Args::parse();

    let config = match IngestConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let mut server = match Server::new(None) {
        Ok(server) => server,
        Err(e) => {
            log::error!("Failed to create server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.bootstrap(&config, Arc::new(Metrics::default())) {
        log::error!("Failed to bootstrap server: {}", e);
        std::process::exit(1);
    }

    server.run_forever();
}
