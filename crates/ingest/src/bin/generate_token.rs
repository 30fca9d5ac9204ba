//! One-shot provisioning: issue a token, store its verifier, print it once.

use std::path::PathBuf;

use api_token::{CredentialHasher, DEFAULT_PREFIX, TokenConfig, issue};
use clap::Parser;
use ingest::configuration::IngestConfig;
use ingest::credentials::SqliteCredentialStore;

#[derive(Parser, Debug)]
#[command(name = "generate-token", about = "Issue a new ingest API token")]
struct Args {
    /// Read `tokens_db` and `token_prefix` from this config file
    #[arg(short, long, conflicts_with_all = ["db", "prefix"])]
    config: Option<PathBuf>,

    /// Tokens database
    #[arg(long, default_value = "tokens.db")]
    db: PathBuf,

    /// Token prefix
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: String,
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    let (db_path, token_config) = match &args.config {
        Some(path) => match IngestConfig::load(path) {
            Ok(config) => (config.tokens_db.clone(), config.token_config()),
            Err(e) => {
                log::error!("{}", e);
                std::process::exit(1);
            }
        },
        None => (args.db.clone(), TokenConfig::new(args.prefix.clone())),
    };

    let store = match SqliteCredentialStore::open(&db_path) {
        Ok(store) => store,
        Err(e) => {
            log::error!("Error opening tokens database {:?}: {}", db_path, e);
            std::process::exit(1);
        }
    };

    match issue(&store, &CredentialHasher::new(), &token_config) {
        Ok(issued) => {
            // The only place the plaintext token is ever written.
            println!("Generated API Token: {}", issued.token());
        }
        Err(e) => {
            log::error!("Error issuing token: {}", e);
            std::process::exit(1);
        }
    }
}
