use std::sync::Arc;

use api_token::{AuthGate, CredentialHasher};
use pingora::prelude::*;
use pingora::server::RunArgs;
use pingora::server::Server as PingoraServer;
use pingora::server::configuration::Opt;
use pingora::services::listening::Service;

use crate::app::IngestApp;
use crate::auth::AuthPool;
use crate::configuration::IngestConfig;
use crate::credentials::SqliteCredentialStore;
use crate::findings::FindingStore;
use crate::metric::Metrics;

pub struct Server {
    server: PingoraServer,
}

impl Server {
    pub fn new(opt: Option<Opt>) -> Result<Self> {
        let server = PingoraServer::new(opt)?;
        Ok(Server { server })
    }

    /// Open both stores, build the auth gate and register the HTTP service.
    pub fn bootstrap(&mut self, config: &IngestConfig, metrics: Arc<Metrics>) -> Result<()> {
        self.server.bootstrap();

        let findings = FindingStore::open(&config.findings_db).map_err(|e| {
            Error::explain(
                ErrorType::InternalError,
                format!("failed to open findings db: {e}"),
            )
        })?;

        let auth = if config.require_token {
            let store = SqliteCredentialStore::open(&config.tokens_db).map_err(|e| {
                Error::explain(
                    ErrorType::InternalError,
                    format!("failed to open tokens db: {e}"),
                )
            })?;
            let gate = AuthGate::new(
                Arc::new(store),
                CredentialHasher::new(),
                &config.token_config(),
            )
            .map_err(|e| {
                Error::explain(
                    ErrorType::InternalError,
                    format!("failed to initialise auth gate: {e}"),
                )
            })?;
            log::info!(
                "Token authentication enabled ({} hash workers)",
                config.hash_workers
            );
            Some(AuthPool::new(Arc::new(gate), config.hash_workers))
        } else {
            log::warn!("Token authentication disabled; every request is accepted");
            None
        };

        let app = IngestApp::new(auth, Arc::new(findings), metrics, config.max_body_bytes);
        let mut service = Service::new("finding ingest".to_string(), app);
        service.add_tcp(&config.listen_addr());
        self.server.add_service(service);

        log::info!("Listening on {}", config.listen_addr());

        Ok(())
    }

    pub fn run_forever(self) {
        self.server.run_forever();
    }

    pub fn run(self, args: RunArgs) {
        self.server.run(args);
    }
}
