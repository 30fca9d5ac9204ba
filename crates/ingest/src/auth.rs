//! Bounded worker pool for authentication decisions.
//!
//! bcrypt verification takes hundreds of milliseconds on purpose. Each
//! decision runs on tokio's blocking pool while holding one of a fixed
//! number of permits, so a burst of requests cannot starve the reactor or
//! exhaust blocking threads.

use std::sync::Arc;

use api_token::{AuthGate, Decision, DenyReason};
use tokio::sync::Semaphore;
use zeroize::Zeroizing;

pub struct AuthPool {
    gate: Arc<AuthGate>,
    permits: Arc<Semaphore>,
}

impl AuthPool {
    pub fn new(gate: Arc<AuthGate>, workers: usize) -> Self {
        Self {
            gate,
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Decide on a raw `Authorization` header value. Runs to completion;
    /// there is no timeout.
    pub async fn authorize(&self, header: Option<String>) -> Decision {
        let header = header.map(Zeroizing::new);

        let permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return Decision::Denied(DenyReason::WorkerUnavailable),
        };

        let gate = Arc::clone(&self.gate);
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            gate.decide(header.as_ref().map(|h| h.as_str()))
        })
        .await;

        match result {
            Ok(decision) => decision,
            Err(e) => {
                log::error!("auth worker failed: {}", e);
                Decision::Denied(DenyReason::WorkerUnavailable)
            }
        }
    }
}
