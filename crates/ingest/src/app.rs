//! HTTP surface: a single `POST /ingest` route behind the auth gate.

use std::sync::Arc;

use async_trait::async_trait;
use http::header::{ALLOW, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, WWW_AUTHENTICATE};
use http::{HeaderValue, Method, Response, StatusCode};
use pingora::apps::http_app::ServeHttp;
use pingora::protocols::http::ServerSession;

use crate::auth::AuthPool;
use crate::findings::{Finding, FindingStore};
use crate::metric::{ANONYMOUS, DENIED, Metrics};

pub const INGEST_PATH: &str = "/ingest";

pub struct IngestApp {
    /// `None` when the service runs without authentication.
    auth: Option<AuthPool>,
    findings: Arc<FindingStore>,
    metrics: Arc<Metrics>,
    max_body_bytes: usize,
}

impl IngestApp {
    pub fn new(
        auth: Option<AuthPool>,
        findings: Arc<FindingStore>,
        metrics: Arc<Metrics>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            auth,
            findings,
            metrics,
            max_body_bytes,
        }
    }

    async fn handle(&self, session: &mut ServerSession) -> (String, Response<Vec<u8>>) {
        let (method, path, authorization) = {
            let req = session.req_header();
            (
                req.method.clone(),
                req.uri.path().to_string(),
                req.headers
                    .get(AUTHORIZATION)
                    .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned()),
            )
        };

        if path != INGEST_PATH {
            return (ANONYMOUS.to_string(), text(StatusCode::NOT_FOUND, "Not found"));
        }

        if method != Method::POST {
            let mut resp = text(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
            resp.headers_mut()
                .insert(ALLOW, HeaderValue::from_static("POST"));
            return (ANONYMOUS.to_string(), resp);
        }

        let label = match &self.auth {
            Some(pool) => {
                let decision = pool.authorize(authorization).await;
                if !decision.is_allowed() {
                    // Same body for every reason; the gate already logged which one.
                    let mut resp = text(StatusCode::UNAUTHORIZED, "Unauthorized");
                    resp.headers_mut()
                        .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                    return (DENIED.to_string(), resp);
                }
                Metrics::label_for(&decision)
            }
            None => ANONYMOUS.to_string(),
        };

        let body = match self.read_body(session).await {
            Ok(body) => body,
            Err(resp) => return (label, resp),
        };

        let finding = match Finding::from_json(&body) {
            Ok(finding) => finding,
            Err(e) => {
                log::debug!("rejecting finding from {}: {}", label, e);
                return (
                    label,
                    text(StatusCode::BAD_REQUEST, "Failed to parse JSON body"),
                );
            }
        };

        let findings = Arc::clone(&self.findings);
        let stored = tokio::task::spawn_blocking(move || findings.insert(&finding)).await;
        let resp = match stored {
            Ok(Ok(id)) => {
                log::info!("stored finding id={} from {}", id, label);
                text(StatusCode::CREATED, "Created")
            }
            Ok(Err(e)) => {
                log::error!("failed to store finding from {}: {}", label, e);
                text(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store finding")
            }
            Err(e) => {
                log::error!("finding writer failed: {}", e);
                text(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store finding")
            }
        };
        (label, resp)
    }

    async fn read_body(&self, session: &mut ServerSession) -> Result<Vec<u8>, Response<Vec<u8>>> {
        let mut body = Vec::new();
        loop {
            match session.read_request_body().await {
                Ok(Some(chunk)) => {
                    if body.len() + chunk.len() > self.max_body_bytes {
                        return Err(text(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large"));
                    }
                    body.extend_from_slice(&chunk);
                }
                Ok(None) => return Ok(body),
                Err(e) => {
                    log::debug!("failed to read request body: {}", e);
                    return Err(text(StatusCode::BAD_REQUEST, "Failed to read body"));
                }
            }
        }
    }
}

#[async_trait]
impl ServeHttp for IngestApp {
    async fn response(&self, session: &mut ServerSession) -> Response<Vec<u8>> {
        let (label, resp) = self.handle(session).await;
        self.metrics.record(&label, resp.status().as_u16());
        if !resp.status().is_success() {
            session.set_keepalive(None);
        }
        resp
    }
}

/// Plain-text response with an explicit content length.
fn text(status: StatusCode, message: &str) -> Response<Vec<u8>> {
    let body = format!("{message}\n").into_bytes();
    let len = body.len();
    let mut resp = Response::new(body);
    *resp.status_mut() = status;
    let headers = resp.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_response_sets_length_and_type() {
        let resp = text(StatusCode::UNAUTHORIZED, "Unauthorized");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.body(), b"Unauthorized\n");
        assert_eq!(
            resp.headers().get(CONTENT_LENGTH).unwrap(),
            &HeaderValue::from(13usize)
        );
        assert_eq!(
            resp.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }
}
