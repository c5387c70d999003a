use super::{FilePayload, RouteService, SOLVE_ENDPOINT};
use crate::error::{Result, WorkflowError};
use crate::model::Stage;
use anyhow::Context;
use reqwest::{multipart, StatusCode, Url};
use serde_json::Value;
use std::future::Future;

/// reqwest-backed client for the route service.
///
/// No request timeout is configured: a started call always resolves through
/// the transport's own defaults and is never aborted by the client.
#[derive(Debug, Clone)]
pub struct HttpRouteService {
    http: reqwest::Client,
    base: Url,
}

impl HttpRouteService {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let mut base = Url::parse(base_url).with_context(|| format!("invalid base url {base_url}"))?;
        // Keep any path prefix when joining endpoints.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .user_agent(format!("route-planner/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self { http, base })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| WorkflowError::Transport(format!("invalid endpoint {path}: {e}")))
    }

    async fn send(&self, req: reqwest::RequestBuilder, fallback: &str) -> Result<Value> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        tracing::debug!(status = status.as_u16(), bytes = body.len(), "response received");
        decode_response(status, &body, fallback)
    }
}

impl RouteService for HttpRouteService {
    fn upload(
        &self,
        stage: Stage,
        file: FilePayload,
    ) -> impl Future<Output = Result<Value>> + Send {
        async move {
            let url = self.endpoint(stage.endpoint())?;
            let part = multipart::Part::stream(reqwest::Body::from(file.contents))
                .file_name(file.name);
            let form = multipart::Form::new().part("file", part);
            self.send(self.http.post(url).multipart(form), stage.fallback_error())
                .await
        }
    }

    fn solve(&self, body: Value) -> impl Future<Output = Result<Value>> + Send {
        async move {
            let url = self.endpoint(SOLVE_ENDPOINT)?;
            self.send(self.http.post(url).json(&body), "Failed to run algorithm")
                .await
        }
    }
}

/// Turn a status and raw body into the decoded JSON or a typed failure.
///
/// Failure text comes from the body's `error` field, then `message`, then
/// `fallback`.
pub(crate) fn decode_response(status: StatusCode, body: &[u8], fallback: &str) -> Result<Value> {
    if status.is_success() {
        return serde_json::from_slice(body)
            .map_err(|e| WorkflowError::malformed(format!("response is not JSON: {e}")));
    }
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| {
            ["error", "message"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str))
        })
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(fallback)
        .to_string();
    Err(WorkflowError::Server {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_body_is_decoded() {
        let v = decode_response(StatusCode::OK, br#"{"points_loaded": 3}"#, "x").unwrap();
        assert_eq!(v, json!({ "points_loaded": 3 }));
    }

    #[test]
    fn success_with_garbage_is_malformed() {
        let err = decode_response(StatusCode::OK, b"<html>", "x").unwrap_err();
        assert!(matches!(err, WorkflowError::MalformedResponse(_)));
    }

    #[test]
    fn server_error_prefers_error_field() {
        let err = decode_response(
            StatusCode::BAD_REQUEST,
            br#"{"error": "no points loaded", "message": "ignored"}"#,
            "fallback",
        )
        .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::Server {
                status: 400,
                message: "no points loaded".into()
            }
        );
    }

    #[test]
    fn server_error_falls_back_to_message_then_generic() {
        let err = decode_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            br#"{"status": "error", "message": "Red vial no cargada"}"#,
            "fallback",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Red vial no cargada");

        let err = decode_response(StatusCode::BAD_GATEWAY, b"upstream down", "fallback").unwrap_err();
        assert_eq!(
            err,
            WorkflowError::Server {
                status: 502,
                message: "fallback".into()
            }
        );
    }

    #[test]
    fn endpoints_keep_base_path_prefix() {
        let svc = HttpRouteService::new("http://example.test/tsp").unwrap();
        assert_eq!(
            svc.endpoint("/api/load_points").unwrap().as_str(),
            "http://example.test/tsp/api/load_points"
        );
        let svc = HttpRouteService::new("http://example.test:5001").unwrap();
        assert_eq!(
            svc.endpoint(SOLVE_ENDPOINT).unwrap().as_str(),
            "http://example.test:5001/api/solve_tsp"
        );
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        // Bind then release a port so nothing is listening on it.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let svc = HttpRouteService::new(&format!("http://127.0.0.1:{port}")).unwrap();

        let err = svc
            .solve(json!({ "algorithm": "brute_force" }))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Transport(_)), "got {err:?}");
        assert_eq!(err.kind(), "transport");
    }
}
