use super::{AnalysisBackend, ApiError};
use crate::model::{AnalysisRequest, AnalysisResponse, DashboardConfig, HealthResponse};
use anyhow::{Context, Result};
use async_trait::async_trait;
use hyper::ext::ReasonPhrase;
use reqwest::{header, Client, Response, Url};
use serde::de::DeserializeOwned;

/// reqwest-backed client for the analysis engine.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: Client,
    base_url: Url,
    analyze_url: Url,
}

impl HttpBackend {
    pub fn new(cfg: &DashboardConfig) -> Result<Self> {
        let base_url = parse_base_url(&cfg.base_url)?;
        // base_url always ends in '/', so join appends instead of replacing the last segment
        let analyze_url = base_url
            .join("analyze")
            .with_context(|| format!("build analyze URL from {base_url}"))?;
        let http = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            analyze_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn analyze_url(&self) -> &Url {
        &self.analyze_url
    }
}

/// Parse and normalize the backend base URL so relative joins append to it.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim()).with_context(|| format!("invalid base URL: {raw}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("base URL must be http or https: {raw}");
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// The reason phrase the server sent, else the canonical one for the code.
/// hyper only records the phrase when it differs from the canonical one.
fn reason_phrase(resp: &Response) -> String {
    let sent = resp
        .extensions()
        .get::<ReasonPhrase>()
        .and_then(|r| std::str::from_utf8(r.as_bytes()).ok())
        .map(str::trim)
        .filter(|r| !r.is_empty());
    sent.or_else(|| resp.status().canonical_reason())
        .unwrap_or_default()
        .to_string()
}

fn transport(e: reqwest::Error) -> ApiError {
    ApiError::Transport(e.to_string())
}

/// Map a response into the typed result: non-2xx is a server error,
/// an unreadable or mismatched body is a decode error.
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(ApiError::Server {
            status: status.as_u16(),
            reason: reason_phrase(&resp),
        });
    }
    let bytes = resp.bytes().await.map_err(transport)?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn health(&self) -> Result<HealthResponse, ApiError> {
        let resp = self
            .http
            .get(self.base_url.clone())
            .header(header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(transport)?;
        decode(resp).await
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, ApiError> {
        let resp = self
            .http
            .post(self.analyze_url().clone())
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        decode(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve exactly one canned HTTP response and hand back the raw request.
    async fn serve_once(status_line: &'static str, body: String) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64 * 1024];
            let mut raw = Vec::new();
            // Read headers, then as much body as Content-Length announces.
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(idx) = text.find("\r\n\r\n") {
                    let content_length = text[..idx]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if raw.len() >= idx + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
            let _ = tx.send(String::from_utf8_lossy(&raw).to_string());
        });
        (format!("http://{addr}"), rx)
    }

    fn backend_for(base_url: &str) -> HttpBackend {
        let cfg = DashboardConfig {
            base_url: base_url.to_string(),
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        HttpBackend::new(&cfg).unwrap()
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = parse_base_url("http://localhost:10000/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:10000/api/");
        let backend = backend_for("http://localhost:10000/api");
        assert_eq!(backend.analyze_url().as_str(), "http://localhost:10000/api/analyze");
    }

    #[test]
    fn rejects_non_http_base_url() {
        assert!(parse_base_url("ftp://example.com").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[tokio::test]
    async fn health_probe_decodes_body() {
        let (base, req) = serve_once(
            "200 OK",
            r#"{"status":"Backend Active","engine":"OpenOA","library_installed":true}"#.into(),
        )
        .await;
        let health = backend_for(&base).health().await.unwrap();
        assert!(health.library_installed);
        assert_eq!(health.engine, "OpenOA");
        let raw = req.await.unwrap();
        assert!(raw.starts_with("GET / HTTP/1.1"));
        assert!(raw.to_ascii_lowercase().contains("cache-control: no-store"));
    }

    #[tokio::test]
    async fn analyze_posts_plant_name() {
        let body = crate::model::tests::SAMPLE_RESPONSE.to_string();
        let (base, req) = serve_once("200 OK", body).await;
        let resp = backend_for(&base)
            .analyze(&AnalysisRequest {
                plant_name: "Kelmarsh".into(),
            })
            .await
            .unwrap();
        assert_eq!(resp, crate::model::tests::sample_response());
        let raw = req.await.unwrap();
        assert!(raw.starts_with("POST /analyze HTTP/1.1"));
        assert!(raw.ends_with(r#"{"plant_name":"Kelmarsh"}"#));
    }

    #[tokio::test]
    async fn non_2xx_is_server_error_with_reason() {
        let (base, _req) = serve_once("500 Internal Server Error", "{}".into()).await;
        let err = backend_for(&base)
            .analyze(&AnalysisRequest {
                plant_name: "La Haute Borne".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Server {
                status: 500,
                reason: "Internal Server Error".into()
            }
        );
        let msg = err.to_string();
        assert!(msg.contains("500") && msg.contains("Internal Server Error"));
    }

    #[tokio::test]
    async fn custom_reason_phrase_is_kept() {
        let (base, _req) = serve_once("599 Engine Overloaded", "{}".into()).await;
        let err = backend_for(&base)
            .analyze(&AnalysisRequest {
                plant_name: "La Haute Borne".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Server {
                status: 599,
                reason: "Engine Overloaded".into()
            }
        );
        assert_eq!(err.to_string(), "Server returned 599: Engine Overloaded");
    }

    #[test]
    fn server_error_without_reason_has_no_dangling_colon() {
        let err = ApiError::Server {
            status: 599,
            reason: String::new(),
        };
        assert_eq!(err.to_string(), "Server returned 599");
    }

    #[tokio::test]
    async fn silent_server_times_out_as_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            // Accept and hold the connection open without answering.
            let (_stream, _) = listener.accept().await.unwrap();
            let _ = release_rx.await;
        });
        let cfg = DashboardConfig {
            base_url: format!("http://{addr}"),
            request_timeout: Duration::from_millis(300),
            ..Default::default()
        };
        let started = std::time::Instant::now();
        let err = HttpBackend::new(&cfg)
            .unwrap()
            .analyze(&AnalysisRequest {
                plant_name: "La Haute Borne".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(
            err.to_string(),
            "Failed to connect to the analysis engine. Is the backend running?"
        );
        assert!(started.elapsed() < Duration::from_secs(5));
        let _ = release_tx.send(());
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let (base, _req) = serve_once("200 OK", r#"{"status":"ok"}"#.into()).await;
        let err = backend_for(&base).health().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = backend_for(&format!("http://{addr}"))
            .health()
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(
            err.to_string(),
            "Failed to connect to the analysis engine. Is the backend running?"
        );
    }
}
