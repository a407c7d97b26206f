//! HTTP transport.
//!
//! The client core only needs GET and POST with a complete buffered body.
//! [`ReqwestTransport`] is the production implementation; tests substitute a
//! scripted double through the [`HttpTransport`] trait.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client, Response, Url};
use thiserror::Error;
use tracing::debug;

use crate::config::ClientConfig;

/// Transport-level failures. None of them is retried.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Failed to connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// Non-success status without an exception report in the body.
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// GET/POST capability the client core is built on.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError>;

    async fn post(
        &self,
        url: &Url,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        (**self).get(url).await
    }

    async fn post(
        &self,
        url: &Url,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<HttpResponse, TransportError> {
        (**self).post(url, content_type, body).await
    }
}

/// reqwest-backed transport with the configured timeout and User-Agent.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true);
        if let Some(timeout) = config.timeout() {
            builder = builder.connect_timeout(timeout).timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn map_error(url: &Url, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_connect() {
            TransportError::Connect {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else {
            TransportError::Request {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    async fn read(url: &Url, response: Response) -> Result<HttpResponse, TransportError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(url, e))?;

        debug!(
            url = %url,
            status = status,
            bytes = body.len(),
            content_type = content_type.as_deref().unwrap_or(""),
            "HTTP response"
        );

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Self::map_error(url, e))?;
        Self::read(url, response).await
    }

    async fn post(
        &self,
        url: &Url,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .post(url.clone())
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| Self::map_error(url, e))?;
        Self::read(url, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_status_classification() {
        assert!(HttpResponse::new(200, "ok").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
        assert!(!HttpResponse::new(500, "").is_success());
    }

    #[tokio::test]
    async fn test_timeout_on_silent_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            // Hold the connection open without answering.
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let transport = ReqwestTransport::new(&ClientConfig::default().with_timeout_ms(200)).unwrap();
        let url = Url::parse(&format!("http://{}/csw", addr)).unwrap();

        let started = Instant::now();
        let err = transport.get(&url).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }), "got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(3));
        server.abort();
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::new(&ClientConfig::default().with_timeout_ms(2000)).unwrap();
        let url = Url::parse(&format!("http://{}/", addr)).unwrap();
        let err = transport.get(&url).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_post_sends_body_and_content_type() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            while !String::from_utf8_lossy(&received).contains("<ping/>") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            let reply = "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: 7\r\nConnection: close\r\n\r\n<pong/>";
            socket.write_all(reply.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&received).into_owned()
        });

        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
        let url = Url::parse(&format!("http://{}/csw", addr)).unwrap();
        let response = transport
            .post(&url, "text/xml", b"<ping/>".to_vec())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.content_type.as_deref(), Some("text/xml"));
        assert_eq!(&response.body[..], b"<pong/>");

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("post /csw "));
        assert!(request.contains("content-type: text/xml"));
    }
}
