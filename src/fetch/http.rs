// src/fetch/http.rs
// =============================================================================
// This module downloads the page a client asked about.
//
// Key functionality:
// - One reqwest Client per service, built once from FetchConfig
// - Follows redirects and presents a fixed User-Agent
// - Streams the body chunk by chunk into a FetchBuffer (with a size cap)
// - Passes the Content-Type charset on so the body decodes correctly
// - Categorizes failures (timeout, DNS/connect, redirect loop, HTTP status)
//
// Clients never see which failure happened: every FetchError becomes the
// same ERROR reply. The variants exist so the logs can tell them apart.
//
// Rust concepts:
// - Traits: Fetcher is the seam the worker talks to (tests plug in fakes)
// - async-trait: allows `Arc<dyn Fetcher>` with async methods
// - thiserror: derive Display/Error for our error enum
// =============================================================================

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Client};
use thiserror::Error;
use url::Url;

use super::buffer::FetchBuffer;
use crate::config::FetchConfig;

/// Why a page could not be fetched.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client or the request could not be prepared
    #[error("could not set up request: {0}")]
    Setup(String),
    /// The request string is not a URL at all
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// Only http:// and https:// can be fetched
    #[error("unsupported scheme '{0}'")]
    UnsupportedScheme(String),
    /// Request timed out
    #[error("request timed out")]
    Timeout,
    /// Redirect loop or more hops than allowed
    #[error("too many redirects")]
    TooManyRedirects,
    /// Could not resolve or connect to the host
    #[error("connection failed: {0}")]
    Connect(String),
    /// Upstream answered with a non-2xx status
    #[error("upstream returned HTTP {0}")]
    Status(u16),
    /// Body is larger than the configured cap
    #[error("response exceeds the {cap} byte limit")]
    TooLarge { cap: usize },
    /// Anything else reqwest reports while sending or reading
    #[error("transport error: {0}")]
    Transport(String),
}

impl FetchError {
    /// True when the failure happened before any network attempt was made.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            FetchError::Setup(_) | FetchError::InvalidUrl { .. } | FetchError::UnsupportedScheme(_)
        )
    }

    // Sorts reqwest's error into one of our variants
    //
    // reqwest errors can happen for many reasons:
    // - Network timeout
    // - DNS resolution failure or refused connection
    // - Too many redirects
    // - A request that could not even be built
    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_builder() {
            FetchError::Setup(error.to_string())
        } else if error.is_timeout() {
            FetchError::Timeout
        } else if error.is_redirect() {
            FetchError::TooManyRedirects
        } else if error.is_connect() {
            FetchError::Connect(error_chain(&error))
        } else {
            FetchError::Transport(error_chain(&error))
        }
    }
}

// reqwest's top-level message is just "error sending request for url (...)",
// the useful part ("connection refused", "dns error") lives in the sources
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

// Pulls the charset parameter out of a Content-Type value
//
// Example:
//   "text/html; charset=\"ISO-8859-1\"" → Some("ISO-8859-1")
fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

/// Anything that can turn a URL into the bytes of a page.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchBuffer, FetchError>;
}

/// The production fetcher, backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Builds the underlying HTTP client.
    ///
    /// Client is cheap to clone (it's reference counted internally), so all
    /// workers share one connection pool.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(redirect::Policy::limited(config.max_redirects));

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::Setup(error_chain(&e)))?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchBuffer, FetchError> {
        let target = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        if !matches!(target.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme(target.scheme().to_string()));
        }

        let mut response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        // 2xx is the only success; 404 and 500 fail the same way a refused
        // connection does
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let cap = self.max_body_bytes;
        if let Some(declared) = response.content_length() {
            if declared > cap as u64 {
                return Err(FetchError::TooLarge { cap });
            }
        }

        let mut buffer = FetchBuffer::with_cap(cap);
        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_param);
        if let Some(label) = charset {
            buffer.declare_charset(label);
        }

        while let Some(chunk) = response.chunk().await.map_err(FetchError::from_reqwest)? {
            buffer.append(&chunk).map_err(|exceeded| {
                tracing::debug!(cap = exceeded.cap, attempted = exceeded.attempted, "body over size cap");
                FetchError::TooLarge { cap: exceeded.cap }
            })?;
        }

        tracing::debug!(bytes = buffer.len(), %status, "fetched body");
        Ok(buffer)
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why response.chunk() instead of response.text()?
//    - text() buffers the whole body before we can look at its size
//    - chunk() hands us pieces as they arrive, so the cap stops a huge
//      download early instead of after the fact
//
// 2. Why check Content-Length first?
//    - A server that announces 5 GB can be refused before we read a byte
//    - Servers can lie or omit it, so the streaming check stays anyway
//
// 3. What is #[source]?
//    - It tells thiserror which field is the underlying cause
//    - Error::source() then returns it, so error chains print fully
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn test_config(max_body_bytes: usize) -> FetchConfig {
        FetchConfig {
            max_body_bytes,
            timeout: Some(Duration::from_secs(5)),
            ..FetchConfig::default()
        }
    }

    // Serves exactly one canned HTTP response on a loopback port.
    // The handle resolves to the request head the client sent.
    async fn serve_once(response: impl Into<Vec<u8>>) -> (String, JoinHandle<String>) {
        let response: Vec<u8> = response.into();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/page", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut chunk = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&chunk[..n]);
            }
            socket.write_all(&response).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&head).into_owned()
        });

        (url, handle)
    }

    fn ok_response(body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let (url, server) = serve_once(ok_response("<a href=\"/x\">x</a>")).await;
        let fetcher = HttpFetcher::new(&test_config(1024)).unwrap();

        let buffer = fetcher.fetch(&url).await.unwrap();
        assert_eq!(buffer.as_text(), "<a href=\"/x\">x</a>");

        let head = server.await.unwrap();
        assert!(head.starts_with("GET /page HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_fetch_sends_configured_user_agent() {
        let (url, server) = serve_once(ok_response("")).await;
        let fetcher = HttpFetcher::new(&test_config(1024)).unwrap();

        fetcher.fetch(&url).await.unwrap();
        let head = server.await.unwrap().to_lowercase();
        let expected = format!("user-agent: {}", FetchConfig::default().user_agent).to_lowercase();
        assert!(head.contains(&expected), "request head was: {head}");
    }

    #[tokio::test]
    async fn test_http_error_status_fails() {
        let response =
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string();
        let (url, _server) = serve_once(response).await;
        let fetcher = HttpFetcher::new(&test_config(1024)).unwrap();

        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
    }

    #[tokio::test]
    async fn test_declared_length_over_cap_fails() {
        let (url, _server) = serve_once(ok_response(&"x".repeat(100))).await;
        let fetcher = HttpFetcher::new(&test_config(10)).unwrap();

        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { cap: 10 }));
    }

    #[tokio::test]
    async fn test_streamed_body_over_cap_fails() {
        // No Content-Length: the body runs until the server closes
        let response = format!(
            "HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n{}",
            "y".repeat(100)
        );
        let (url, _server) = serve_once(response).await;
        let fetcher = HttpFetcher::new(&test_config(10)).unwrap();

        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { cap: 10 }));
    }

    #[tokio::test]
    async fn test_follows_redirects() {
        let (target, _second) = serve_once(ok_response("<a href=\"done\">")).await;
        let redirect = format!(
            "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            target
        );
        let (start, _first) = serve_once(redirect).await;
        let fetcher = HttpFetcher::new(&test_config(1024)).unwrap();

        let buffer = fetcher.fetch(&start).await.unwrap();
        assert_eq!(buffer.as_text(), "<a href=\"done\">");
    }

    #[tokio::test]
    async fn test_redirect_over_limit_fails() {
        let redirect =
            "HTTP/1.1 302 Found\r\nLocation: /page\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
        let (url, _server) = serve_once(redirect).await;
        let config = FetchConfig {
            max_redirects: 0,
            ..test_config(1024)
        };
        let fetcher = HttpFetcher::new(&config).unwrap();

        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::TooManyRedirects), "got {err:?}");
        assert!(!err.is_setup());
    }

    #[tokio::test]
    async fn test_content_type_charset_is_honoured() {
        let body: &[u8] = b"<a href=\"/caf\xe9\">";
        let mut response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=ISO-8859-1\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(body);
        let (url, _server) = serve_once(response).await;
        let fetcher = HttpFetcher::new(&test_config(1024)).unwrap();

        let buffer = fetcher.fetch(&url).await.unwrap();
        assert_eq!(buffer.as_text(), "<a href=\"/caf\u{e9}\">");
    }

    #[test]
    fn test_charset_param() {
        assert_eq!(charset_param("text/html; charset=utf-8"), Some("utf-8"));
        assert_eq!(charset_param("text/html;CHARSET=\"Shift_JIS\""), Some("Shift_JIS"));
        assert_eq!(charset_param("text/html"), None);
        assert_eq!(charset_param("text/html; boundary=x"), None);
    }

    #[tokio::test]
    async fn test_connection_refused_fails() {
        // Grab a free port, then close it so nothing is listening there
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let fetcher = HttpFetcher::new(&test_config(1024)).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Connect(_)), "got {err:?}");
        assert!(!err.is_setup());
    }

    #[tokio::test]
    async fn test_invalid_url_is_setup_error() {
        let fetcher = HttpFetcher::new(&test_config(1024)).unwrap();

        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
        assert!(err.is_setup());
    }

    #[tokio::test]
    async fn test_non_http_scheme_is_setup_error() {
        let fetcher = HttpFetcher::new(&test_config(1024)).unwrap();

        let err = fetcher.fetch("ftp://example.com/file").await.unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme(ref s) if s == "ftp"));
        assert!(err.is_setup());
    }
}
