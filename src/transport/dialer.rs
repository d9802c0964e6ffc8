//! Dialing the relay.
//!
//! The client core builds the handshake request; a [`Dialer`] turns it into
//! an open [`WebSocketStream`]. Transport selection, TLS and subprotocol
//! negotiation live entirely behind this trait.
//!
//! # Transports
//!
//! | Configuration | Transport |
//! |---------------|-----------|
//! | default | TCP, TLS for `wss://` (rustls, webpki roots) |
//! | `no_wss(true)` | TCP, `wss://` rewritten to `ws://` |
//! | `unix_socket(path)` | Unix domain socket, URL used for `Host` only |

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue, Uri, header};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, client_async_tls};
use tracing::debug;
use url::Url;

use crate::client::Config;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Header carrying the client identity token.
pub const WEBSOCKET_ID_HEADER: &str = "websocket-id";

/// Header carrying the caller-supplied client identification.
pub const CLIENT_USER_AGENT_HEADER: &str = "x-client-user-agent";

// ============================================================================
// Types
// ============================================================================

/// Byte stream a WebSocket can run over.
pub trait Io: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Io for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Type-erased byte stream (TCP or Unix socket).
pub type BoxedIo = Box<dyn Io>;

// ============================================================================
// Dialer
// ============================================================================

/// Makes one connection attempt to the relay.
///
/// Called repeatedly by the client's reconnect loop; a failure is retried
/// after the configured connect-attempt wait.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    /// Stream type the WebSocket runs over.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Performs a single dial and handshake.
    async fn dial(&self, request: Request) -> Result<WebSocketStream<Self::Stream>>;
}

// ============================================================================
// Handshake Request
// ============================================================================

/// Builds the handshake request for one dial attempt.
///
/// Applies the plaintext override and sets the identification headers:
/// `Accept-Encoding: identity`, `User-Agent`, `X-Client-User-Agent`,
/// `Websocket-Id` and `Sec-WebSocket-Protocol`.
///
/// # Errors
///
/// Returns [`Error::Config`] if the URL or a header value is invalid.
pub fn handshake_request(url: &str, websocket_id: &str, config: &Config) -> Result<Request> {
    let url = effective_url(url, config.no_wss())?;

    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| Error::config(format!("Invalid relay URL: {e}")))?;

    let headers = request.headers_mut();
    // Compression is disabled by requiring "identity".
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    headers.insert(header::USER_AGENT, header_value("User-Agent", config.user_agent())?);
    if let Some(client_user_agent) = config.client_user_agent() {
        headers.insert(
            HeaderName::from_static(CLIENT_USER_AGENT_HEADER),
            header_value("X-Client-User-Agent", client_user_agent)?,
        );
    }
    headers.insert(
        HeaderName::from_static(WEBSOCKET_ID_HEADER),
        header_value("Websocket-Id", websocket_id)?,
    );
    if !config.subprotocols().is_empty() {
        headers.insert(
            header::SEC_WEBSOCKET_PROTOCOL,
            header_value("Sec-WebSocket-Protocol", &config.subprotocols().join(", "))?,
        );
    }

    Ok(request)
}

/// Rewrites `wss://` to `ws://` when plaintext is forced.
fn effective_url(url: &str, no_wss: bool) -> Result<Url> {
    let mut parsed =
        Url::parse(url).map_err(|e| Error::config(format!("Invalid relay URL '{url}': {e}")))?;

    if no_wss && parsed.scheme() == "wss" {
        parsed
            .set_scheme("ws")
            .map_err(|()| Error::config(format!("Cannot downgrade '{url}' to ws://")))?;
    }

    Ok(parsed)
}

/// Validates a header value.
fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::config(format!("Invalid {name} header value: {e}")))
}

// ============================================================================
// WsDialer
// ============================================================================

/// Default dialer over TCP (optionally TLS) or a Unix domain socket.
#[derive(Debug, Clone)]
pub struct WsDialer {
    /// Socket path replacing the network connection.
    unix_socket: Option<PathBuf>,
    /// Deadline for connect plus handshake.
    handshake_timeout: Duration,
}

impl WsDialer {
    /// Creates a dialer from the client configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            unix_socket: config.unix_socket().map(PathBuf::from),
            handshake_timeout: config.handshake_timeout(),
        }
    }

    /// Opens the byte stream for `uri`.
    async fn connect_io(&self, uri: &Uri) -> Result<BoxedIo> {
        if let Some(path) = &self.unix_socket {
            return Self::connect_unix(path).await;
        }

        let host = uri
            .host()
            .ok_or_else(|| Error::connection(format!("URL has no host: {uri}")))?
            .trim_start_matches('[')
            .trim_end_matches(']');
        let port = uri.port_u16().unwrap_or(match uri.scheme_str() {
            Some("wss") => 443,
            _ => 80,
        });

        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }

    #[cfg(unix)]
    async fn connect_unix(path: &Path) -> Result<BoxedIo> {
        let stream = tokio::net::UnixStream::connect(path).await?;
        Ok(Box::new(stream))
    }

    #[cfg(not(unix))]
    async fn connect_unix(path: &Path) -> Result<BoxedIo> {
        Err(Error::config(format!(
            "Unix sockets are not supported on this platform: {}",
            path.display()
        )))
    }
}

#[async_trait]
impl Dialer for WsDialer {
    type Stream = MaybeTlsStream<BoxedIo>;

    async fn dial(&self, request: Request) -> Result<WebSocketStream<Self::Stream>> {
        debug!(url = %request.uri(), unix_socket = ?self.unix_socket, "Dialing websocket");

        let handshake = async {
            let io = self.connect_io(request.uri()).await?;
            let (ws_stream, _response) = client_async_tls(request, io).await?;
            Ok::<_, Error>(ws_stream)
        };

        timeout(self.handshake_timeout, handshake)
            .await
            .map_err(|_| Error::handshake_timeout(self.handshake_timeout))?
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::client::ClientBuilder;

    fn config(builder: ClientBuilder) -> Config {
        builder
            .build_with_dialer(WsDialer {
                unix_socket: None,
                handshake_timeout: Duration::from_secs(1),
            })
            .expect("build")
            .config()
            .clone()
    }

    #[test]
    fn test_request_headers() {
        let config = config(
            ClientBuilder::new("wss://relay.example.com/connect", "ws_42")
                .user_agent("agent/1")
                .client_user_agent("{\"name\":\"cli\"}"),
        );
        let request =
            handshake_request("wss://relay.example.com/connect", "ws_42", &config).expect("request");
        let headers = request.headers();

        assert_eq!(request.uri().scheme_str(), Some("wss"));
        assert_eq!(headers[header::ACCEPT_ENCODING], "identity");
        assert_eq!(headers[header::USER_AGENT], "agent/1");
        assert_eq!(headers[CLIENT_USER_AGENT_HEADER], "{\"name\":\"cli\"}");
        assert_eq!(headers[WEBSOCKET_ID_HEADER], "ws_42");
        assert_eq!(headers[header::SEC_WEBSOCKET_PROTOCOL], "relay-client-v1");
    }

    #[test]
    fn test_request_without_client_user_agent() {
        let config = config(ClientBuilder::new("ws://localhost:8080", "ws_1"));
        let request = handshake_request("ws://localhost:8080", "ws_1", &config).expect("request");
        assert!(request.headers().get(CLIENT_USER_AGENT_HEADER).is_none());
    }

    #[test]
    fn test_no_wss_downgrades_scheme() {
        let url = effective_url("wss://relay.example.com/connect", true).expect("url");
        assert_eq!(url.as_str(), "ws://relay.example.com/connect");

        let url = effective_url("wss://relay.example.com/connect", false).expect("url");
        assert_eq!(url.scheme(), "wss");

        let url = effective_url("ws://relay.example.com/connect", true).expect("url");
        assert_eq!(url.scheme(), "ws");
    }

    #[test]
    fn test_multiple_subprotocols_joined() {
        let config = config(
            ClientBuilder::new("ws://localhost:8080", "ws_1").subprotocols(["v2", "v1"]),
        );
        let request = handshake_request("ws://localhost:8080", "ws_1", &config).expect("request");
        assert_eq!(request.headers()[header::SEC_WEBSOCKET_PROTOCOL], "v2, v1");
    }

    #[tokio::test]
    async fn test_dial_refused() {
        // Bind then drop to get a port with no listener.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let url = format!("ws://127.0.0.1:{port}");
        let config = config(ClientBuilder::new(&url, "ws_1"));
        let dialer = WsDialer::from_config(&config);
        let request = handshake_request(&url, "ws_1", &config).expect("request");

        let result = dialer.dial(request).await;
        assert!(matches!(result, Err(ref e) if e.is_connection_error()));
    }

    #[tokio::test]
    async fn test_dial_handshake_against_local_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            tokio_tungstenite::accept_hdr_async(
                stream,
                |request: &tokio_tungstenite::tungstenite::handshake::server::Request,
                 mut response: tokio_tungstenite::tungstenite::handshake::server::Response| {
                    assert_eq!(request.headers()[WEBSOCKET_ID_HEADER], "ws_7");
                    response.headers_mut().insert(
                        header::SEC_WEBSOCKET_PROTOCOL,
                        HeaderValue::from_static("relay-client-v1"),
                    );
                    Ok(response)
                },
            )
            .await
            .expect("server handshake")
        });

        let url = format!("ws://127.0.0.1:{port}/connect");
        let config = config(ClientBuilder::new(&url, "ws_7"));
        let dialer = WsDialer::from_config(&config);
        let request = handshake_request(&url, "ws_7", &config).expect("request");

        let client = dialer.dial(request).await;
        assert!(client.is_ok());
        server.await.expect("server task");
    }
}
