//! Scheme-based transport construction: turn a target string into the
//! concrete `Transport` implementation it names.

use url::Url;

use super::adapters::sse::SseTransport;
use super::error::TransportError;
use super::memory::InMemoryTransport;
use super::tcp::TcpTransport;
use super::websocket::WebSocketTransport;
use super::Transport;

/// A connection target, either a URL-shaped endpoint or a stdio command
/// line. Constructed once and handed to [`connect`] to obtain a boxed
/// transport ready for `Transport::connect()`.
#[derive(Debug, Clone)]
pub enum TransportTarget {
    /// `stdio://<command> [args...]` — spawn a child process.
    Stdio { command: String, args: Vec<String> },
    /// `tcp://host:port`
    Tcp { addr: String },
    /// `unix:///path/to/socket`
    Unix { path: String },
    /// `ws://` or `wss://`
    WebSocket { url: String },
    /// `http://` or `https://` — Streamable-HTTP-SSE.
    StreamableHttpSse { url: String },
    /// In-process loopback, mainly for tests and embedders.
    InMemory,
}

impl TransportTarget {
    /// Parse a target string. Stdio targets use the `stdio:command arg1 arg2`
    /// shorthand (no URL authority component makes sense for a command
    /// line); every other scheme is parsed as a URL.
    pub fn parse(target: &str) -> Result<Self, TransportError> {
        if let Some(command_line) = target.strip_prefix("stdio:") {
            let mut parts = command_line.split_whitespace();
            let command = parts
                .next()
                .ok_or_else(|| TransportError::InvalidConnection("empty stdio command".into()))?
                .to_string();
            let args = parts.map(str::to_string).collect();
            return Ok(Self::Stdio { command, args });
        }

        if target == "memory:" {
            return Ok(Self::InMemory);
        }

        let url = Url::parse(target)
            .map_err(|err| TransportError::InvalidConnection(format!("{target}: {err}")))?;

        match url.scheme() {
            "tcp" => {
                let host = url
                    .host_str()
                    .ok_or_else(|| TransportError::InvalidConnection("tcp URL missing host".into()))?;
                let port = url
                    .port()
                    .ok_or_else(|| TransportError::InvalidConnection("tcp URL missing port".into()))?;
                Ok(Self::Tcp {
                    addr: format!("{host}:{port}"),
                })
            }
            "unix" => Ok(Self::Unix {
                path: url.path().to_string(),
            }),
            "ws" | "wss" => Ok(Self::WebSocket {
                url: target.to_string(),
            }),
            "http" | "https" => Ok(Self::StreamableHttpSse {
                url: target.to_string(),
            }),
            other => Err(TransportError::InvalidConnection(format!(
                "unsupported transport scheme: {other}"
            ))),
        }
    }
}

/// Parse `target` and construct the matching transport, boxed behind the
/// `Transport` trait object so callers don't need to know the concrete type.
pub fn connect(target: &str) -> Result<Box<dyn Transport>, TransportError> {
    let target = TransportTarget::parse(target)?;
    build(target)
}

fn build(target: TransportTarget) -> Result<Box<dyn Transport>, TransportError> {
    match target {
        TransportTarget::Stdio { command, args } => {
            Ok(Box::new(super::stdio::StdioTransport::new(command, args)))
        }
        TransportTarget::Tcp { addr } => Ok(Box::new(TcpTransport::new(addr))),
        #[cfg(unix)]
        TransportTarget::Unix { path } => Ok(Box::new(super::unix::UnixTransport::new(path))),
        #[cfg(not(unix))]
        TransportTarget::Unix { .. } => Err(TransportError::InvalidConnection(
            "unix domain sockets are not supported on this platform".into(),
        )),
        TransportTarget::WebSocket { url } => Ok(Box::new(WebSocketTransport::new(url))),
        TransportTarget::StreamableHttpSse { url } => Ok(Box::new(SseTransport::new(url))),
        TransportTarget::InMemory => {
            let (client, _server) = InMemoryTransport::pair();
            Ok(Box::new(client))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stdio_target_with_args() {
        let target = TransportTarget::parse("stdio:my-server --flag value").unwrap();
        match target {
            TransportTarget::Stdio { command, args } => {
                assert_eq!(command, "my-server");
                assert_eq!(args, vec!["--flag", "value"]);
            }
            _ => panic!("expected stdio target"),
        }
    }

    #[test]
    fn parses_tcp_target() {
        let target = TransportTarget::parse("tcp://localhost:9000").unwrap();
        match target {
            TransportTarget::Tcp { addr } => assert_eq!(addr, "localhost:9000"),
            _ => panic!("expected tcp target"),
        }
    }

    #[test]
    fn parses_websocket_and_http_targets() {
        assert!(matches!(
            TransportTarget::parse("ws://localhost:9000/mcp").unwrap(),
            TransportTarget::WebSocket { .. }
        ));
        assert!(matches!(
            TransportTarget::parse("https://example.com/mcp").unwrap(),
            TransportTarget::StreamableHttpSse { .. }
        ));
    }

    #[test]
    fn parses_unix_target() {
        let target = TransportTarget::parse("unix:///tmp/mcp.sock").unwrap();
        match target {
            TransportTarget::Unix { path } => assert_eq!(path, "/tmp/mcp.sock"),
            _ => panic!("expected unix target"),
        }
    }

    #[test]
    fn rejects_unsupported_scheme() {
        assert!(TransportTarget::parse("ftp://example.com").is_err());
    }

    #[test]
    fn tcp_target_without_port_is_rejected() {
        assert!(TransportTarget::parse("tcp://localhost").is_err());
    }
}
