use dns_message::Message;
use dns_net::{Handler, HandlerError};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;

/// §1/§2: "a thin consumer of the resolver". Parses the requested name out
/// of an HTTP GET request line (`GET /<name> HTTP/1.1`), resolves it
/// through the recursive resolver when it ends in one of this ecosystem's
/// own zones, then fetches the target over plain HTTP and relays the
/// response body back. A name this proxy can't resolve or reach falls
/// back to the welcome string configured for this listener.
pub struct ProxyHandler {
    resolver_addr: SocketAddr,
    known_endings: Vec<String>,
    fallback: String,
    http: reqwest::Client,
    socket: Mutex<UdpSocket>,
}

impl ProxyHandler {
    pub async fn bind(
        resolver_addr: SocketAddr,
        known_endings: Vec<String>,
        fallback: String,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(Self {
            resolver_addr,
            known_endings,
            fallback,
            http: reqwest::Client::new(),
            socket: Mutex::new(socket),
        })
    }

    /// `GET /windows.pcpools.fuberlin HTTP/1.1` -> `"windows.pcpools.fuberlin"`.
    fn requested_name(request: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(request);
        let first_line = text.lines().next()?;
        let path = first_line.split(' ').nth(1)?;
        Some(path.trim_start_matches('/').to_string())
    }

    async fn resolve_locally(&self, name: &str) -> Result<String, HandlerError> {
        let mut request = Message::new_request(None);
        request.set_req(name, false, Some(true));

        let socket = self.socket.lock().await;
        socket.send_to(&request.build(), self.resolver_addr).await?;
        let mut buffer = vec![0u8; 65535];
        let (size, _) = socket.recv_from(&mut buffer).await?;
        let response = Message::parse(&buffer[..size])?;
        Ok(response.address().unwrap_or_default().to_string())
    }
}

#[async_trait::async_trait]
impl Handler for ProxyHandler {
    #[tracing::instrument(skip(self, request))]
    async fn handle(&self, request: Vec<u8>) -> Result<Vec<u8>, HandlerError> {
        let Some(requested) = Self::requested_name(&request) else {
            return Ok(self.fallback.clone().into_bytes());
        };
        tracing::debug!(requested, "proxy got request");

        let known = self
            .known_endings
            .iter()
            .any(|ending| requested.ends_with(ending.as_str()));
        let target = if known {
            self.resolve_locally(&requested).await?
        } else {
            requested
        };
        if target.is_empty() {
            return Ok(self.fallback.clone().into_bytes());
        }

        match self.http.get(format!("http://{target}")).send().await {
            Ok(response) => Ok(response.text().await.unwrap_or_default().into_bytes()),
            Err(error) => {
                tracing::debug!(%error, target, "proxy fetch failed, falling back");
                Ok(self.fallback.clone().into_bytes())
            }
        }
    }
}
