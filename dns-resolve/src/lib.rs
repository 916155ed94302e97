use dns_cache::CacheService;
use dns_message::{Message, ResponseCode};
use dns_net::{Handler, HandlerError};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::Mutex as AsyncMutex;

/// §9: "cap at 16 hops, surface SERVFAIL on overflow".
const DEFAULT_MAX_HOPS: usize = 16;

/// §4.6 RecursiveResolver: consults the cache, otherwise chases referrals
/// iteratively from a root name server over a single shared outbound
/// socket (§5, serialized per decision to match source behavior).
pub struct RecursiveResolver<C> {
    cache: Arc<C>,
    socket: AsyncMutex<UdpSocket>,
    root_addr: SocketAddr,
    max_hops: usize,
}

impl<C: CacheService + 'static> RecursiveResolver<C> {
    /// Binds the outbound socket once; `local_addr` is typically
    /// `0.0.0.0:0` unless the resolver must originate from a fixed
    /// address/port.
    pub async fn bind(
        local_addr: SocketAddr,
        root_addr: SocketAddr,
        cache: Arc<C>,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(local_addr).await?;
        Ok(Self {
            cache,
            socket: AsyncMutex::new(socket),
            root_addr,
            max_hops: DEFAULT_MAX_HOPS,
        })
    }

    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// A single outbound send followed by a blocking receive, serialized
    /// on the shared socket (§4.6, §5, §9).
    async fn send_and_receive(&self, addr: SocketAddr, request: &[u8]) -> Result<Message, HandlerError> {
        let socket = self.socket.lock().await;
        socket.send_to(request, addr).await?;
        let mut buffer = vec![0u8; 65535];
        let (size, _) = socket.recv_from(&mut buffer).await?;
        Message::parse(&buffer[..size]).map_err(Into::into)
    }

    fn servfail() -> Message {
        let mut response = Message::new_response(Some(Message {
            rcode: Some(ResponseCode::ServFail),
            ..Default::default()
        }));
        response.set_empty_resp(false);
        response
    }
}

#[async_trait::async_trait]
impl<C: CacheService + 'static> Handler for RecursiveResolver<C> {
    #[tracing::instrument(skip(self, request))]
    async fn handle(&self, request: Vec<u8>) -> Result<Vec<u8>, HandlerError> {
        let parsed = Message::parse(&request)?;
        let name = parsed
            .requested_name()
            .ok_or("request has no dns.qry.name")?
            .to_string();

        if let Some(mut cached) = self.cache.get(&name).await {
            tracing::debug!(name, "cache hit");
            cached.set_authoritative(false);
            cached.response = Some(true);
            return Ok(cached.build());
        }

        let mut current = self.send_and_receive(self.root_addr, &request).await?;

        if parsed.is_recursion_desired() {
            let mut hops = 0usize;
            while let Some(ns_name) = current.ns_name() {
                if ns_name == name {
                    break;
                }
                hops += 1;
                if hops > self.max_hops {
                    tracing::warn!(name, "referral chain exceeded max hops");
                    let mut response = Self::servfail();
                    response.response = Some(true);
                    return Ok(response.build());
                }
                let next_ip = current
                    .address()
                    .ok_or("referral response has no dns.a")?
                    .to_string();
                let next_addr: SocketAddr = format!("{next_ip}:{}", self.root_addr.port())
                    .parse()
                    .map_err(|_| "referral address is not a valid socket address")?;
                current = self.send_and_receive(next_addr, &request).await?;
            }
        }

        self.cache.add(&name, current.clone()).await;

        current.set_authoritative(false);
        current.response = Some(true);
        Ok(current.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dns_authority::AuthoritativeServer;
    use dns_cache::TtlCache;
    use dns_net::{RequestServer, ServerConfig, Transport};
    use dns_zone::Zone;

    async fn spawn_authority(addr: SocketAddr, zone_text: &str) {
        let zone = Zone::load_str(zone_text).unwrap();
        let server = RequestServer::new(
            addr,
            Transport::Udp,
            AuthoritativeServer::new(zone),
            ServerConfig {
                simulated_delay: std::time::Duration::ZERO,
            },
        );
        server.open_socket().await.unwrap();
        server.run(true).await.unwrap();
    }

    fn request_for(name: &str, recursion_desired: bool) -> Vec<u8> {
        let mut req = Message::new_request(None);
        req.set_req(name, true, Some(recursion_desired));
        req.build()
    }

    #[tokio::test]
    async fn s3_recursive_resolve_chases_two_referrals_to_a_terminal_answer() {
        let root: SocketAddr = "127.0.0.1:54101".parse().unwrap();
        let pcpools: SocketAddr = "127.0.0.2:54101".parse().unwrap();
        let windows: SocketAddr = "127.0.0.3:54101".parse().unwrap();

        spawn_authority(root, "fuberlin IN NS 127.0.0.2\n").await;
        spawn_authority(pcpools, "pcpools.fuberlin IN NS 127.0.0.3\n").await;
        spawn_authority(windows, "windows.pcpools.fuberlin\tIN\t60\tA\t127.0.0.17\n").await;

        let cache = Arc::new(TtlCache::new());
        let resolver = RecursiveResolver::bind("127.0.0.1:0".parse().unwrap(), root, cache)
            .await
            .unwrap();

        let reply = resolver
            .handle(request_for("windows.pcpools.fuberlin", true))
            .await
            .unwrap();
        let response = Message::parse(&reply).unwrap();
        assert_eq!(response.address(), Some("127.0.0.17"));
        assert_eq!(response.ns_name(), None);
        assert_eq!(response.authoritative, Some(false));
        assert_eq!(response.ttl(), Some(60));
    }

    #[tokio::test]
    async fn s4_cached_answer_skips_the_network_and_decays_ttl() {
        let root: SocketAddr = "127.0.0.1:54102".parse().unwrap();
        spawn_authority(root, "fuberlin IN A 127.0.0.15\n").await;

        let cache = Arc::new(TtlCache::new());
        let resolver = RecursiveResolver::bind("127.0.0.1:0".parse().unwrap(), root, cache.clone())
            .await
            .unwrap();

        let first = resolver.handle(request_for("fuberlin", false)).await.unwrap();
        let first = Message::parse(&first).unwrap();
        assert_eq!(first.authoritative, Some(false));
        assert!(cache.get("fuberlin").is_some());

        // stop the authority so a cache miss would hang; the cached read must not reach it.
        let second = resolver.handle(request_for("fuberlin", false)).await.unwrap();
        let second = Message::parse(&second).unwrap();
        assert_eq!(second.address(), first.address());
        assert!(second.ttl().unwrap() <= first.ttl().unwrap());
    }

    #[tokio::test]
    async fn unbounded_referral_loop_returns_servfail() {
        // root refers "x.loopy" to itself under a strictly shorter name
        // ("loopy" != "x.loopy"), so ns_name never equals Q and the chain
        // never terminates on its own.
        let root: SocketAddr = "127.0.0.1:54103".parse().unwrap();
        spawn_authority(root, "loopy IN NS 127.0.0.1\n").await;

        let cache = Arc::new(TtlCache::new());
        let resolver = RecursiveResolver::bind("127.0.0.1:0".parse().unwrap(), root, cache)
            .await
            .unwrap()
            .with_max_hops(2);

        let reply = resolver
            .handle(request_for("x.loopy", true))
            .await
            .unwrap();
        let response = Message::parse(&reply).unwrap();
        assert_eq!(response.rcode, Some(ResponseCode::ServFail));
    }
}
