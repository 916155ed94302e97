use crate::config::Config;
use crate::proxy::ProxyHandler;
use dns_authority::AuthoritativeServer;
use dns_cache::TtlCache;
use dns_net::{Handler, RequestServer, ServerConfig, Transport};
use dns_resolve::RecursiveResolver;
use dns_zone::Zone;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// §6 defaults: authoritative and resolver both listen on 53053/UDP; the
/// resolver's well-known address is `127.0.0.10`, the proxy's `127.0.0.100:80`.
const DEFAULT_DNS_PORT: u16 = 53053;
const DEFAULT_RESOLVER_IP: &str = "127.0.0.10";
const DEFAULT_PROXY_PORT: u16 = 80;

/// A started [`RequestServer`], held only so the Supervisor can
/// `stop_listening()` it on shutdown regardless of its handler type.
trait Stoppable: Send + Sync {
    fn stop(&self);
}

impl<H: Handler + 'static> Stoppable for RequestServer<H> {
    fn stop(&self) {
        self.stop_listening();
    }
}

/// §2 Supervisor: starts and owns every authoritative server, the
/// resolver, and the proxy described by a [`Config`], then waits for
/// SIGINT.
pub struct Supervisor {
    config: Config,
    zone_base_dir: PathBuf,
}

impl Supervisor {
    pub fn new(config: Config, zone_base_dir: impl AsRef<Path>) -> Self {
        Self {
            config,
            zone_base_dir: zone_base_dir.as_ref().to_path_buf(),
        }
    }

    pub async fn run(self) -> std::io::Result<()> {
        let mut servers: Vec<Arc<dyn Stoppable>> = Vec::new();

        for (ip, zone_name) in &self.config.dns {
            servers.push(self.spawn_authority(ip, zone_name).await?);
        }

        let (resolver_addr, resolver_server) = self.spawn_resolver().await?;
        servers.push(resolver_server);

        let known_endings: Vec<String> = self.config.dns.values().cloned().collect();
        for (ip, msg) in &self.config.http {
            servers.push(
                self.spawn_proxy(ip, msg, resolver_addr, known_endings.clone())
                    .await?,
            );
        }

        tracing::info!(count = servers.len(), "campus-dns ecosystem running, waiting for ctrl-c");
        tokio::signal::ctrl_c().await?;
        tracing::info!("received SIGINT; stopping every listener (sockets remain bound until process exit)");
        for server in &servers {
            server.stop();
        }
        Ok(())
    }

    async fn spawn_authority(&self, ip: &str, zone_name: &str) -> std::io::Result<Arc<dyn Stoppable>> {
        let zone = Zone::load_named(&self.zone_base_dir, zone_name)?;
        let address: SocketAddr = format!("{ip}:{DEFAULT_DNS_PORT}")
            .parse()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid DnsConfig ip"))?;

        tracing::info!(%address, zone_name, "starting authoritative server");
        let server = Arc::new(RequestServer::new(
            address,
            Transport::Udp,
            AuthoritativeServer::new(zone),
            ServerConfig::default(),
        ));
        server.open_socket().await?;
        server.run(true).await?;
        Ok(server)
    }

    async fn spawn_resolver(&self) -> std::io::Result<(SocketAddr, Arc<dyn Stoppable>)> {
        let root_ip = &self.config.rec_res.root;
        let root_addr: SocketAddr = format!("{root_ip}:{DEFAULT_DNS_PORT}")
            .parse()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid RecResConfig root"))?;
        let resolver_addr: SocketAddr = format!("{DEFAULT_RESOLVER_IP}:{DEFAULT_DNS_PORT}")
            .parse()
            .expect("hardcoded resolver address is valid");

        tracing::info!(%resolver_addr, %root_addr, "starting recursive resolver");
        let cache = Arc::new(TtlCache::new());
        let resolver = RecursiveResolver::bind("0.0.0.0:0".parse().unwrap(), root_addr, cache).await?;

        let server = Arc::new(RequestServer::new(
            resolver_addr,
            Transport::Udp,
            resolver,
            ServerConfig::default(),
        ));
        server.open_socket().await?;
        server.run(true).await?;
        Ok((resolver_addr, server))
    }

    async fn spawn_proxy(
        &self,
        ip: &str,
        msg: &str,
        resolver_addr: SocketAddr,
        known_endings: Vec<String>,
    ) -> std::io::Result<Arc<dyn Stoppable>> {
        let address: SocketAddr = format!("{ip}:{DEFAULT_PROXY_PORT}")
            .parse()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid HttpConfig ip"))?;

        tracing::info!(%address, "starting proxy");
        let handler = ProxyHandler::bind(resolver_addr, known_endings, msg.to_string()).await?;
        let server = Arc::new(RequestServer::new(address, Transport::Tcp, handler, ServerConfig::default()));
        server.open_socket().await?;
        server.run(true).await?;
        Ok(server)
    }
}
