use campus_dns::cli::parse_socket_addr;
use clap::Parser;
use dns_cache::TtlCache;
use dns_net::{RequestServer, ServerConfig, Transport};
use dns_resolve::RecursiveResolver;
use std::sync::Arc;

/// Standalone recursive resolver: `campus-dns-resolver <ip> <port> --root <ip>`
/// (ip/port may appear in either order, per §6).
#[derive(clap::Parser, Debug)]
#[command(author, version, about)]
struct Args {
    address_args: Vec<String>,
    /// IP of the root name server, queried on the same port this resolver binds.
    #[arg(long)]
    root: String,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    campus_dns::init_logs();

    let args = Args::parse();
    let address = parse_socket_addr(&args.address_args)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let root_addr = parse_socket_addr([args.root.as_str(), &address.port().to_string()])
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;

    tracing::info!(%address, %root_addr, "starting standalone recursive resolver");
    let cache = Arc::new(TtlCache::new());
    let resolver = RecursiveResolver::bind("0.0.0.0:0".parse().unwrap(), root_addr, cache).await?;

    let server = RequestServer::new(address, Transport::Udp, resolver, ServerConfig::default());
    server.open_socket().await?;
    server.run(true).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("received SIGINT; stopping listener (socket remains bound until process exit)");
    server.stop_listening();
    Ok(())
}
