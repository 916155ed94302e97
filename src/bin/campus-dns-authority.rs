use campus_dns::cli::parse_socket_addr;
use dns_authority::AuthoritativeServer;
use dns_net::{RequestServer, ServerConfig, Transport};
use dns_zone::Zone;

/// Standalone authoritative server: `campus-dns-authority <ip> <port> --zone <name>`
/// (ip/port may appear in either order, per §6).
#[derive(clap::Parser, Debug)]
#[command(author, version, about)]
struct Args {
    address_args: Vec<String>,
    /// Name of the zone file (without extension) to load from `rsrc/zone_files/`.
    #[arg(long)]
    zone: String,
    /// Base directory `rsrc/zone_files/<zone>.zone` is resolved relative to.
    #[arg(long, default_value = ".")]
    base_dir: String,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    use clap::Parser;
    campus_dns::init_logs();

    let args = Args::parse();
    let address = parse_socket_addr(&args.address_args)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;

    let zone = Zone::load_named(&args.base_dir, &args.zone)?;
    tracing::info!(%address, zone = %args.zone, "starting standalone authoritative server");

    let server = RequestServer::new(
        address,
        Transport::Udp,
        AuthoritativeServer::new(zone),
        ServerConfig::default(),
    );
    server.open_socket().await?;
    server.run(true).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("received SIGINT; stopping listener (socket remains bound until process exit)");
    server.stop_listening();
    Ok(())
}
