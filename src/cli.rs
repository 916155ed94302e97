use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// DNS server ecosystem: authoritative zone servers, a caching recursive
/// resolver, and a thin HTTP proxy.
#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct SupervisorArgs {
    /// Path to the JSON configuration file
    #[arg(
        short,
        long,
        default_value = "/etc/campus-dns/config.json",
        env = "CONFIG_PATH"
    )]
    pub config_path: PathBuf,
}

pub const DEFAULT_PORT: u16 = 53;

#[derive(Debug)]
pub enum ConfigError {
    MissingAddress,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingAddress => write!(f, "no IP address literal found on the command line"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// §6 CLI surface: a positional IP literal and a numeric port, in any
/// order. First IP match wins; later port matches overwrite. Defaults to
/// port 53 when no port argument is given.
pub fn parse_socket_addr<I, S>(args: I) -> Result<SocketAddr, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ip: Option<IpAddr> = None;
    let mut port: u16 = DEFAULT_PORT;

    for arg in args {
        let arg = arg.as_ref();
        if ip.is_none() {
            if let Ok(parsed) = arg.parse::<IpAddr>() {
                ip = Some(parsed);
                continue;
            }
        }
        if let Ok(parsed) = arg.parse::<u16>() {
            port = parsed;
        }
    }

    ip.map(|ip| SocketAddr::new(ip, port))
        .ok_or(ConfigError::MissingAddress)
}
