use campus_dns::cli::SupervisorArgs;
use campus_dns::config::Config;
use campus_dns::supervisor::Supervisor;
use clap::Parser;
use std::path::Path;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    campus_dns::init_logs();

    let args = SupervisorArgs::parse();
    let config = Config::load(&args.config_path);

    let zone_base_dir = args
        .config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    Supervisor::new(config, zone_base_dir).run().await
}
