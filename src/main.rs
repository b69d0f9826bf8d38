use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use postale::config::{dev_config, read_config, Config};
use postale::server::Server;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// A special mode dedicated to developers: fixed ports, demo users,
    /// always-succeed authentication. NOT INTENDED FOR PRODUCTION
    #[clap(long)]
    dev: bool,

    #[clap(short, long, env = "POSTALE_CONFIG", default_value = "postale.toml")]
    /// Path to the main Postale configuration file
    config_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "main=info,postale=info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config: Config = if args.dev {
        dev_config()
    } else {
        read_config(args.config_file)?
    };

    let server = Server::new(config)?;
    server.run().await
}
