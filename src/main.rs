use anyhow::Context;
use env_logger::Env;
use reactor_redis::{RedisServer, ServerConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_args(std::env::args().skip(1))
        .context("failed to parse command-line flags")?;

    let mut server = RedisServer::new(config).context("failed to start server")?;
    server.run().context("event loop stopped")
}
