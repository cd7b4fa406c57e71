use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use framegate::args::Args;
use framegate::config::{self, EnvVarConfig};
use framegate::server;
use framegate::{ProxyServices, RateLimiter, ReqwestFetcher};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Validate arguments
    if let Err(err) = args.validate() {
        eprintln!("❌ Configuration error: {err}");
        std::process::exit(1);
    }

    server::init_logging(args.json_logs);
    server::print_startup_info(&args);

    let fetcher = match ReqwestFetcher::new(config::get_proxy_config().max_redirects) {
        Ok(fetcher) => fetcher,
        Err(err) => {
            error!(error = %err, "Failed to build HTTP client");
            std::process::exit(1);
        }
    };

    // One limiter for the whole process, shared by every connection
    let services = ProxyServices::new(RateLimiter::new(), Arc::new(fetcher));
    let env_config = Arc::new(EnvVarConfig::new());

    let bind_addr = match args.socket_addr() {
        Ok(addr) => addr,
        Err(err) => {
            eprintln!("❌ Configuration error: {err}");
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("❌ Failed to bind to port {}: {}", args.listen, err);
            std::process::exit(1);
        }
    };

    println!("✅ Framegate is running on port {}", args.listen);

    if let Err(err) = server::serve(listener, env_config, services, server::shutdown_signal()).await
    {
        error!(error = %err, "Server error");
        std::process::exit(1);
    }

    info!("Framegate stopped");
}
