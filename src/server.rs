//! Server utilities: logging setup, startup banner and the accept loop.

use std::env;
use std::future::Future;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::{args::Args, config, env_vars};
use framegate_core::request_handler::{self, ProxyServices};
use framegate_core::ConfigProvider;

/// Installs the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. With `json` set,
/// events are emitted as one JSON object per line.
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

/// Print startup banner with configuration
pub fn print_startup_info(args: &Args) {
    if args.quiet {
        // Quiet mode: only essential information
        println!(
            "🚀 Framegate v{} starting on port {}",
            env!("CARGO_PKG_VERSION"),
            args.listen
        );
        return;
    }

    println!("🖼️  {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    println!("   {}", env!("CARGO_PKG_DESCRIPTION"));
    println!();
    println!("📡 Network Configuration:");
    println!("   Bind Address:   {}", args.bind);
    println!("   Listen Port:    {}", args.listen);
    println!();

    let rate_config = config::get_rate_limit_config();
    let cleanup_config = config::get_rate_limit_cleanup_config();
    println!("⚡ Rate Limiting:");
    println!(
        "   Max Requests:   {} per {} seconds",
        rate_config.max_requests,
        rate_config.window_duration.as_secs()
    );
    if cleanup_config.is_enabled() {
        println!(
            "   Cleanup:        above {} clients, every {} seconds",
            cleanup_config.threshold,
            cleanup_config.interval.as_secs()
        );
    } else {
        println!("   Cleanup:        disabled");
    }

    let proxy_config = config::get_proxy_config();
    println!("🔧 Proxy Configuration:");
    println!(
        "   Fetch Timeout:  {} seconds",
        proxy_config.fetch_timeout.as_secs()
    );
    println!(
        "   Probe Timeout:  {} seconds",
        proxy_config.probe_timeout.as_secs()
    );
    println!("   Max Redirects:  {}", proxy_config.max_redirects);
    println!("   Max Body Size:  {} MB", proxy_config.max_body_size_mb());
    println!(
        "   Max Page Size:  {} MB",
        proxy_config.max_response_size_mb()
    );

    println!("🔒 Security Configuration:");
    println!("   SSRF Checks:    redirects re-validated");
    println!(
        "   Error Details:  {}",
        if config::get_expose_error_details() {
            "exposed (development)"
        } else {
            "hidden"
        }
    );

    // Show environment configuration in verbose mode
    if args.verbose {
        print_env_config();
    }

    println!();
    println!("🚀 Server starting...");
}

/// Print environment variable configuration status (used in verbose mode)
fn print_env_config() {
    println!();
    println!("🔧 Environment Variables:");

    for &var_name in env_vars::all_env_vars() {
        match env::var(var_name) {
            Ok(value) => println!("   {:<33} = {}", var_name, value),
            Err(_) => println!("   {:<33} = [NOT SET]", var_name),
        }
    }
}

/// Accepts connections until `shutdown` resolves.
///
/// Each connection is served on its own task with HTTP/1. Connections that are
/// already open when shutdown fires are left to finish on their own.
///
/// # Errors
///
/// Only the listener's local address lookup can fail; accept errors are logged
/// and the loop keeps going.
pub async fn serve<C, F>(
    listener: TcpListener,
    config: Arc<C>,
    services: ProxyServices,
    shutdown: F,
) -> std::io::Result<()>
where
    C: ConfigProvider + 'static,
    F: Future<Output = ()>,
{
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "Listening");

    tokio::pin!(shutdown);

    loop {
        let (stream, addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(err) => {
                    warn!(error = %err, "Failed to accept connection");
                    continue;
                }
            },
            () = &mut shutdown => {
                info!("Shutdown signal received, no longer accepting connections");
                return Ok(());
            }
        };

        debug!(peer = %addr, "New connection");

        let io = TokioIo::new(stream);
        let config = Arc::clone(&config);
        let services = services.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                request_handler::handle_request(
                    req,
                    Some(addr),
                    Arc::clone(&config),
                    services.clone(),
                )
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                debug!(peer = %addr, error = %err, "Connection error");
            }
        });
    }
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
