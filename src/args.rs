//! Command line argument parsing for framegate.
//!
//! This module defines the CLI interface using [`clap`] for argument parsing.
//!
//! # Example
//!
//! ```no_run
//! use framegate::args::Args;
//! use clap::Parser;
//!
//! let args = Args::parse();
//! if let Err(e) = args.validate() {
//!     eprintln!("Configuration error: {}", e);
//!     std::process::exit(1);
//! }
//! ```

use std::net::{IpAddr, SocketAddr};

use clap::Parser;

/// Command line arguments for framegate.
///
/// Only network and output settings live here; proxy behaviour is configured
/// through environment variables (see [`crate::env_vars`]).
#[derive(Parser, Debug)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(
    long_about = "Fetches third-party pages on a caller's behalf, checks them against an SSRF blocklist,\nrewrites them lightly and injects a widget script.\n\nExample usage:\n  framegate --listen 8080\n  framegate -l 8080 --bind 127.0.0.1 --verbose"
)]
#[command(
    after_help = "Environment variables:\n  RATE_LIMIT_REQUESTS    Max requests per window (default: 100)\n  RATE_LIMIT_WINDOW_SECS Rate limit window seconds (default: 60)\n  PROXY_TIMEOUT_SECS     Full fetch timeout (default: 30)\n  PROBE_TIMEOUT_SECS     Probe timeout (default: 8)\n  MAX_REDIRECTS          Redirect hops followed (default: 5)\n  MAX_BODY_SIZE_MB       Inbound body ceiling (default: 50)\n  MAX_RESPONSE_SIZE_MB   Upstream page ceiling (default: 10)\n  APP_ENV                'development' exposes error details\n  RUST_LOG               Log filter (default: info)"
)]
pub struct Args {
    /// Address to bind to
    #[arg(
        long,
        short = 'b',
        help = "Bind address for listening",
        value_name = "ADDRESS",
        default_value = "0.0.0.0"
    )]
    pub bind: String,

    /// Port to listen on for incoming requests
    #[arg(
        long,
        short = 'l',
        help = "Listen port for incoming connections",
        value_name = "PORT"
    )]
    pub listen: u16,

    /// Enable verbose output
    #[arg(
        long,
        short = 'v',
        help = "Show detailed configuration and startup information"
    )]
    pub verbose: bool,

    /// Enable quiet mode (minimal output)
    #[arg(
        long,
        short = 'q',
        help = "Suppress configuration output, show only essential messages",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Output logs in JSON format (for structured logging)
    #[arg(long, help = "Output logs in JSON format for structured logging")]
    pub json_logs: bool,
}

impl Args {
    /// Validates the parsed command line arguments.
    ///
    /// # Example
    ///
    /// ```
    /// use framegate::args::Args;
    /// use clap::Parser;
    ///
    /// let args = Args::try_parse_from(["framegate", "-l", "0"]).unwrap();
    /// assert!(args.validate().is_err());
    ///
    /// let args = Args::try_parse_from(["framegate", "-l", "8080"]).unwrap();
    /// assert!(args.validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), String> {
        if self.listen == 0 {
            return Err("Listen port must be greater than 0".to_string());
        }

        if self.bind.parse::<IpAddr>().is_err() {
            return Err(format!("Invalid bind address: '{}'", self.bind));
        }

        Ok(())
    }

    /// Socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns an error if the bind address is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        let ip: IpAddr = self
            .bind
            .parse()
            .map_err(|_| format!("Invalid bind address: '{}'", self.bind))?;
        Ok(SocketAddr::from((ip, self.listen)))
    }
}
