//! localredirect CLI
//!
//! Runs the local-redirect proxy and inspects what the router reports.

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use localredirect_core::traits::AddressSource;
use localredirect_core::types::{parse_duration, AddressSet};
use localredirect_proxy::{ProxyConfig, ProxyServer, HEALTH_PATH};
use localredirect_router::{RouterClient, RouterConfig};

/// localredirect - send clients from your own network to the internal host
#[derive(Parser)]
#[command(name = "localredirect")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// How to reach the router.
#[derive(Args, Clone)]
struct RouterArgs {
    /// Router management endpoint
    #[arg(long, env = "ROUTER_URL")]
    router_url: Option<String>,
    /// Timeout for a single router call (e.g. "5s")
    #[arg(long, env = "ROUTER_TIMEOUT")]
    router_timeout: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the redirect proxy
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,
        #[command(flatten)]
        router: RouterArgs,
        /// Time before discovered addresses are refreshed (e.g. "30s")
        #[arg(long, env = "REFRESH_INTERVAL")]
        refresh_interval: Option<String>,
        /// Internal host local clients are redirected to
        #[arg(long, env = "LOCAL_HOST")]
        local_host: Option<String>,
        /// Service remote clients are passed through to
        #[arg(long, env = "UPSTREAM_URL")]
        upstream_url: Option<String>,
    },

    /// Ask the router for its current addresses
    Probe {
        #[command(flatten)]
        router: RouterArgs,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Tell whether a client address would be redirected
    Check {
        /// Client address to test
        ip: IpAddr,
        #[command(flatten)]
        router: RouterArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "localredirect=debug,info"
    } else {
        "localredirect=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if cli.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    match cli.command {
        Commands::Serve {
            port,
            bind,
            router,
            refresh_interval,
            local_host,
            upstream_url,
        } => {
            let config = ProxyConfig::from_lookup(|key| match key {
                "ROUTER_URL" => router.router_url.clone(),
                "ROUTER_TIMEOUT" => router.router_timeout.clone(),
                "REFRESH_INTERVAL" => refresh_interval.clone(),
                "LOCAL_HOST" => local_host.clone(),
                "UPSTREAM_URL" => upstream_url.clone(),
                _ => None,
            })
            .context("Invalid configuration")?;
            cmd_serve(config, port, &bind).await
        }
        Commands::Probe { router, json } => cmd_probe(&router, json).await,
        Commands::Check { ip, router } => cmd_check(ip, &router).await,
    }
}

/// Run the redirect proxy
async fn cmd_serve(config: ProxyConfig, port: u16, bind: &str) -> Result<()> {
    println!("{}", "🚀 Starting localredirect proxy...".cyan().bold());
    println!("   {} http://{}:{}", "Listening on:".green(), bind, port);
    println!("   {} {}", "Router:".dimmed(), config.router_url);
    println!("   {} {}", "Local target:".dimmed(), config.local_target);
    println!("   {} {}", "Upstream:".dimmed(), config.upstream_url);
    println!("   {} http://{}:{}{}", "Health check:".dimmed(), bind, port, HEALTH_PATH);
    println!("\n   Press Ctrl+C to stop.\n");

    let server = ProxyServer::new(config).context("Failed to create proxy")?;

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .context("Invalid bind address")?;
    server.run(addr).await?;

    Ok(())
}

/// Ask the router for its current addresses
async fn cmd_probe(router: &RouterArgs, json: bool) -> Result<()> {
    let set = probe(router).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&set)?);
        return Ok(());
    }

    println!("{}", "📡 Router addresses:".cyan().bold());
    print_field("WAN IPv4:", set.v4.map(|ip| ip.to_string()));
    print_field("WAN IPv6:", set.v6.map(|ip| ip.to_string()));
    print_field("IPv6 prefix:", set.v6_prefix.map(|net| net.to_string()));

    if !set.is_usable() {
        println!("\n{}", "❌ The router reported nothing usable.".red().bold());
    }

    Ok(())
}

/// Tell whether a client address would be redirected
async fn cmd_check(ip: IpAddr, router: &RouterArgs) -> Result<()> {
    let set = probe(router).await?;

    if !set.is_usable() {
        println!(
            "{} {} would pass through: the router reported nothing usable",
            "➡️ ".yellow(),
            ip
        );
    } else if set.matches(ip) {
        println!("{} {} is local and would be redirected", "✅".green(), ip);
    } else {
        println!("{} {} is remote and would pass through", "➡️ ".yellow(), ip);
    }

    Ok(())
}

async fn probe(router: &RouterArgs) -> Result<AddressSet> {
    let mut config = RouterConfig::default();
    if let Some(url) = &router.router_url {
        config.base_url = url.clone();
    }
    if let Some(raw) = &router.router_timeout {
        config.timeout = parse_duration("ROUTER_TIMEOUT", raw)?;
    }

    info!(router = %config.base_url, timeout = ?config.timeout, "Querying router");
    let client = RouterClient::with_config(config).context("Failed to create router client")?;
    let set = client.fetch_all().await;
    if !set.is_usable() {
        warn!("Router reported no WAN address, IPv6 address or prefix");
    }
    Ok(set)
}

fn print_field(label: &str, value: Option<String>) {
    match value {
        Some(value) => println!("   {} {}", label.dimmed(), value),
        None => println!("   {} {}", label.dimmed(), "-".dimmed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_check_takes_an_ip_and_router_flags() {
        let cli = Cli::try_parse_from([
            "localredirect",
            "check",
            "203.0.113.5",
            "--router-url",
            "http://fritz.box:49000",
            "--router-timeout",
            "2s",
        ])
        .unwrap();

        match cli.command {
            Commands::Check { ip, router } => {
                assert_eq!(ip, "203.0.113.5".parse::<IpAddr>().unwrap());
                assert_eq!(router.router_url.as_deref(), Some("http://fritz.box:49000"));
                assert_eq!(router.router_timeout.as_deref(), Some("2s"));
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_check_rejects_non_ip() {
        assert!(Cli::try_parse_from(["localredirect", "check", "my-server"]).is_err());
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["localredirect", "--verbose", "serve"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Serve { port, bind, .. } => {
                assert_eq!(port, 8000);
                assert_eq!(bind, "0.0.0.0");
            }
            _ => panic!("expected serve"),
        }
    }
}
