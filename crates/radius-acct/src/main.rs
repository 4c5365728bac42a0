use clap::Parser;
use radius_acct::{AccountingProcess, Config};
use std::path::{Path, PathBuf};
use std::process;
use tokio::net::UnixListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// RADIUS accounting worker for a tunneling server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "radius-acctd")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "radius-acct.json")]
    config: PathBuf,

    /// Unix socket the foreground process connects to
    #[arg(short, long, value_name = "SOCKET", default_value = "/var/run/radius-acct/worker.sock")]
    socket: PathBuf,

    /// Validate configuration and exit (doesn't start the worker)
    #[arg(long)]
    validate: bool,
}

fn print_summary(config: &Config) {
    println!("Configuration summary:");
    println!("  Log level: {}", config.log_level.as_deref().unwrap_or("info"));
    println!("  Non-fatal accounting: {}", config.non_fatal_accounting);
    println!("  Status file: {}", config.status_file);
    println!("  System routes: {}", config.system_routes);
    match config.vsa_script {
        Some(ref script) => println!("  Hook script: {} (pipe {})", script, config.vsa_named_pipe),
        None => println!("  Hook script: none"),
    }
    println!("Accounting servers:");
    for server in &config.servers {
        println!("  {} (retries {}, wait {}s)", server.address, server.retries, server.wait);
    }
}

fn bind_socket(path: &Path) -> std::io::Result<UnixListener> {
    // a previous worker may have left its socket behind
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    UnixListener::bind(path)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration (without logging first)
    let config = match Config::from_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing_subscriber::registry()
                .with(EnvFilter::new("info"))
                .with(tracing_subscriber::fmt::layer())
                .init();

            if cli.validate || cli.config.exists() {
                eprintln!("Configuration validation failed: {}", e);
                process::exit(1);
            }

            warn!("Could not load config file from: {}", cli.config.display());
            info!("Creating example configuration at: {}", cli.config.display());
            if let Err(e) = Config::example().to_file(&cli.config) {
                error!("Error creating example config: {}", e);
                process::exit(1);
            }
            info!("Please edit {} and restart the worker", cli.config.display());
            process::exit(0);
        }
    };

    if cli.validate {
        println!("Configuration validated successfully");
        print_summary(&config);
        process::exit(0);
    }

    let log_level = config.log_level.as_deref().unwrap_or("info");
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("radius-acctd v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from: {}", cli.config.display());

    let listener = match bind_socket(&cli.socket) {
        Ok(listener) => listener,
        Err(e) => {
            error!("Cannot listen on {}: {}", cli.socket.display(), e);
            process::exit(1);
        }
    };
    info!("Waiting for foreground process on {}", cli.socket.display());

    let stream = match listener.accept().await {
        Ok((stream, _)) => stream,
        Err(e) => {
            error!("Accept failed: {}", e);
            process::exit(1);
        }
    };
    drop(listener);
    if let Err(e) = std::fs::remove_file(&cli.socket) {
        warn!("Cannot remove {}: {}", cli.socket.display(), e);
    }

    let mut worker = match AccountingProcess::from_config(stream, &config) {
        Ok(worker) => worker,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = worker.run().await {
        error!("Accounting worker error: {}", e);
        process::exit(1);
    }
}
