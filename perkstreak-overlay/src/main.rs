use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use perkstreak_overlay::{OverlayConfig, ensure_overlay_file, serve_listener};

/// Local companion for the perk streak tracker: static files plus the OBS
/// overlay endpoints.
#[derive(Debug, Parser)]
#[command(name = "perkstreak-overlay", version)]
struct Args {
    #[arg(long, default_value_t = 8000)]
    port: u16,

    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Directory served as the tracker app.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Relative paths resolve against --root.
    #[arg(long, default_value = "progress.json")]
    progress_file: PathBuf,

    #[arg(long, default_value = "streamer-overlay.html")]
    overlay_file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = Args::parse();
    let config = OverlayConfig::new(&args.root, &args.progress_file, &args.overlay_file);
    ensure_overlay_file(&config).await?;

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let base = format!("http://localhost:{}", listener.local_addr()?.port());
    let overlay_path = config
        .overlay_url_path()
        .unwrap_or_else(|| "/streamer-overlay.html".to_string());

    info!("perk streak server started");
    info!("main app: {base}");
    info!("streamer overlay: {base}{overlay_path}");
    info!("OBS: add a Browser Source with that URL, 400x300 or as needed");

    serve_listener(listener, config, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
        }
    })
    .await?;
    Ok(())
}
