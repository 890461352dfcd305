use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::Parser;
use eyre::WrapErr;
use pointmap_core::{map::marker::PointDescriptor, resource::gate::ResourceGate};
use pointmap_viewer::{
    config::ViewerConfig,
    logging::{level_for, setup_logging},
    server::MapServer,
    state::ViewState,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, help = "JSON file holding an array of points")]
    points: Option<PathBuf>,

    #[arg(short, long, help = "JSON config overriding the built-in defaults")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Address to serve the map page on")]
    listen: Option<SocketAddr>,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    verbose: u8,
}

fn read_points(path: &Path) -> eyre::Result<Vec<PointDescriptor>> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read points {}", path.display()))?;
    serde_json::from_str(&text).wrap_err_with(|| format!("failed to parse points {}", path.display()))
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = Args::parse();
    setup_logging(level_for(args.verbose));

    let mut config = ViewerConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    let listen = config.listen;

    let state = Arc::new(ViewState::new(config, ResourceGate::global().clone()));

    if let Some(path) = &args.points {
        let points = read_points(path)?;
        tracing::info!(count = points.len(), "loaded points");
        state.update_points(points)?;
    }

    if let Err(error) = state.mount().await {
        tracing::warn!(%error, "map unavailable, serving fallback page");
    }

    let server = MapServer::start(Arc::clone(&state), listen)
        .await
        .wrap_err("failed to start map server")?;
    println!("http://{}/", server.local_addr());

    tokio::signal::ctrl_c()
        .await
        .wrap_err("failed to wait for ctrl-c")?;

    drop(server);
    state.unmount();
    Ok(())
}
