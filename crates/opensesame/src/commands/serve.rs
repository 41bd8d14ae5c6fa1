//! `serve`: run the bridge and the HTTP listener until shutdown.

use tracing::{info, warn};

use opensesame_core::Bridge;
use opensesame_http::ServerError;

use crate::cli::{GlobalOpts, ServeArgs};
use crate::error::CliError;

pub async fn handle(args: ServeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = super::load(global)?;
    if let Some(bind) = args.bind {
        cfg.server.bind = bind;
    }
    if let Some(port) = args.port {
        cfg.server.port = port;
    }
    if args.static_dir.is_some() {
        cfg.server.static_dir = args.static_dir;
    }

    let store = cfg.build_store()?;
    info!(url = %cfg.store.url, "connecting to state store");

    let bridge = Bridge::start(cfg.bridge_config(), store.clone()).await?;
    let failed = bridge.report().failed;
    if failed > 0 {
        warn!(failed, "some points could not be seeded");
    }

    let router = opensesame_http::create_router(bridge.gateway(), cfg.server.static_dir.as_deref());
    let addr = cfg.socket_addr();
    let served: Result<(), ServerError> = async {
        let listener = opensesame_http::bind(addr).await?;
        opensesame_http::serve(listener, router, opensesame_http::shutdown_signal()).await
    }
    .await;

    bridge.shutdown().await;
    store.shutdown();
    info!("bridge stopped");

    served.map_err(CliError::from)
}
