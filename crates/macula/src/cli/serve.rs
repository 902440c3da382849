//! The `macula serve` command — run the HTTP classification service.

use std::sync::Arc;

use clap::Args;
use macula_core::{Config, StageClassifier};

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Bind address (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Execute the serve command.
///
/// The model is loaded exactly once, before the listener starts. A failed
/// load does not abort the service: it keeps serving `/health` and
/// `/api/model-info`, and every prediction request fails explicitly until
/// the operator fixes the artifact and restarts.
pub async fn execute(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let classifier = match StageClassifier::load(&config) {
        Ok(engine) => Some(Arc::new(engine)),
        Err(e) => {
            tracing::error!(
                "Failed to load model: {e}. \
                 Serving anyway; prediction requests will be rejected."
            );
            None
        }
    };

    crate::server::run(config, classifier).await
}
