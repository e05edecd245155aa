//! Serve command handler.

use anyhow::Context as _;
use heritage_kg::config::HeritageConfig;
use heritage_kg::http::{self, AppState};
use heritage_kg::observability::MetricsHandle;
use heritage_kg::services::voice::{NlsSpeechService, SpeechService};
use heritage_kg::storage::GraphStore;
use std::sync::Arc;

/// Serve command.
///
/// Store setup and the speech client are built on the blocking pool: the
/// `SQLite` open and seed import do file I/O, and the blocking HTTP client
/// must not be created on a runtime thread.
pub async fn cmd_serve(
    mut config: HeritageConfig,
    metrics: Option<MetricsHandle>,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let addr = config.server.socket_addr()?;

    let setup = config.clone();
    let (store, speech) = tokio::task::spawn_blocking(move || build_backends(&setup))
        .await
        .context("startup task panicked")??;

    let mut state = AppState::new(store, &config);
    if let Some(speech) = speech {
        state = state.with_speech(speech);
    }
    if let Some(handle) = metrics.as_ref().and_then(MetricsHandle::router_handle) {
        state = state.with_metrics(handle.clone());
    }

    let router = http::build_router(state, &config.server);
    http::serve(router, addr).await?;
    Ok(())
}

type Backends = (Arc<dyn GraphStore>, Option<Arc<dyn SpeechService>>);

fn build_backends(config: &HeritageConfig) -> anyhow::Result<Backends> {
    let store = super::open_store(config)?;

    let speech: Option<Arc<dyn SpeechService>> = if config.speech.enabled {
        let service = NlsSpeechService::new(&config.speech)
            .context("speech is enabled but the gateway client could not be configured")?;
        tracing::info!(asr = %config.speech.asr_url, tts = %config.speech.tts_url, "Speech gateway configured");
        Some(Arc::new(service))
    } else {
        tracing::info!("Speech disabled, /api/voice/interact will reject requests");
        None
    };

    Ok((store, speech))
}
