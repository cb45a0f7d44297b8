mod command;
mod player;
mod repl;

use std::sync::Arc;

use petjoy_core::config::PetCfg;
use petjoy_core::io::output::{self, ChannelSink};
use petjoy_core::pets::Catalog;
use petjoy_core::runtime::Runtime;
use petjoy_core::sensory::{ChannelSpeechProvider, ChannelVisionProvider};
use petjoy_core::types::Modality;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DB_CONNECT_TIMEOUT_SECS: u64 = 3;
const RENDER_BUFFER: usize = 32;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Tracing: write to file when RUST_LOG is set so the prompt stays readable
    if std::env::var("RUST_LOG").is_ok() {
        let file = std::fs::File::create("/tmp/petjoy.log")?;
        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(fmt::layer().json().with_target(true).with_writer(file))
            .init();
    }

    // DATABASE_URL is optional; without it the defaults are used
    let mut startup_notice: Option<String> = None;
    let pool = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let connect_result = tokio::time::timeout(
                std::time::Duration::from_secs(DB_CONNECT_TIMEOUT_SECS),
                sqlx::postgres::PgPoolOptions::new()
                    .max_connections(2)
                    .connect(&url),
            )
            .await;

            match connect_result {
                Ok(Ok(pool)) => match sqlx::migrate!("../../migrations").run(&pool).await {
                    Ok(()) => {
                        tracing::info!("database connected and migrations applied");
                        Some(pool)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "database migration failed, using default config");
                        startup_notice = Some("note: migration failed, using default settings".into());
                        None
                    }
                },
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "failed to connect DATABASE_URL, using default config");
                    startup_notice = Some("note: cannot reach DATABASE_URL, using default settings".into());
                    None
                }
                Err(_) => {
                    tracing::warn!(timeout_secs = DB_CONNECT_TIMEOUT_SECS, "database connect timed out");
                    startup_notice = Some(format!(
                        "note: database connect timed out ({DB_CONNECT_TIMEOUT_SECS}s), using default settings"
                    ));
                    None
                }
            }
        }
        Err(_) => {
            tracing::info!("DATABASE_URL not set, using default config");
            None
        }
    };

    let cfg = match pool {
        Some(ref pool) => PetCfg::load(pool).await?,
        None => PetCfg::default(),
    };
    let cfg = Arc::new(cfg);

    let catalog = match std::env::var_os("PETJOY_CATALOG") {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::builtin()?,
    };

    let (render_tx, render_rx) = output::channel(RENDER_BUFFER);
    let (mut runtime, inbox_tx, status_rx) =
        Runtime::new(cfg, &catalog, Arc::new(ChannelSink::new(render_tx)))?;
    let pets: Vec<String> = runtime.arbiter().registry().ids().map(str::to_owned).collect();
    let token = runtime.token();

    // PETJOY_DISABLE=speech,vision simulates a denied microphone or camera
    let disabled = std::env::var("PETJOY_DISABLE").unwrap_or_default();
    let is_disabled = |m: Modality| disabled.split(',').any(|d| d.trim() == m.as_str());

    let (speech_tx, speech_rx) = mpsc::channel(16);
    let (frame_tx, frame_rx) = mpsc::channel(16);
    let speech_tx = if is_disabled(Modality::Speech) {
        drop(speech_tx);
        mpsc::channel(1).0
    } else {
        speech_tx
    };
    let frame_tx = if is_disabled(Modality::Vision) {
        drop(frame_tx);
        mpsc::channel(1).0
    } else {
        frame_tx
    };
    runtime.spawn_speech(Box::new(ChannelSpeechProvider::new(speech_rx)));
    runtime.spawn_vision(Box::new(ChannelVisionProvider::new(frame_rx)));

    let (line_tx, line_rx) = mpsc::unbounded_channel();
    tokio::spawn(player::run(
        render_rx,
        inbox_tx.clone(),
        player::PlayerOpts::from_env(),
        line_tx,
        token.clone(),
    ));

    let feeds = repl::Feeds {
        inbox: inbox_tx,
        speech: speech_tx,
        frames: frame_tx,
        status: status_rx,
        pets,
    };

    // If the REPL exits first, cancel the runtime and wait for its shutdown.
    // If the runtime exits first, cancel the REPL.
    let repl_token = token.clone();
    let runtime_fut = runtime.run();
    let repl_fut = repl::run(feeds, line_rx, repl_token, startup_notice);
    tokio::pin!(runtime_fut);
    tokio::pin!(repl_fut);

    tokio::select! {
        _ = &mut runtime_fut => {
            token.cancel();
            (&mut repl_fut).await
        }
        result = &mut repl_fut => {
            token.cancel();
            (&mut runtime_fut).await;
            result
        }
    }
}
