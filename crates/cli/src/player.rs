//! Console stand-in for the display. Prints each render, checks the
//! referenced assets and simulates joy-clip playback.

use std::path::{Path, PathBuf};
use std::time::Duration;

use petjoy_core::error::PetError;
use petjoy_core::io::input::{self, InboxSender};
use petjoy_core::io::output::{RenderCommand, RenderReceiver};
use petjoy_core::pets::Pet;
use petjoy_core::types::JoyTicket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const DEFAULT_CLIP_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct PlayerOpts {
    /// Simulated length of every joy clip.
    pub clip: Duration,
    /// Directory asset paths are resolved against. `None` skips the checks.
    pub asset_root: Option<PathBuf>,
}

impl PlayerOpts {
    /// `PETJOY_CLIP_MS` and `PETJOY_ASSETS`.
    pub fn from_env() -> Self {
        let clip_ms = std::env::var("PETJOY_CLIP_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CLIP_MS);
        Self {
            clip: Duration::from_millis(clip_ms),
            asset_root: std::env::var_os("PETJOY_ASSETS").map(PathBuf::from),
        }
    }

    fn check(&self, pet: &Pet, asset: &str) -> bool {
        let Some(root) = &self.asset_root else {
            return true;
        };
        if root.join(asset).exists() {
            return true;
        }
        let err = PetError::asset(&pet.id, asset, format!("not found under {}", root.display()));
        tracing::warn!(error = %err, "asset unavailable");
        false
    }
}

/// Consume render commands until the channel closes or `token` is cancelled.
/// Display lines go to `out`.
pub async fn run(
    mut renders: RenderReceiver,
    inbox: InboxSender,
    opts: PlayerOpts,
    out: mpsc::UnboundedSender<String>,
    token: CancellationToken,
) {
    let mut playing: Option<JoinHandle<()>> = None;

    loop {
        let cmd = tokio::select! {
            _ = token.cancelled() => break,
            cmd = renders.recv() => match cmd {
                Some(cmd) => cmd,
                None => break,
            },
        };

        // A new render replaces whatever was on screen.
        if let Some(clip) = playing.take() {
            clip.abort();
        }

        let _ = out.send(describe(&cmd));
        match cmd {
            RenderCommand::Idle { pet, .. } => {
                opts.check(&pet, &pet.idle_image);
            }
            RenderCommand::Joyful { pet, ticket, .. } => {
                opts.check(&pet, &pet.sound);
                let clip = if opts.check(&pet, &pet.joy_video) {
                    opts.clip
                } else {
                    Duration::ZERO
                };
                playing = Some(play(ticket, clip, inbox.clone(), token.clone()));
            }
        }
    }

    if let Some(clip) = playing {
        clip.abort();
    }
}

fn play(
    ticket: JoyTicket,
    clip: Duration,
    inbox: InboxSender,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(clip) => {
                tracing::debug!(%ticket, clip_ms = clip.as_millis() as u64, "joy clip finished");
                if let Err(e) = input::joy_media_ended(&inbox, ticket).await {
                    tracing::warn!(error = %e, %ticket, "media end not delivered");
                }
            }
        }
    })
}

fn describe(cmd: &RenderCommand) -> String {
    let caption = |c: &Option<String>| c.as_ref().map(|c| format!("  「{c}」")).unwrap_or_default();
    match cmd {
        RenderCommand::Idle { pet, caption: c } => {
            format!("[idle] {} {}{}", pet.id, file_name(&pet.idle_image), caption(c))
        }
        RenderCommand::Joyful { pet, ticket, caption: c } => format!(
            "[joy]  {} ♪{} ▶{} ({ticket}){}",
            pet.id,
            file_name(&pet.sound),
            file_name(&pet.joy_video),
            caption(c)
        ),
    }
}

fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}
