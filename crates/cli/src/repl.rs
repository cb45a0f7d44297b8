use std::io::{self, Write};

use petjoy_core::cognition::expression::{JAW_OPEN, MOUTH_SMILE_LEFT, MOUTH_SMILE_RIGHT, mouth_landmarks};
use petjoy_core::io::input::{self, InboxSender};
use petjoy_core::runtime::RuntimeStatus;
use petjoy_core::types::{BlendShape, FaceSample, PointerEvent, SpeechResult, VisionFrame};
use rustyline::error::ReadlineError;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::command::{Command, HELP};

/// Simulated camera cadence.
const FRAME_INTERVAL_SECS: f64 = 1.0 / 30.0;

/// Handles the REPL feeds into the core.
pub struct Feeds {
    pub inbox: InboxSender,
    pub speech: mpsc::Sender<Option<SpeechResult>>,
    pub frames: mpsc::Sender<VisionFrame>,
    pub status: watch::Receiver<RuntimeStatus>,
    pub pets: Vec<String>,
}

impl Feeds {
    /// Returns false once the core is gone.
    async fn dispatch(&self, cmd: Command, frame_index: &mut u64) -> bool {
        let mut frame = |face: Option<FaceSample>| {
            *frame_index += 1;
            VisionFrame {
                timestamp: *frame_index as f64 * FRAME_INTERVAL_SECS,
                face,
            }
        };

        match cmd {
            Command::Touch => self.pointer(PointerEvent::TouchMove),
            Command::Drag => self.pointer(PointerEvent::MouseMove { primary_pressed: true }),
            Command::Hover => self.pointer(PointerEvent::MouseMove { primary_pressed: false }),
            Command::Say(text) => self.speech(SpeechResult::final_result(text)).await,
            Command::Hear(text) => self.speech(SpeechResult::interim(text)).await,
            Command::Smile { left, right, jaw } => {
                let mut shapes = vec![
                    BlendShape::new(MOUTH_SMILE_LEFT, left),
                    BlendShape::new(MOUTH_SMILE_RIGHT, right),
                ];
                shapes.extend(jaw.map(|j| BlendShape::new(JAW_OPEN, j)));
                self.frame(frame(Some(FaceSample::BlendShapes(shapes))))
            }
            Command::Face { width, height } => {
                self.frame(frame(Some(FaceSample::Landmarks(mouth_landmarks(width, height)))))
            }
            Command::NoFace => self.frame(frame(None)),
            Command::Pet(id) => return input::select_pet(&self.inbox, id).await.is_ok(),
            Command::Status => println!("{}", render_status(&self.status.borrow())),
            Command::Pets => println!("{}", self.pets.join(", ")),
            Command::Help => println!("{HELP}"),
            Command::Quit => return false,
        }
        true
    }

    fn pointer(&self, event: PointerEvent) {
        if !input::submit_pointer(&self.inbox, event) {
            println!("(no stroke)");
        }
    }

    async fn speech(&self, result: SpeechResult) {
        if self.speech.send(Some(result)).await.is_err() {
            println!("(speech unavailable)");
        }
    }

    fn frame(&self, frame: VisionFrame) {
        if self.frames.try_send(frame).is_err() {
            println!("(camera unavailable)");
        }
    }
}

fn render_status(s: &RuntimeStatus) -> String {
    let degraded: Vec<&str> = s.degraded.iter().map(|m| m.as_str()).collect();
    let last = s
        .last_accepted_at
        .map(|t| t.format("%H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| "-".into());
    format!(
        "pet={} state={} accepted={} rejected={} last={} degraded=[{}]",
        s.pet,
        s.state.as_str(),
        s.accepted,
        s.rejected,
        last,
        degraded.join(",")
    )
}

/// Line-driven loop. Runtime output arrives on `lines`; commands are read on
/// a dedicated rustyline thread.
pub async fn run(
    feeds: Feeds,
    mut lines: mpsc::UnboundedReceiver<String>,
    token: CancellationToken,
    startup_notice: Option<String>,
) -> anyhow::Result<()> {
    if let Some(notice) = startup_notice {
        println!("{notice}");
    }
    println!("type `help` for commands");

    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<InputEvent>();
    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();
    spawn_input_thread(input_tx, ready_rx);
    request_next_prompt(&ready_tx);

    let mut frame_index = 0u64;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            line = lines.recv() => {
                let Some(line) = line else {
                    break;
                };
                print!("\r\x1b[2K{line}\n");
                io::stdout().flush()?;
            }
            event = input_rx.recv() => {
                let Some(event) = event else {
                    break;
                };
                match event {
                    InputEvent::Line(line) => {
                        let text = line.trim();
                        if !text.is_empty() {
                            match text.parse::<Command>() {
                                Ok(cmd) => {
                                    if !feeds.dispatch(cmd, &mut frame_index).await {
                                        break;
                                    }
                                }
                                Err(msg) => println!("{msg}"),
                            }
                        }
                        request_next_prompt(&ready_tx);
                    }
                    InputEvent::Interrupted => {
                        token.cancel();
                        break;
                    }
                    InputEvent::Eof => break,
                    InputEvent::Error(err) => {
                        eprintln!("input error: {err}");
                        break;
                    }
                }
            }
        }
    }
    drop(ready_tx);
    println!();
    Ok(())
}

fn request_next_prompt(ready_tx: &std::sync::mpsc::Sender<()>) {
    let _ = ready_tx.send(());
}

fn spawn_input_thread(
    line_tx: mpsc::UnboundedSender<InputEvent>,
    ready_rx: std::sync::mpsc::Receiver<()>,
) {
    std::thread::spawn(move || {
        let mut editor = match rustyline::DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                let _ = line_tx.send(InputEvent::Error(e.to_string()));
                return;
            }
        };

        while ready_rx.recv().is_ok() {
            match editor.readline("pet> ") {
                Ok(line) => {
                    let _ = editor.add_history_entry(line.as_str());
                    if line_tx.send(InputEvent::Line(line)).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    let _ = line_tx.send(InputEvent::Interrupted);
                    break;
                }
                Err(ReadlineError::Eof) => {
                    let _ = line_tx.send(InputEvent::Eof);
                    break;
                }
                Err(e) => {
                    let _ = line_tx.send(InputEvent::Error(e.to_string()));
                    break;
                }
            }
        }
    });
}

enum InputEvent {
    Line(String),
    Interrupted,
    Eof,
    Error(String),
}
