//! End-to-end tests for the petjoy trigger pipeline.
//!
//! No database and no real sensors: producers are channel-fed and the
//! presentation sink records every render.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use petjoy_core::cognition::expression::mouth_landmarks;
use petjoy_core::cognition::intent::IntentClassifier;
use petjoy_core::cognition::normalize::normalize;
use petjoy_core::config::{PetCfg, SmileStrategy};
use petjoy_core::error::PetError;
use petjoy_core::io::input::{self, InboxSender};
use petjoy_core::io::output::PresentationSink;
use petjoy_core::pets::{Catalog, Pet};
use petjoy_core::runtime::{Runtime, RuntimeStatus};
use petjoy_core::sensory::{ChannelSpeechProvider, ChannelVisionProvider};
use petjoy_core::types::{
    ClassifiedIntent, FaceSample, InboxEvent, JoyTicket, Modality, PetState, PointerEvent,
    SpeechResult, TriggerEvent, TriggerSource, VisionFrame,
};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
struct Rendered {
    joyful: bool,
    pet: String,
    sound: String,
    video: String,
    caption: Option<String>,
}

#[derive(Default)]
struct RecordingSink {
    renders: Mutex<Vec<Rendered>>,
}

impl RecordingSink {
    fn record(&self, pet: &Pet, joyful: bool, caption: Option<&str>) {
        self.renders.lock().unwrap().push(Rendered {
            joyful,
            pet: pet.id.clone(),
            sound: pet.sound.clone(),
            video: pet.joy_video.clone(),
            caption: caption.map(str::to_owned),
        });
    }

    fn renders(&self) -> Vec<Rendered> {
        self.renders.lock().unwrap().clone()
    }
}

impl PresentationSink for RecordingSink {
    fn render_idle(&self, pet: &Arc<Pet>, caption: Option<&str>) -> Result<(), PetError> {
        self.record(pet, false, caption);
        Ok(())
    }

    fn render_joyful(
        &self,
        pet: &Arc<Pet>,
        _ticket: JoyTicket,
        caption: Option<&str>,
    ) -> Result<(), PetError> {
        self.record(pet, true, caption);
        Ok(())
    }
}

fn build(cfg: PetCfg) -> (Runtime, InboxSender, watch::Receiver<RuntimeStatus>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let (rt, tx, status) =
        Runtime::new(Arc::new(cfg), &Catalog::builtin().unwrap(), sink.clone()).unwrap();
    (rt, tx, status, sink)
}

async fn wait_status(
    rx: &mut watch::Receiver<RuntimeStatus>,
    f: impl FnMut(&RuntimeStatus) -> bool,
) -> RuntimeStatus {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(f))
        .await
        .expect("status wait timed out")
        .expect("runtime dropped")
        .clone()
}

fn speech_trigger(text: &str) -> Option<TriggerEvent> {
    let classifier = IntentClassifier::from_catalog(&Catalog::builtin().unwrap());
    classifier.classify(&normalize(text)).into_trigger()
}

/// Praise while idle makes the current pet joyful with its own assets.
#[tokio::test]
async fn scenario_praise_triggers_current_pet() {
    let (mut rt, _tx, status, sink) = build(PetCfg::default());

    let trigger = speech_trigger("かわいいね").unwrap();
    assert_eq!(trigger.source, TriggerSource::SpeechPraise);
    rt.handle(InboxEvent::Trigger(trigger));

    assert_eq!(status.borrow().state, PetState::Joyful);
    let renders = sink.renders();
    assert_eq!(renders.len(), 1);
    assert!(renders[0].joyful);
    assert_eq!(renders[0].pet, "usako");
    assert_eq!(renders[0].sound, "assets/sounds/rabbit.mp3");
    assert_eq!(renders[0].video, "assets/usako/p2.mp4");
    assert_eq!(renders[0].caption.as_deref(), Some("喜んでいるよ！"));
}

/// Naming another pet switches to it, renders its idle asset, then joy.
#[tokio::test]
async fn scenario_name_switches_pet_then_joy() {
    let (mut rt, _tx, status, sink) = build(PetCfg::default());

    let trigger = speech_trigger("タロ").unwrap();
    assert_eq!(trigger.pet_override.as_deref(), Some("taro"));
    rt.handle(InboxEvent::Trigger(trigger));

    let snap = status.borrow().clone();
    assert_eq!(snap.pet, "taro");
    assert_eq!(snap.state, PetState::Joyful);
    assert_eq!(snap.accepted, 1);

    let renders = sink.renders();
    assert_eq!(renders.len(), 2);
    assert_eq!(
        renders[0],
        Rendered {
            joyful: false,
            pet: "taro".into(),
            sound: "assets/sounds/dog.mp3".into(),
            video: "assets/taro/p2.mp4".into(),
            caption: None,
        }
    );
    assert!(renders[1].joyful);
    assert_eq!(renders[1].sound, "assets/sounds/dog.mp3");
}

/// Two touches 500 ms apart under an 800 ms cooldown: only the first counts.
#[tokio::test]
async fn scenario_touch_cooldown() {
    let (mut rt, _tx, status, sink) = build(PetCfg {
        cooldown_ms: 800,
        ..PetCfg::default()
    });
    let t0 = Instant::now();

    rt.handle(InboxEvent::Trigger(TriggerEvent::new(TriggerSource::Touch).at(t0)));
    // Finish the presentation so the second touch is judged by cooldown alone.
    rt.handle(InboxEvent::ReturnDue(JoyTicket(1)));
    assert_eq!(status.borrow().state, PetState::Idle);

    let second = TriggerEvent::new(TriggerSource::Touch).at(t0 + Duration::from_millis(500));
    rt.handle(InboxEvent::Trigger(second));

    let snap = status.borrow().clone();
    assert_eq!(snap.accepted, 1);
    assert_eq!(snap.rejected, 1);
    assert_eq!(snap.state, PetState::Idle);
    assert_eq!(rt.arbiter().session().last_trigger, Some(t0));
    assert_eq!(sink.renders().iter().filter(|r| r.joyful).count(), 1);
}

/// A geometric smile ratio of 0.45 against 0.22 makes the pet joyful.
#[tokio::test]
async fn scenario_geometric_smile_accepted() {
    let (mut rt, _tx, mut status, sink) = build(PetCfg {
        smile_strategy: SmileStrategy::Geometric,
        ..PetCfg::default()
    });
    let (frame_tx, frame_rx) = mpsc::channel(8);
    rt.spawn_vision(Box::new(ChannelVisionProvider::new(frame_rx)));
    let token = rt.token();
    let task = tokio::spawn(async move { rt.run().await });

    frame_tx
        .send(VisionFrame {
            timestamp: 0.033,
            face: Some(FaceSample::Landmarks(mouth_landmarks(0.2, 0.09))),
        })
        .await
        .unwrap();

    let snap = wait_status(&mut status, |s| s.state == PetState::Joyful).await;
    assert_eq!(snap.accepted, 1);
    assert!(sink.renders().last().unwrap().joyful);

    token.cancel();
    task.await.unwrap();
}

/// Selecting an unknown pet fails and leaves the session alone.
#[tokio::test]
async fn scenario_unknown_pet_selection() {
    let (mut rt, _tx, status, sink) = build(PetCfg::default());
    let before = status.borrow().clone();

    rt.handle(InboxEvent::SelectPet("unknown".into()));

    assert_eq!(*status.borrow(), before);
    assert_eq!(rt.arbiter().session().pet_id(), "usako");
    assert!(rt.arbiter().session().last_trigger.is_none());
    assert!(sink.renders().is_empty());
}

#[tokio::test]
async fn triggers_while_joyful_are_idempotent() {
    let (mut rt, _tx, status, _sink) = build(PetCfg::default());
    let t0 = Instant::now();
    rt.handle(InboxEvent::Trigger(TriggerEvent::new(TriggerSource::Touch).at(t0)));

    let sources = [
        TriggerSource::Smile,
        TriggerSource::SpeechPraise,
        TriggerSource::Touch,
        TriggerSource::Smile,
    ];
    for (i, source) in sources.into_iter().enumerate() {
        let at = t0 + Duration::from_secs(1 + i as u64);
        rt.handle(InboxEvent::Trigger(TriggerEvent::new(source).at(at)));
        assert_eq!(rt.arbiter().session().state, PetState::Joyful);
        assert_eq!(rt.arbiter().session().last_trigger, Some(t0));
    }
    assert_eq!(status.borrow().accepted, 1);
    assert_eq!(rt.arbiter().pending_ticket(), Some(JoyTicket(1)));
}

#[test]
fn name_beats_praise() {
    let classifier = IntentClassifier::from_catalog(&Catalog::builtin().unwrap());
    for text in ["かわいいタロ", "タロかわいい", "くろ大好き"] {
        assert!(
            matches!(classifier.classify(&normalize(text)), ClassifiedIntent::PetName(_)),
            "{text}"
        );
    }
}

/// The return to idle happens exactly after the configured delay,
/// measured from the media-ended report.
#[tokio::test(start_paused = true)]
async fn return_to_idle_after_exact_delay() {
    let (mut rt, tx, mut status, sink) = build(PetCfg::default());
    let token = rt.token();
    let task = tokio::spawn(async move { rt.run().await });

    assert!(input::submit_pointer(&tx, PointerEvent::TouchMove));
    status.wait_for(|s| s.state == PetState::Joyful).await.unwrap();

    input::joy_media_ended(&tx, JoyTicket(1)).await.unwrap();
    let ended_at = Instant::now();
    status.wait_for(|s| s.state == PetState::Idle).await.unwrap();
    assert_eq!(ended_at.elapsed(), Duration::from_millis(3000));

    let last = sink.renders().last().cloned().unwrap();
    assert!(!last.joyful);
    assert_eq!(last.caption.as_deref(), Some("また遊んでね！"));

    token.cancel();
    task.await.unwrap();
}

/// Media that never reports an end keeps the pet joyful indefinitely.
#[tokio::test(start_paused = true)]
async fn no_return_before_media_ends() {
    let (mut rt, _tx, status, _sink) = build(PetCfg::default());
    rt.handle(InboxEvent::Trigger(TriggerEvent::new(TriggerSource::Touch)));
    tokio::time::advance(Duration::from_secs(60)).await;
    assert_eq!(status.borrow().state, PetState::Joyful);
}

/// Switching pets mid-joy shows the new pet at once and the old pet's
/// return-to-idle never lands.
#[tokio::test(start_paused = true)]
async fn pet_switch_interrupts_joy() {
    let (mut rt, tx, mut status, sink) = build(PetCfg::default());
    let token = rt.token();
    let task = tokio::spawn(async move { rt.run().await });

    assert!(input::submit_pointer(&tx, PointerEvent::MouseMove { primary_pressed: true }));
    status.wait_for(|s| s.state == PetState::Joyful).await.unwrap();
    input::joy_media_ended(&tx, JoyTicket(1)).await.unwrap();

    input::select_pet(&tx, "kuro").await.unwrap();
    let snap = status.wait_for(|s| s.pet == "kuro").await.unwrap().clone();
    assert_eq!(snap.state, PetState::Idle);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let renders = sink.renders();
    let last = renders.last().unwrap();
    assert_eq!(last.pet, "kuro");
    assert!(!last.joyful);
    assert_eq!(last.caption, None);
    assert!(renders.iter().all(|r| r.caption.as_deref() != Some("また遊んでね！")));

    token.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn speech_pipeline_triggers_joy() {
    let (mut rt, _tx, mut status, sink) = build(PetCfg::default());
    let (speech_tx, speech_rx) = mpsc::channel(8);
    rt.spawn_speech(Box::new(ChannelSpeechProvider::new(speech_rx)));
    let token = rt.token();
    let task = tokio::spawn(async move { rt.run().await });

    speech_tx.send(Some(SpeechResult::interim("ク"))).await.unwrap();
    speech_tx.send(Some(SpeechResult::final_result("クロ、おいで！"))).await.unwrap();

    let snap = wait_status(&mut status, |s| s.state == PetState::Joyful).await;
    assert_eq!(snap.pet, "kuro");
    assert!(sink.renders().iter().any(|r| r.joyful && r.pet == "kuro"));

    token.cancel();
    task.await.unwrap();
}

/// Losing the camera degrades vision only; touch keeps working.
#[tokio::test]
async fn lost_camera_degrades_vision_only() {
    let (mut rt, tx, mut status, _sink) = build(PetCfg::default());
    let (frame_tx, frame_rx) = mpsc::channel::<VisionFrame>(1);
    drop(frame_tx);
    rt.spawn_vision(Box::new(ChannelVisionProvider::new(frame_rx)));
    let token = rt.token();
    let task = tokio::spawn(async move { rt.run().await });

    let snap = wait_status(&mut status, |s| s.is_degraded(Modality::Vision)).await;
    assert!(!snap.is_degraded(Modality::Touch));

    assert!(input::submit_pointer(&tx, PointerEvent::TouchMove));
    wait_status(&mut status, |s| s.state == PetState::Joyful).await;

    token.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn greeting_rendered_on_start() {
    let (mut rt, _tx, mut status, sink) = build(PetCfg::default());
    let token = rt.token();
    let task = tokio::spawn(async move { rt.run().await });

    // The first publish happens right after the greeting.
    wait_status(&mut status, |s| s.pet == "usako").await;
    tokio::task::yield_now().await;
    token.cancel();
    task.await.unwrap();

    let first = sink.renders().first().cloned().unwrap();
    assert!(!first.joyful);
    assert_eq!(first.caption.as_deref(), Some("こんにちは！"));
}
