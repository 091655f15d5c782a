use scrim_types::{AppEvent, HotkeyAction};
use tokio::time::{Instant, sleep_until};

use super::*;
use crate::controller::AppController;
use crate::state::{ControlError, ControlState};

#[tokio::test]
async fn event_loop_runs_a_translation_and_shuts_down() {
    let Harness {
        control,
        channels,
        frames,
        output,
        journal,
        ..
    } = Harness::new(auto_config());

    let app = AppController::new(channels);
    let handle = app.spawn(control);

    app.send(AppEvent::StartRequested).await.unwrap();
    app.send(AppEvent::Hotkey(HotkeyAction::ManualTranslate))
        .await
        .unwrap();
    let shown = output.clone();
    wait_until(|| shown.texts() == vec!["Hello".to_string()]).await;

    app.send(AppEvent::Shutdown).await.unwrap();
    let mut control = timeout(Duration::from_secs(5), handle)
        .await
        .expect("event loop did not exit")
        .unwrap()
        .unwrap();

    assert_eq!(control.state(), ControlState::Idle);
    assert!(frames.released());
    assert_eq!(*journal.lock(), vec!["listener", "frame_source"]);
    assert_eq!(control.start(), Err(ControlError::TornDown));
}

#[tokio::test]
async fn cancellation_tears_the_loop_down() {
    let Harness {
        control,
        channels,
        frames,
        ..
    } = Harness::new(auto_config());

    let app = AppController::new(channels);
    let handle = app.spawn(control);
    app.shutdown();

    let control = timeout(Duration::from_secs(5), handle)
        .await
        .expect("event loop did not exit")
        .unwrap()
        .unwrap();
    assert!(frames.released());
    assert!(!control.hotkeys().is_running());
}

#[tokio::test]
async fn start_without_key_is_reported_not_fatal() {
    let mut config = auto_config();
    config.api.api_key.clear();
    let Harness {
        control, channels, ..
    } = Harness::new(config);

    let app = AppController::new(channels);
    let handle = app.spawn(control);
    app.send(AppEvent::StartRequested).await.unwrap();
    app.send(AppEvent::Shutdown).await.unwrap();

    let control = handle.await.unwrap().unwrap();
    assert_eq!(control.state(), ControlState::Idle);
    assert_eq!(
        control.stats().current_message,
        ControlError::CapabilityAbsent.to_string()
    );
}

#[tokio::test(start_paused = true)]
async fn auto_mode_translates_on_the_timer_and_skips_repeats() {
    let Harness {
        control,
        channels,
        frames,
        translator,
        output,
        ..
    } = Harness::new(auto_config());

    let app = AppController::new(channels);
    let handle = app.spawn(control);
    let started = Instant::now();
    app.send(AppEvent::StartRequested).await.unwrap();

    sleep_until(started + Duration::from_millis(2900)).await;
    assert_eq!(frames.captures(), 0);
    assert_eq!(translator.calls(), 0);

    // first tick at 3 s
    let shown = output.clone();
    wait_until(|| shown.texts() == vec!["Hello".to_string()]).await;
    assert_eq!(frames.captures(), 1);
    assert_eq!(translator.calls(), 1);

    // second tick at 6 s sees the same pixels
    sleep_until(started + Duration::from_millis(6500)).await;
    let source = frames.clone();
    wait_until(|| source.captures() >= 2).await;
    assert_eq!(translator.calls(), 1);
    assert_eq!(output.texts(), vec!["Hello"]);

    app.send(AppEvent::Shutdown).await.unwrap();
    let control = handle.await.unwrap().unwrap();
    assert_eq!(control.stats().submissions, 1);
    assert!(control.stats().unchanged >= 1);
}

#[tokio::test]
async fn settings_hotkey_without_a_window_resumes_translation() {
    let Harness {
        control,
        channels,
        output,
        store,
        ..
    } = Harness::new(auto_config());

    let app = AppController::new(channels);
    let handle = app.spawn(control);
    app.send(AppEvent::StartRequested).await.unwrap();

    edit_store(&store, |config| config.ui.output_opacity = 0.3);
    app.send(AppEvent::Hotkey(HotkeyAction::OpenSettings))
        .await
        .unwrap();
    let surface = output.clone();
    wait_until(|| surface.calls().contains(&SurfaceCall::Opacity(0.3))).await;

    // Back in Running: a manual translate goes through
    app.send(AppEvent::Hotkey(HotkeyAction::ManualTranslate))
        .await
        .unwrap();
    wait_until(|| output.texts() == vec!["Hello".to_string()]).await;

    app.send(AppEvent::Shutdown).await.unwrap();
    let control = handle.await.unwrap().unwrap();
    assert_eq!(control.config().ui.output_opacity, 0.3);
}
