use keytime::{KeyEvent, KeyToken, KeytimeConfig, LogStore, NamedKey};
use keytime_capture::*;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;

fn press_and_release(tx: &mpsc::UnboundedSender<HookEvent>, key: KeyEvent) {
    tx.send(HookEvent::Press(key.clone())).unwrap();
    tx.send(HookEvent::Release(key)).unwrap();
}

#[tokio::test]
async fn test_escape_ends_capture() {
    let mut session = CaptureSession::new(KeytimeConfig::default());
    let (tx, rx) = mpsc::unbounded_channel();
    for key in [KeyEvent::Char('h'), KeyEvent::Char('i'), KeyEvent::Escape, KeyEvent::Char('x')] {
        press_and_release(&tx, key);
    }

    let summary = session.run(rx).await;
    assert_eq!(summary.end, CaptureEnd::Escape);
    assert_eq!(summary.snapshot.string, "hi");
    assert_eq!(summary.snapshot.keystrokes.len(), 2);
    assert_eq!(summary.snapshot.keystrokes.as_slice()[0].delay, None);
}

#[tokio::test]
async fn test_stop_key_is_recorded_then_ends_capture() {
    let mut session = CaptureSession::new(KeytimeConfig::default());
    let (tx, rx) = mpsc::unbounded_channel();
    for key in [KeyEvent::Char('o'), KeyEvent::Char('k'), KeyEvent::Char('*')] {
        press_and_release(&tx, key);
    }

    let summary = session.run(rx).await;
    assert_eq!(summary.end, CaptureEnd::StopKey);
    let tokens: Vec<KeyToken> = summary.snapshot.keystrokes.iter().map(|k| k.key).collect();
    assert_eq!(
        tokens,
        vec![KeyToken::Printable('o'), KeyToken::Printable('k'), KeyToken::Stop]
    );
}

#[tokio::test]
async fn test_word_cap_ends_capture() {
    let config = KeytimeConfig {
        recorder_max_words: 2,
        ..Default::default()
    };
    let mut session = CaptureSession::new(config);
    let (tx, rx) = mpsc::unbounded_channel();
    for key in [
        KeyEvent::Char('a'),
        KeyEvent::Named(NamedKey::Space),
        KeyEvent::Char('b'),
        KeyEvent::Named(NamedKey::Space),
        KeyEvent::Char('c'),
    ] {
        press_and_release(&tx, key);
    }

    let summary = session.run(rx).await;
    assert_eq!(summary.end, CaptureEnd::WordCap);
    assert_eq!(summary.snapshot.string, "a b ");
    assert_eq!(summary.snapshot.word_count, 2);
}

#[tokio::test]
async fn test_closed_hook_ends_capture() {
    let mut session = CaptureSession::new(KeytimeConfig::default());
    let (tx, rx) = mpsc::unbounded_channel();
    press_and_release(&tx, KeyEvent::Char('a'));
    drop(tx);

    let summary = session.run(rx).await;
    assert_eq!(summary.end, CaptureEnd::HookClosed);
    assert_eq!(summary.snapshot.string, "a");
}

#[tokio::test(start_paused = true)]
async fn test_listen_timeout() {
    let config = KeytimeConfig {
        listen_timeout_seconds: 5.0,
        ..Default::default()
    };
    let mut session = CaptureSession::new(config);
    let (tx, rx) = mpsc::unbounded_channel::<HookEvent>();

    let start = tokio::time::Instant::now();
    let summary = session.run(rx).await;
    assert_eq!(summary.end, CaptureEnd::TimedOut);
    assert!(start.elapsed() >= Duration::from_secs(5));
    drop(tx);
}

#[tokio::test]
async fn test_event_stream_reports_captured_keys() {
    let mut session = CaptureSession::new(KeytimeConfig::default());
    let event_stream = session.event_stream();
    let (tx, rx) = mpsc::unbounded_channel();
    for key in [
        KeyEvent::Char('a'),
        KeyEvent::Unmapped("F1".to_string()),
        KeyEvent::Escape,
    ] {
        press_and_release(&tx, key);
    }
    session.run(rx).await;

    let events: Vec<CaptureEvent> = event_stream.take(4).collect().await;
    assert!(matches!(
        events[0],
        CaptureEvent::Recorded { token: KeyToken::Printable('a'), delay: None, .. }
    ));
    assert!(matches!(events[1], CaptureEvent::Ignored { ref key, .. } if key.contains("F1")));
    assert!(matches!(events[2], CaptureEvent::Ignored { .. }));
    assert!(matches!(
        events[3],
        CaptureEvent::Finished { reason: CaptureEnd::Escape, .. }
    ));
}

#[tokio::test]
async fn test_save_appends_to_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = LogStore::new(dir.path().join("logs.json"));

    let mut session = CaptureSession::new(KeytimeConfig::default());
    assert!(session.save(&store).is_err());

    let (tx, rx) = mpsc::unbounded_channel();
    for key in [
        KeyEvent::Char('h'),
        KeyEvent::Char('e'),
        KeyEvent::Char('y'),
        KeyEvent::Named(NamedKey::Backspace),
        KeyEvent::Char('y'),
        KeyEvent::Escape,
    ] {
        press_and_release(&tx, key);
    }
    session.run(rx).await;

    let log = session.save(&store).unwrap();
    assert_eq!(log.string, "hey");
    assert_eq!(log.keystrokes.len(), 5);
    assert_eq!(store.find(&log.id).unwrap(), Some(log));
}
