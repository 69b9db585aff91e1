use keytime::{KeytimeConfig, LogStore};
use keytime_capture::CaptureSession;
use std::path::PathBuf;
use tokio_stream::StreamExt;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match std::env::args().nth(1) {
        Some(path) => KeytimeConfig::from_json_file(path)?,
        None => KeytimeConfig::default(),
    };
    let store = LogStore::new(PathBuf::from("logs.json"));

    let mut session = CaptureSession::new(config);
    let mut event_stream = session.event_stream();
    tokio::spawn(async move {
        while let Some(event) = event_stream.next().await {
            println!("{}", serde_json::to_string(&event).unwrap_or_default());
        }
    });

    info!("Type something; release Escape or the stop key to finish");
    let summary = session.start().await?;
    info!(end = ?summary.end, typed = %summary.snapshot.string, "Recording done");

    let log = session.save(&store)?;
    info!(id = %log.id, "Recording saved to {:?}", store.path());
    Ok(())
}
