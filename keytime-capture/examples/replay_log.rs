use keytime::{Keytime, KeytimeConfig};
use keytime_capture::EnigoKeyboard;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Replays a saved log by id or text, or types the given text when no saved
/// log matches.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let Some(target) = std::env::args().nth(1) else {
        anyhow::bail!("usage: replay_log <log id | text>");
    };

    let device = EnigoKeyboard::new()?;
    let mut keytime = Keytime::new(KeytimeConfig::default(), device, "logs.json");

    info!("Switch to the target window, typing starts in 3 seconds");
    tokio::time::sleep(std::time::Duration::from_secs(3)).await;

    let report = match keytime.simulate_from_id(&target).await? {
        Some(report) => report,
        None => keytime.type_text(&target).await?,
    };
    info!(outcome = ?report.outcome, dispatched = report.dispatched, "Done");
    Ok(())
}
