//! Crashtap Observer
//!
//! Binary entry point. With `CRASHTAP_WS_URL` set it taps the live game
//! hub and reconstructs rounds until the stream ends; without it, it runs
//! a scripted demo feed through the full pipeline and prints the history
//! summary.

use tracing::{info, warn, error, Level};
use tracing_subscriber::FmtSubscriber;
use tokio::sync::mpsc;

use crashtap::{
    Engine, EngineConfig, IngestOutcome, RawFrame, VERSION,
    network::tap::{run_tap, TapConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Crashtap v{}", VERSION);

    let mut engine = Engine::new(EngineConfig::default())?;

    // Console observers, the same way a dashboard feed would attach.
    engine.hub_mut().on_crash(|round| {
        info!(
            round_id = round.round_id,
            multiplier = round.crash_multiplier.unwrap_or_default(),
            latency_ms = round.latency_ms.unwrap_or_default(),
            "crash observed"
        );
        Ok(())
    });
    engine.hub_mut().on_finalized(|round| {
        if !round.is_complete() {
            warn!(round_id = round.round_id, "round captured without outcome");
        }
        Ok(())
    });

    match std::env::var("CRASHTAP_WS_URL") {
        Ok(url) => observe_live(&mut engine, url).await,
        Err(_) => demo_feed(&mut engine),
    }

    let summary = engine.store().summarize()?;
    info!("=== History Summary ===");
    info!("rounds: {}", summary.rounds);
    info!("mean multiplier: {:?}", summary.mean_multiplier);
    info!("mean duration ms: {:?}", summary.mean_duration_ms);
    info!("mean final pct remaining: {:?}", summary.mean_final_pct_remaining);
    info!(
        "high crashes (>=10x): {}, low crashes (<2x): {}",
        summary.high_crashes, summary.low_crashes
    );

    Ok(())
}

/// Tap the live hub and feed frames into the engine until the stream ends.
async fn observe_live(engine: &mut Engine, url: String) {
    let config = TapConfig {
        url,
        ..Default::default()
    };
    let (tx, mut rx) = mpsc::channel::<RawFrame>(config.channel_capacity);

    let tap = tokio::spawn(async move {
        if let Err(e) = run_tap(&config, tx).await {
            error!("tap failed: {}", e);
        }
    });

    while let Some(frame) = rx.recv().await {
        // Per-frame errors are already handled inside ingest; a store
        // error here means a finalized round may be gone - say so loudly
        // and keep observing.
        if let Err(e) = engine.ingest(&frame) {
            error!("ingest failed: {}", e);
        }
    }

    let _ = tap.await;
}

/// Demo: replay a short scripted stream through the full pipeline.
fn demo_feed(engine: &mut Engine) {
    info!("=== Demo Feed ===");

    let script = [
        // A clean round: stage -> betting -> bets -> start -> samples -> crash.
        frame("stage", serde_json::json!({"roundId": 101, "nextRoundId": 102, "ts": 1_000})),
        frame("betting", serde_json::json!({"roundId": 101, "ts": 1_050, "durationMs": 5_000})),
        frame("bets", serde_json::json!({"roundId": 101, "count": 6, "total": 420.0})),
        frame("bets", serde_json::json!({"roundId": 101, "count": 10, "total": 600.0})),
        frame("start", serde_json::json!({"roundId": 101, "ts": 6_050})),
        frame(
            "cashouts",
            serde_json::json!({
                "roundId": 101, "elapsedMs": 2_000, "remaining": 6, "total": 10,
                "entries": [{"player": "alice", "payout": 90.0, "multiplier": 1.5}]
            }),
        ),
        frame(
            "profits",
            serde_json::json!({
                "roundId": 101, "elapsedMs": 2_000,
                "entries": [{"player": "alice", "profit": 30.0}]
            }),
        ),
        frame("crash", serde_json::json!({"roundId": 101, "ts": 9_550, "multiplier": 3.5})),
        // Cross-talk from a stale replay: dropped by the id guard.
        frame("bets", serde_json::json!({"roundId": 77, "count": 3, "total": 30.0})),
        // A round the server abandons: superseded without a crash.
        frame("stage", serde_json::json!({"roundId": 102, "ts": 11_000})),
        frame("bets", serde_json::json!({"roundId": 102, "count": 4, "total": 80.0})),
        frame("stage", serde_json::json!({"roundId": 103, "ts": 20_000})),
        frame("start", serde_json::json!({"roundId": 103, "ts": 25_000})),
        frame("crash", serde_json::json!({"roundId": 103, "ts": 26_100, "multiplier": 11.2})),
        // Control frame and garbage: both skipped.
        RawFrame::new("{\"type\":6}\u{1e}"),
        RawFrame::new("%%% line noise %%%"),
    ];

    let mut finalized = 0usize;
    for raw in script {
        match engine.ingest(&raw) {
            Ok(IngestOutcome::Finalized { round }) => {
                finalized += 1;
                info!(
                    round_id = round.round_id,
                    complete = round.is_complete(),
                    bets = round.total_bets.unwrap_or_default(),
                    "round finalized"
                );
            }
            Ok(_) => {}
            Err(e) => error!("ingest failed: {}", e),
        }
    }

    info!("demo complete: {} rounds finalized", finalized);
}

/// Build a terminated hub invocation frame.
fn frame(target: &str, args: serde_json::Value) -> RawFrame {
    RawFrame::new(format!(
        "{}\u{1e}",
        serde_json::json!({"type": 1, "target": target, "arguments": [args]})
    ))
}
