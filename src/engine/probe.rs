//! Duration probing through the engine's diagnostic log

use super::{discard, stage_source, EngineError, TranscodeEngine};
use crate::project::SourceHandle;
use regex::Regex;
use std::sync::OnceLock;

fn duration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Duration:\s*(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").expect("valid duration regex")
    })
}

/// Parse the first `Duration: HH:MM:SS.xx` line of an ffmpeg log into seconds
pub fn parse_duration(log: &str) -> Option<f64> {
    let caps = duration_re().captures(log)?;
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    let total = hours * 3600.0 + minutes * 60.0 + seconds;
    (total.is_finite() && total > 0.0).then_some(total)
}

/// Ask the engine for the duration of a source
///
/// Runs ffmpeg with only an input, which exits non-zero after printing the
/// input summary; the summary is all we need.
pub async fn probe_duration(
    engine: &dyn TranscodeEngine,
    source: &SourceHandle,
) -> Result<Option<f64>, EngineError> {
    let input = stage_source(engine, source, "probe").await?;
    let args = vec!["-i".to_string(), input.clone()];
    let result = engine.exec(&args).await;
    discard(engine, &input).await;

    let log = match result {
        Ok(output) => output.log,
        Err(e) => match e.log() {
            Some(log) => log.to_string(),
            None => return Err(e),
        },
    };

    let duration = parse_duration(&log);
    tracing::debug!("Probed {}: duration={:?}", source.display_name(), duration);
    Ok(duration)
}
