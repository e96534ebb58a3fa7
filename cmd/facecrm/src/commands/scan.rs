//! Recognition over a recorded frame stream.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use facecrm_cli::{PrecomputedExtractor, PrecomputedLoader, ReplayFrameSource, load_recording};
use facecrm_faceid::{LazyExtractor, Matcher};
use facecrm_recognize::{MatchTransition, RecognitionEvent, RecognitionState, Recognizer};
use serde::Serialize;
use tracing::debug;

use super::{get_config, open_store, output, print_info, print_success, print_warning};
use crate::Cli;

/// Run recognition over recorded camera frames.
///
/// --frames is a JSONL file, one frame per line:
/// `{"faces": [{"box": {...}, "score": 0.98, "embedding": [...]}]}` or
/// `{"unavailable": true}`. Every state change and match transition is
/// printed as one JSON line. Matched contacts get their last-seen time
/// updated.
#[derive(Args)]
pub struct ScanCommand {
    /// Recorded frames (JSONL)
    #[arg(long)]
    frames: String,

    /// Stop after this many milliseconds even if frames remain
    #[arg(long)]
    duration_ms: Option<u64>,
}

#[derive(Serialize)]
struct Sighting {
    name: String,
    times: u32,
}

impl ScanCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        let rec_cfg = cfg.recognizer_config();
        let poll = rec_cfg.interval;

        let recorded = Arc::new(PrecomputedExtractor::new(cfg.matching.dimension));
        let source = Arc::new(ReplayFrameSource::new(
            load_recording(&self.frames).await?,
            &recorded,
        ));
        let model = Arc::new(LazyExtractor::new(PrecomputedLoader::new(recorded)));
        model.ensure_loaded().await?;
        debug!(frames = source.len(), "recording loaded");

        let repo = open_store(&cfg).await?;
        let recognizer = Recognizer::new(
            rec_cfg,
            Matcher::new(cfg.match_config()),
            model,
            source.clone(),
            repo,
        );

        recognizer.start().await?;
        print_info(&format!(
            "Scanning {} frame(s) against {} contact(s)",
            source.len(),
            recognizer.gallery().len()
        ));

        let out = output(cli);
        let deadline = self
            .duration_ms
            .map(|ms| tokio::time::Instant::now() + Duration::from_millis(ms));
        let mut sightings: BTreeMap<String, Sighting> = BTreeMap::new();
        let mut ticker = tokio::time::interval(poll);
        let mut stopped_early = false;

        loop {
            tokio::select! {
                ev = recognizer.recv_event() => {
                    let Some(ev) = ev else { break };
                    record(&mut sightings, &ev);
                    out.write_line(&ev)?;
                    if let RecognitionEvent::Update(u) = &ev {
                        if u.state == RecognitionState::Idle {
                            stopped_early = true;
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    let expired = deadline.is_some_and(|d| tokio::time::Instant::now() >= d);
                    if source.finished() || expired {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    print_warning("Interrupted");
                    break;
                }
            }
        }

        recognizer.stop().await;
        while let Some(ev) = recognizer.try_recv_event() {
            record(&mut sightings, &ev);
            out.write_line(&ev)?;
        }

        if stopped_early {
            anyhow::bail!("recognition stopped on an unrecoverable error");
        }
        print_success(&format!("Scan finished, {} contact(s) recognized", sightings.len()));
        for (id, s) in &sightings {
            print_info(&format!("{} ({}) seen {} time(s)", s.name, id, s.times));
        }
        Ok(())
    }
}

fn record(sightings: &mut BTreeMap<String, Sighting>, ev: &RecognitionEvent) {
    let Some(u) = ev.as_update() else { return };
    let id = match &u.transition {
        MatchTransition::Matched { contact_id } | MatchTransition::Reseen { contact_id } => {
            contact_id
        }
        _ => return,
    };
    let name = u
        .current_match
        .as_ref()
        .and_then(|m| m.label.clone())
        .unwrap_or_default();
    sightings
        .entry(id.clone())
        .or_insert(Sighting { name, times: 0 })
        .times += 1;
}
