//! One-shot match command.

use clap::Args;
use facecrm_cli::load_input;
use facecrm_faceid::{ContactRepository, Embedding, MatchOutcome, Matcher, build_gallery};
use serde::Serialize;

use super::{get_config, open_store, output, print_info, print_warning};
use crate::Cli;

/// Match a face embedding against enrolled contacts.
///
/// The query is a JSON or YAML list of numbers with the configured
/// dimension (default 128).
#[derive(Args)]
pub struct MatchCommand {
    /// Query embedding file
    #[arg(long)]
    query: String,

    /// Override the configured match threshold
    #[arg(long)]
    threshold: Option<f32>,
}

#[derive(Serialize)]
struct MatchView {
    is_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    contact_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    distance: Option<f32>,
    threshold: f32,
    gallery_size: usize,
}

impl MatchCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        let mut match_cfg = cfg.match_config();
        if let Some(t) = self.threshold {
            if !(t.is_finite() && t > 0.0) {
                anyhow::bail!("threshold must be a positive number, got {}", t);
            }
            match_cfg.threshold = t;
        }

        let values: Vec<f32> = load_input(&self.query)?;
        let query = Embedding::new(values, match_cfg.dimension)?;

        let repo = open_store(&cfg).await?;
        let contacts = repo.list().await?;
        let gallery = build_gallery(&contacts, match_cfg.dimension);
        if gallery.len() < contacts.len() {
            print_warning(&format!(
                "{} contact(s) skipped: missing or invalid embedding",
                contacts.len() - gallery.len()
            ));
        }

        let result = Matcher::new(match_cfg).find_best(&query, &gallery)?;
        match result.outcome() {
            MatchOutcome::Match { contact_id, distance } => {
                print_info(&format!("Matched {} at distance {:.4}", contact_id, distance));
            }
            MatchOutcome::NoMatch { .. } if gallery.is_empty() => {
                print_info("No enrolled contacts to match against");
            }
            MatchOutcome::NoMatch { distance } => {
                print_info(&format!("No match, nearest distance {:.4}", distance));
            }
        }

        output(cli).write(&MatchView {
            is_match: result.is_match,
            contact_id: result.contact_id,
            name: result.label,
            distance: result.distance.is_finite().then_some(result.distance),
            threshold: match_cfg.threshold,
            gallery_size: gallery.len(),
        })
    }
}
