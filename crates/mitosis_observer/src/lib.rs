//! Run history and natural-language digests of finished or paused runs.
//!
//! The digest itself comes from a [`Summarizer`]: either the offline
//! [`HeuristicSummarizer`] or an OpenAI-compatible chat endpoint such as LM Studio.

mod history;
mod llm;

pub use history::RunHistory;
pub use llm::{clean_response, LmStudioSummarizer};

use async_trait::async_trait;
use mitosis_data::RunRecord;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SummaryError {
    /// Transport, status or body decoding failures
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with something unusable
    #[error("service error: {0}")]
    Service(String),
}

/// Turns recent run records (newest first) into prose.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, records: &[RunRecord]) -> Result<String, SummaryError>;
}

/// Offline digest built from the numbers alone.
pub struct HeuristicSummarizer;

#[async_trait]
impl Summarizer for HeuristicSummarizer {
    async fn summarize(&self, records: &[RunRecord]) -> Result<String, SummaryError> {
        let Some(latest) = records.first() else {
            return Ok("No data pending analysis.".to_string());
        };

        let mut text = format!(
            "The latest run lasted {}s: {} cells were placed and {} survive \
             ({} asexual, {} sexual).",
            latest.duration_secs,
            latest.total_cells,
            latest.survivors(),
            latest.alive_asexual,
            latest.alive_sexual,
        );
        text.push_str(&format!(
            " The population recorded {} divisions and {} sexual reproductions.",
            latest.divisions, latest.reproductions
        ));

        let verdict = match records.get(1) {
            Some(previous) => {
                let (now, before) = (latest.survivors(), previous.survivors());
                if now > before {
                    format!(" Survivors rose from {before} in the previous run.")
                } else if now < before {
                    format!(" Survivors fell from {before} in the previous run.")
                } else {
                    " Survivors matched the previous run.".to_string()
                }
            }
            None if latest.survivors() == 0 => " The colony died out.".to_string(),
            None => " No earlier run is available for comparison.".to_string(),
        };
        text.push_str(&verdict);
        Ok(text)
    }
}
