mod gemini;

pub use gemini::{GeminiClient, GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};

use crate::query::CauseCount;
use crate::session::SessionState;
use thiserror::Error;
use tracing::{info, warn};

/// Shown under every generated recommendation
pub const DISCLAIMER: &str = "Disclaimer: this information is generated by AI (Gemini) and is not a \
substitute for professional medical advice, diagnosis, or official government policy.";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode service response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("service returned no text")]
    Empty,
}

/// External text-generation service
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// What a recommendation is asked about
#[derive(Debug, Clone)]
pub struct Subject<'a> {
    pub region: &'a str,
    pub risk_label: &'a str,
    pub causes: &'a [CauseCount],
}

/// Result of one request action
#[derive(Debug)]
pub enum Outcome {
    /// Text stored and made visible
    Generated,
    /// A recommendation is already shown for this signature
    AlreadyVisible,
    /// Nothing to ask about (empty cause ranking)
    NoData,
    /// Service failed; session left as it was
    Failed(GenerationError),
}

/// Whether the request action should be offered
pub fn can_request(session: &SessionState, causes: &[CauseCount]) -> bool {
    !causes.is_empty() && !session.is_visible()
}

/// Render the ranked causes as `name (n cases), ...`
pub fn cause_list(causes: &[CauseCount]) -> String {
    causes
        .iter()
        .map(|c| format!("{} ({} cases)", c.cause, c.total.round() as i64))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn build_prompt(subject: &Subject<'_>) -> String {
    format!(
        "You are a public health expert.\n\
         Region data: {region} with {risk} risk.\n\
         Leading causes of death: {causes}.\n\
         Task: give recommendations for handling these causes of death.\n\
         Rules: start directly with the headings ## Strategic Response Steps and ## Prevention Advice.",
        region = subject.region,
        risk = subject.risk_label,
        causes = cause_list(subject.causes),
    )
}

/// Run the one-shot recommendation action for the current signature
pub fn request(session: &mut SessionState, generator: &dyn TextGenerator, subject: &Subject<'_>) -> Outcome {
    if subject.causes.is_empty() {
        return Outcome::NoData;
    }
    if session.is_visible() {
        return Outcome::AlreadyVisible;
    }

    let prompt = build_prompt(subject);
    match generator.generate(&prompt) {
        Ok(text) => {
            info!(region = subject.region, chars = text.len(), "recommendation generated");
            session.show(text);
            Outcome::Generated
        }
        Err(e) => {
            warn!(region = subject.region, error = %e, "recommendation request failed");
            Outcome::Failed(e)
        }
    }
}
