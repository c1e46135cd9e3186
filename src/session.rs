use crate::query::Filter;
use crate::region::NormalizedKey;
use tracing::debug;

/// The filter combination a recommendation belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterSignature {
    pub filter: Filter,
    pub selected: Option<NormalizedKey>,
}

/// Recommendation panel state
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Recommendation {
    /// Request action offered (when there is data to ask about)
    #[default]
    Hidden,
    /// Text received for the current signature; action withdrawn
    Visible(String),
}

/// Per-session selection bookkeeping.
///
/// One transition rule: observing a different signature hides the
/// recommendation and drops its text.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    signature: Option<FilterSignature>,
    recommendation: Recommendation,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the signature of the current render pass.
    /// Returns true when it differs from the previous one.
    pub fn observe(&mut self, signature: FilterSignature) -> bool {
        if self.signature.as_ref() == Some(&signature) {
            return false;
        }
        let first = self.signature.is_none();
        if !first {
            debug!(?signature, "filter signature changed, resetting recommendation");
        }
        self.signature = Some(signature);
        self.recommendation = Recommendation::Hidden;
        !first
    }

    pub fn signature(&self) -> Option<&FilterSignature> {
        self.signature.as_ref()
    }

    pub fn recommendation(&self) -> &Recommendation {
        &self.recommendation
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.recommendation, Recommendation::Visible(_))
    }

    /// Store generated text for the current signature
    pub fn show(&mut self, text: String) {
        self.recommendation = Recommendation::Visible(text);
    }
}
