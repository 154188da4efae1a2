//! Suggested mitigation and classification for draft risks.
//!
//! A [`SuggestionProvider`] turns a draft's title, description and stage into a
//! [`Suggestion`]. The [`SuggestionAssistant`] wraps a provider with the rules
//! the record-creation flow relies on:
//!
//! - only one request may be pending at a time; a second request while one is
//!   outstanding is refused with [`SuggestOutcome::Busy`];
//! - every call is bounded by a deadline;
//! - any failure (transport, malformed response, timeout) becomes
//!   [`SuggestOutcome::NoResult`] and leaves the draft untouched.

mod gemini;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::risk::{Likelihood, RiskDraft, Severity, Stage};

pub use gemini::GeminiProvider;

/// What is sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionRequest {
    /// Hazard title.
    pub title: String,
    /// Hazard description.
    pub description: String,
    /// Stage where the hazard was identified.
    pub stage: Stage,
}

impl SuggestionRequest {
    /// Whether there is enough text to ask for a suggestion.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.title.trim().is_empty() && !self.description.trim().is_empty()
    }
}

impl From<&RiskDraft> for SuggestionRequest {
    fn from(draft: &RiskDraft) -> Self {
        Self {
            title: draft.title.clone(),
            description: draft.description.clone(),
            stage: draft.stage,
        }
    }
}

/// A validated suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// Likely consequences of the hazard.
    pub consequences: String,
    /// Recommended mitigation.
    pub suggested_mitigation: String,
    /// Recommended likelihood.
    pub suggested_likelihood: Likelihood,
    /// Recommended severity.
    pub suggested_severity: Severity,
}

/// Response shape before domain validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSuggestion {
    consequences: String,
    suggested_mitigation: String,
    suggested_likelihood: f64,
    suggested_severity: String,
}

impl Suggestion {
    /// Parse and validate a structured response.
    ///
    /// All four fields must be present; likelihood must be a whole number in
    /// 1..=5, severity a letter A..E and the mitigation non-blank.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SuggestionResponse`] if anything is missing or out of domain.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawSuggestion =
            serde_json::from_str(text).map_err(|e| Error::suggestion_response(e.to_string()))?;

        let likelihood = raw.suggested_likelihood;
        let suggested_likelihood = whole_likelihood(likelihood).ok_or_else(|| {
            Error::suggestion_response(format!("suggestedLikelihood out of range: {likelihood}"))
        })?;

        let suggested_severity: Severity = raw.suggested_severity.parse().map_err(|_| {
            Error::suggestion_response(format!(
                "suggestedSeverity out of range: {}",
                raw.suggested_severity
            ))
        })?;

        if raw.suggested_mitigation.trim().is_empty() {
            return Err(Error::suggestion_response("suggestedMitigation is empty"));
        }

        Ok(Self {
            consequences: raw.consequences,
            suggested_mitigation: raw.suggested_mitigation,
            suggested_likelihood,
            suggested_severity,
        })
    }
}

/// Accept only whole numbers in 1..=5.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_likelihood(value: f64) -> Option<Likelihood> {
    if value.fract() != 0.0 || !(1.0..=5.0).contains(&value) {
        return None;
    }
    Likelihood::new(value as u8)
}

/// A service that proposes mitigation and classification for a hazard.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// The name of this provider (for logging).
    fn name(&self) -> &'static str;

    /// Ask for a suggestion.
    ///
    /// # Errors
    ///
    /// Returns an error if the service fails or answers with an invalid shape.
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Suggestion>;
}

/// Result of asking the assistant for a suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestOutcome {
    /// A valid suggestion was returned.
    Suggested(Suggestion),
    /// The provider failed or timed out.
    NoResult,
    /// Another request is still pending.
    Busy,
    /// Title or description is blank; nothing was sent.
    NotReady,
}

impl SuggestOutcome {
    /// The suggestion, if there is one.
    #[must_use]
    pub fn suggestion(&self) -> Option<&Suggestion> {
        match self {
            Self::Suggested(s) => Some(s),
            _ => None,
        }
    }
}

/// Releases the in-flight flag when dropped, including when the pending
/// future is dropped before completion.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Provider wrapper enforcing a single pending request and a deadline.
#[derive(Debug)]
pub struct SuggestionAssistant<S> {
    provider: S,
    timeout: Duration,
    in_flight: AtomicBool,
}

impl<S: SuggestionProvider> SuggestionAssistant<S> {
    /// Wrap `provider`, bounding each call by `timeout`.
    pub fn new(provider: S, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            in_flight: AtomicBool::new(false),
        }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &S {
        &self.provider
    }

    /// Whether a request is currently pending.
    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Ask for a suggestion.
    pub async fn request(&self, request: &SuggestionRequest) -> SuggestOutcome {
        if !request.is_ready() {
            return SuggestOutcome::NotReady;
        }
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("Suggestion already pending, request refused");
            return SuggestOutcome::Busy;
        };

        debug!(
            "Requesting suggestion from {} for '{}'",
            self.provider.name(),
            request.title
        );
        match tokio::time::timeout(self.timeout, self.provider.suggest(request)).await {
            Ok(Ok(suggestion)) => SuggestOutcome::Suggested(suggestion),
            Ok(Err(e)) => {
                warn!("Suggestion from {} failed: {}", self.provider.name(), e);
                SuggestOutcome::NoResult
            }
            Err(_) => {
                warn!(
                    "Suggestion from {} timed out after {:?}",
                    self.provider.name(),
                    self.timeout
                );
                SuggestOutcome::NoResult
            }
        }
    }

    /// Ask for a suggestion for `draft` and apply it if one arrives.
    ///
    /// The draft is only modified on [`SuggestOutcome::Suggested`].
    pub async fn enrich(&self, draft: &mut RiskDraft) -> SuggestOutcome {
        let outcome = self.request(&SuggestionRequest::from(&*draft)).await;
        if let SuggestOutcome::Suggested(suggestion) = &outcome {
            draft.apply_suggestion(suggestion);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Notify;

    fn canned() -> Suggestion {
        Suggestion {
            consequences: "Controlled flight into terrain".to_string(),
            suggested_mitigation: "Cross-check obstacle data against a second source".to_string(),
            suggested_likelihood: Likelihood::new(2).unwrap(),
            suggested_severity: Severity::A,
        }
    }

    struct CannedProvider(Option<Suggestion>);

    #[async_trait]
    impl SuggestionProvider for CannedProvider {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn suggest(&self, _request: &SuggestionRequest) -> Result<Suggestion> {
            self.0
                .clone()
                .ok_or_else(|| Error::suggestion_transport("service unavailable"))
        }
    }

    struct GatedProvider {
        gate: Notify,
    }

    #[async_trait]
    impl SuggestionProvider for GatedProvider {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn suggest(&self, _request: &SuggestionRequest) -> Result<Suggestion> {
            self.gate.notified().await;
            Ok(canned())
        }
    }

    struct StalledProvider;

    #[async_trait]
    impl SuggestionProvider for StalledProvider {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn suggest(&self, _request: &SuggestionRequest) -> Result<Suggestion> {
            std::future::pending().await
        }
    }

    fn draft() -> RiskDraft {
        RiskDraft::new(
            "Crane near threshold",
            "Temporary crane penetrates the approach surface",
            Stage::ObstacleAnalysis,
        )
    }

    #[test]
    fn test_from_json_valid() {
        let s = Suggestion::from_json(
            r#"{"consequences":"c","suggestedMitigation":"m","suggestedLikelihood":4,"suggestedSeverity":"B"}"#,
        )
        .unwrap();
        assert_eq!(s.suggested_likelihood.value(), 4);
        assert_eq!(s.suggested_severity, Severity::B);
        assert_eq!(s.suggested_mitigation, "m");
    }

    #[test]
    fn test_from_json_accepts_whole_float() {
        let s = Suggestion::from_json(
            r#"{"consequences":"c","suggestedMitigation":"m","suggestedLikelihood":3.0,"suggestedSeverity":"c"}"#,
        )
        .unwrap();
        assert_eq!(s.suggested_likelihood.value(), 3);
        assert_eq!(s.suggested_severity, Severity::C);
    }

    #[test]
    fn test_from_json_rejects_missing_field() {
        let err = Suggestion::from_json(
            r#"{"consequences":"c","suggestedMitigation":"m","suggestedLikelihood":4}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::SuggestionResponse(_)));
    }

    #[test]
    fn test_from_json_rejects_out_of_domain() {
        for body in [
            r#"{"consequences":"c","suggestedMitigation":"m","suggestedLikelihood":6,"suggestedSeverity":"A"}"#,
            r#"{"consequences":"c","suggestedMitigation":"m","suggestedLikelihood":2.5,"suggestedSeverity":"A"}"#,
            r#"{"consequences":"c","suggestedMitigation":"m","suggestedLikelihood":0,"suggestedSeverity":"A"}"#,
            r#"{"consequences":"c","suggestedMitigation":"m","suggestedLikelihood":3,"suggestedSeverity":"F"}"#,
            r#"{"consequences":"c","suggestedMitigation":" ","suggestedLikelihood":3,"suggestedSeverity":"A"}"#,
            r#"{"consequences":"c","suggestedMitigation":"m","suggestedLikelihood":"3","suggestedSeverity":"A"}"#,
            "not json",
        ] {
            assert!(Suggestion::from_json(body).is_err(), "{body}");
        }
    }

    #[test]
    fn test_request_readiness() {
        assert!(SuggestionRequest::from(&draft()).is_ready());
        let blank = RiskDraft::new(" ", "description", Stage::DataGathering);
        assert!(!SuggestionRequest::from(&blank).is_ready());
    }

    #[tokio::test]
    async fn test_enrich_applies_suggestion() {
        let assistant =
            SuggestionAssistant::new(CannedProvider(Some(canned())), Duration::from_secs(1));
        let mut d = draft();

        let outcome = assistant.enrich(&mut d).await;

        assert_eq!(outcome.suggestion(), Some(&canned()));
        assert_eq!(d.severity, Severity::A);
        assert_eq!(d.likelihood.value(), 2);
        assert_eq!(
            d.mitigation_plan,
            "Cross-check obstacle data against a second source"
        );
        assert!(!assistant.is_pending());
    }

    #[tokio::test]
    async fn test_failure_leaves_draft_unchanged() {
        let assistant = SuggestionAssistant::new(CannedProvider(None), Duration::from_secs(1));
        let mut d = draft();
        let before = d.clone();

        let outcome = assistant.enrich(&mut d).await;

        assert_eq!(outcome, SuggestOutcome::NoResult);
        assert_eq!(d, before);
        assert!(!assistant.is_pending());
    }

    #[tokio::test]
    async fn test_not_ready_skips_provider() {
        let assistant =
            SuggestionAssistant::new(CannedProvider(Some(canned())), Duration::from_secs(1));
        let mut d = RiskDraft::new("Title only", "", Stage::DesignProcess);

        assert_eq!(assistant.enrich(&mut d).await, SuggestOutcome::NotReady);
        assert!(d.mitigation_plan.is_empty());
    }

    #[tokio::test]
    async fn test_second_request_is_refused_while_pending() {
        let assistant = SuggestionAssistant::new(
            GatedProvider {
                gate: Notify::new(),
            },
            Duration::from_secs(5),
        );
        let request = SuggestionRequest::from(&draft());

        let first = assistant.request(&request);
        let second = async {
            tokio::task::yield_now().await;
            assert!(assistant.is_pending());
            let outcome = assistant.request(&request).await;
            assistant.provider().gate.notify_one();
            outcome
        };

        let (first, second) = tokio::join!(first, second);

        assert_eq!(first, SuggestOutcome::Suggested(canned()));
        assert_eq!(second, SuggestOutcome::Busy);
        assert!(!assistant.is_pending());
    }

    #[tokio::test]
    async fn test_timeout_yields_no_result() {
        let assistant = SuggestionAssistant::new(StalledProvider, Duration::from_millis(20));
        let mut d = draft();

        assert_eq!(assistant.enrich(&mut d).await, SuggestOutcome::NoResult);
        assert!(!assistant.is_pending());
    }

    #[tokio::test]
    async fn test_dropped_request_releases_guard() {
        let assistant = SuggestionAssistant::new(StalledProvider, Duration::from_secs(60));
        let request = SuggestionRequest::from(&draft());

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), assistant.request(&request)).await;

        assert!(abandoned.is_err());
        assert!(!assistant.is_pending());
    }
}
