//! The moderation gate client.
//!
//! Every user-supplied free-text field passes through here before
//! commit. The external capability is request/response HTTP:
//! `POST {category, text}` returning `{allowed, reason?, pending?}`.
//!
//! Timeout policy: a gate that cannot answer inside its bounded wait
//! yields `Pending` -- never `Allowed`. Name fields demand a definitive
//! verdict, so a pending name surfaces as `upstream_unavailable`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use boomtown_types::{GameError, ModerationCategory, ModerationStatus};

/// The gate's verdict on one piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The text may commit and be shown.
    Allowed,
    /// The text is refused; the action fails with the reason.
    Rejected(String),
    /// No definitive answer yet; commit hidden, await admin review.
    Pending,
}

impl Verdict {
    /// The visibility status a committed artifact gets.
    pub const fn status(&self) -> ModerationStatus {
        match self {
            Self::Allowed => ModerationStatus::Approved,
            Self::Rejected(_) => ModerationStatus::Rejected,
            Self::Pending => ModerationStatus::Pending,
        }
    }
}

/// The wire request to the moderation capability.
#[derive(Debug, Serialize)]
struct ModerateRequest<'a> {
    category: &'a str,
    text: &'a str,
}

/// The wire response from the moderation capability.
#[derive(Debug, Deserialize)]
struct ModerateResponse {
    allowed: bool,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    pending: bool,
}

/// HTTP client for the external moderation capability.
#[derive(Debug, Clone)]
pub struct ModerationGate {
    client: reqwest::Client,
    url: String,
}

impl ModerationGate {
    /// Build a gate with the configured endpoint and bounded timeout.
    pub fn new(url: String, timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_default();
        Self { client, url }
    }

    /// Submit one text for a verdict.
    ///
    /// Transport failures and timeouts yield [`Verdict::Pending`] --
    /// the gate never fails open to `Allowed`.
    pub async fn moderate(&self, category: ModerationCategory, text: &str) -> Verdict {
        let category_key = match category {
            ModerationCategory::CompanyName => "company_name",
            ModerationCategory::BossName => "boss_name",
            ModerationCategory::ChatMessage => "chat_message",
            ModerationCategory::AttackMessage => "attack_message",
            ModerationCategory::HeroMessage => "hero_message",
        };
        let request = ModerateRequest {
            category: category_key,
            text,
        };

        let response = self.client.post(&self.url).json(&request).send().await;
        let parsed = match response {
            Ok(r) => r.json::<ModerateResponse>().await,
            Err(e) => {
                tracing::warn!(error = %e, category = category_key, "moderation gate unreachable");
                return Verdict::Pending;
            }
        };
        match parsed {
            Ok(body) if body.allowed => Verdict::Allowed,
            Ok(body) if body.pending => Verdict::Pending,
            Ok(body) => Verdict::Rejected(
                body.reason
                    .unwrap_or_else(|| String::from("refused by moderation")),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "moderation gate returned malformed body");
                Verdict::Pending
            }
        }
    }

    /// Moderate a name field: names block on a definitive verdict.
    ///
    /// # Errors
    ///
    /// `invalid_request` with the moderator's reason on rejection, and
    /// `upstream_unavailable` when the gate cannot decide.
    pub async fn moderate_name(
        &self,
        category: ModerationCategory,
        text: &str,
    ) -> Result<(), GameError> {
        match self.moderate(category, text).await {
            Verdict::Allowed => Ok(()),
            Verdict::Rejected(reason) => Err(GameError::invalid(reason)),
            Verdict::Pending => Err(GameError::upstream(
                "name moderation is unavailable, try again later",
            )),
        }
    }

    /// Moderate a message field: a rejection fails the action, anything
    /// else commits with the returned visibility.
    ///
    /// # Errors
    ///
    /// `invalid_request` with the moderator's reason on rejection.
    pub async fn moderate_message(
        &self,
        category: ModerationCategory,
        text: &str,
    ) -> Result<ModerationStatus, GameError> {
        match self.moderate(category, text).await {
            Verdict::Allowed => Ok(ModerationStatus::Approved),
            Verdict::Pending => Ok(ModerationStatus::Pending),
            Verdict::Rejected(reason) => Err(GameError::invalid(reason)),
        }
    }
}
