//! Outbound e-mail through an HTTP mail provider.
//!
//! Templates are authored in this repository (minijinja, under
//! `templates/`), not on the provider. Send failures are logged and
//! never abort the calling action: a magic-link send failure surfaces
//! to the client as a generic "try again".

use std::time::Duration;

use minijinja::Environment;
use serde::Serialize;

/// The named templates the system sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Magic-link sign-in mail.
    MagicLink,
    /// Tenant invitation mail.
    Invitation,
}

impl Template {
    const fn name(self) -> &'static str {
        match self {
            Self::MagicLink => "magic_link",
            Self::Invitation => "invitation",
        }
    }
}

/// The wire request to the mail provider.
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    body: &'a str,
}

/// HTTP mail client with in-repo templates.
#[derive(Debug)]
pub struct Mailer {
    client: reqwest::Client,
    api_url: String,
    sender: String,
    env: Environment<'static>,
}

impl Mailer {
    /// Build a mailer with the configured provider endpoint.
    ///
    /// Template parse failures are programming errors surfaced at
    /// startup.
    ///
    /// # Errors
    ///
    /// Returns the template error if any in-repo template is malformed.
    pub fn new(api_url: String, sender: String, timeout_ms: u64) -> Result<Self, minijinja::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .unwrap_or_default();

        let mut env = Environment::new();
        env.add_template("magic_link", include_str!("../templates/magic_link.j2"))?;
        env.add_template("invitation", include_str!("../templates/invitation.j2"))?;

        Ok(Self {
            client,
            api_url,
            sender,
            env,
        })
    }

    /// Render a template against its context.
    ///
    /// # Errors
    ///
    /// Returns the template error for unknown templates or render
    /// failures.
    pub fn render<C: Serialize>(
        &self,
        template: Template,
        context: &C,
    ) -> Result<String, minijinja::Error> {
        self.env.get_template(template.name())?.render(context)
    }

    /// Render and send one mail. Failures are logged, never propagated:
    /// e-mail is best-effort by contract.
    pub async fn send<C: Serialize>(&self, template: Template, recipient: &str, context: &C) {
        let body = match self.render(template, context) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(error = %e, template = template.name(), "mail template failed to render");
                return;
            }
        };
        let request = SendRequest {
            from: &self.sender,
            to: recipient,
            body: &body,
        };
        match self.client.post(&self.api_url).json(&request).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(template = template.name(), "mail sent");
            }
            Ok(response) => {
                tracing::warn!(
                    status = %response.status(),
                    template = template.name(),
                    "mail provider refused the send"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, template = template.name(), "mail provider unreachable");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn make_mailer() -> Mailer {
        Mailer::new(
            String::from("http://127.0.0.1:1/send"),
            String::from("Boomtown <no-reply@boomtown.local>"),
            200,
        )
        .unwrap()
    }

    #[test]
    fn magic_link_template_renders() {
        let mailer = make_mailer();
        let body = mailer
            .render(
                Template::MagicLink,
                &serde_json::json!({
                    "username": "jcalm",
                    "link": "https://play.boomtown.example/auth/magic?token=abc",
                    "code": "123456",
                    "valid_minutes": 15,
                }),
            )
            .unwrap();
        assert!(body.contains("jcalm"));
        assert!(body.contains("123456"));
        assert!(body.contains("15 minutes"));
    }

    #[test]
    fn invitation_template_renders() {
        let mailer = make_mailer();
        let body = mailer
            .render(
                Template::Invitation,
                &serde_json::json!({
                    "inviter": "Dana",
                    "tenant": "Acme Group",
                    "link": "https://play.boomtown.example/invite?token=xyz",
                    "valid_hours": 72,
                }),
            )
            .unwrap();
        assert!(body.contains("Acme Group"));
        assert!(body.contains("72 hours"));
    }

    #[tokio::test]
    async fn send_failure_does_not_propagate() {
        // Nothing listens on the endpoint; send logs and returns.
        let mailer = make_mailer();
        mailer
            .send(
                Template::MagicLink,
                "someone@example.com",
                &serde_json::json!({
                    "username": "x", "link": "y", "code": "z", "valid_minutes": 15
                }),
            )
            .await;
    }
}
