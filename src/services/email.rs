use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::Serialize;

/// Dispatches one-time codes to users.
///
/// The registration flow only acknowledges success after the mailer
/// returns, so implementations must not report success optimistically.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends the verification code for a pending registration.
    async fn send_otp(&self, to_email: &str, to_name: &str, code: u32) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody {
    sender: EmailAddress,
    to: Vec<EmailAddress>,
    subject: String,
    html_content: String,
}

/// A [`Mailer`] backed by the Brevo transactional email HTTP API.
pub struct BrevoMailer {
    client: reqwest::Client,
    api_key: String,
    sender: String,
    endpoint: String,
}

impl BrevoMailer {
    pub fn new(api_key: String, sender: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            sender,
            endpoint: "https://api.brevo.com/v3/smtp/email".to_string(),
        }
    }

    fn otp_html(name: &str, code: u32) -> String {
        format!(
            r#"<div style="font-family: Arial, sans-serif; color: #333;">
  <div style="padding: 20px; border: 1px solid #ddd; border-radius: 5px;">
    <p>Hi {name},</p>
    <p>One more step to finish signing up: confirm your email by entering the code below.</p>
    <div style="text-align: center; font-size: 24px; font-weight: bold; padding: 20px; background-color: #f1f1f1; border-radius: 5px;">
      {code}
    </div>
    <p style="color: #666;">This code is only valid for 10 minutes. Never share it with anyone!</p>
  </div>
</div>"#
        )
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    async fn send_otp(&self, to_email: &str, to_name: &str, code: u32) -> Result<()> {
        let body = SendEmailBody {
            sender: EmailAddress {
                email: self.sender.clone(),
                name: Some("Chatter".to_string()),
            },
            to: vec![EmailAddress {
                email: to_email.to_string(),
                name: Some(to_name.to_string()),
            }],
            subject: "Your email verification code".to_string(),
            html_content: Self::otp_html(to_name, code),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Email(format!("Email request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Email(format!(
                "Email provider returned {}: {}",
                status, detail
            )));
        }

        tracing::debug!("OTP email dispatched to {}", to_email);
        Ok(())
    }
}
