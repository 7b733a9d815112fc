use reqwest::{Client, Url};
use secrecy::{ExposeSecret, Secret};

use crate::domain::MemberEmail;

/// Client for the transactional email delivery API. Verification codes and
/// temporary passwords go out through here.
pub struct EmailClient {
    sender: MemberEmail,
    http_client: Client,
    base_url: Url,
    authorization_token: Secret<String>,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: MemberEmail,
        authorization_token: Secret<String>,
        timeout: std::time::Duration,
    ) -> Self {
        // take a string, parse as a Url. Now we know, from this point forward,
        // that base_url is valid.
        let base_url = Url::parse(&base_url).expect("Failed to parse base_url");

        let http_client = Client::builder().timeout(timeout).build().unwrap();

        Self {
            http_client,
            base_url,
            sender,
            authorization_token,
        }
    }

    pub async fn send_email(
        &self,
        recipient: &MemberEmail,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<(), reqwest::Error> {
        let url = self
            .base_url
            .join("/email")
            .expect("Failed to join /email with base url");

        let request_body = SendEmailRequest {
            from: self.sender.as_ref(),
            to: recipient.as_ref(),
            subject,
            html_body: html_content,
            text_body: text_content,
        };

        self.http_client
            .post(url)
            .header(
                "X-Postmark-Server-Token",
                self.authorization_token.expose_secret(),
            )
            .json(&request_body)
            .send()
            .await?
            .error_for_status()?;
        /* `send` only returns an error if sending the request failed, if a redirect loop
        was detected, or the redirect limit was exhausted. It does not return errors based on
        status codes, so we need to do that manually with `error_for_status`. */

        Ok(())
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
}
