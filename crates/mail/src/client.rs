//! Microsoft Graph mail client.
//!
//! Fetches messages from a mailbox with a sender/date OData filter and
//! sends the synthesized digest back out through the same mailbox.

use crate::auth::GraphAuthenticator;
use chrono::{Duration, Utc};
use newsbrief_core::error::MailError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Cap on how many messages a single fetch returns.
const FETCH_PAGE_SIZE: u32 = 50;

/// A message as fetched from the mailbox, body still in HTML.
#[derive(Debug, Clone)]
pub struct RawEmail {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub received_at: String,
    pub body_html: String,
}

pub struct GraphMailClient {
    auth: Arc<GraphAuthenticator>,
    user_id: String,
    client: reqwest::Client,
}

impl GraphMailClient {
    pub fn new(auth: Arc<GraphAuthenticator>, user_id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            auth,
            user_id: user_id.into(),
            client,
        }
    }

    /// Build the OData `$filter` expression for a fetch.
    ///
    /// Filters on received date (midnight UTC, `days_back` days ago) and on
    /// the allowed sender addresses OR'd together. With no senders the date
    /// clause stands alone.
    fn build_filter(days_back: i64, senders: &[String]) -> String {
        let since = (Utc::now() - Duration::days(days_back))
            .format("%Y-%m-%d")
            .to_string();
        let date_clause = format!("receivedDateTime ge {since}T00:00:00Z");

        if senders.is_empty() {
            return date_clause;
        }

        let sender_clauses: Vec<String> = senders
            .iter()
            .map(|s| format!("from/emailAddress/address eq '{s}'"))
            .collect();

        format!("{} and ({})", date_clause, sender_clauses.join(" or "))
    }

    /// Fetch messages received in the last `days_back` days from the given
    /// senders, newest first.
    pub async fn fetch_messages(
        &self,
        days_back: i64,
        senders: &[String],
    ) -> Result<Vec<RawEmail>, MailError> {
        let token = self.auth.access_token().await?;
        let filter = Self::build_filter(days_back, senders);

        debug!(%filter, "Fetching mailbox messages");

        let url = format!("{GRAPH_BASE}/users/{}/messages", self.user_id);
        let top = FETCH_PAGE_SIZE.to_string();
        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .query(&[
                ("$filter", filter.as_str()),
                ("$top", top.as_str()),
                ("$select", "id,subject,from,receivedDateTime,body"),
                ("$orderby", "receivedDateTime desc"),
            ])
            .send()
            .await
            .map_err(|e| MailError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return Err(MailError::AuthenticationFailed(
                "Graph rejected the access token".into(),
            ));
        }

        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::FetchFailed(format!(
                "Graph returned status {status}: {body}"
            )));
        }

        let listing: MessageListing = response
            .json()
            .await
            .map_err(|e| MailError::FetchFailed(format!("Malformed message listing: {e}")))?;

        let emails: Vec<RawEmail> = listing
            .value
            .into_iter()
            .map(|m| RawEmail {
                id: m.id,
                subject: m.subject.unwrap_or_default(),
                sender: m
                    .from
                    .and_then(|f| f.email_address)
                    .map(|a| a.address)
                    .unwrap_or_default(),
                received_at: m.received_date_time.unwrap_or_default(),
                body_html: m.body.map(|b| b.content).unwrap_or_default(),
            })
            .collect();

        info!(count = emails.len(), "Fetched mailbox messages");
        Ok(emails)
    }

    /// Send an HTML email through the mailbox.
    pub async fn send_mail(
        &self,
        subject: &str,
        html_body: &str,
        recipient: &str,
    ) -> Result<(), MailError> {
        let token = self.auth.access_token().await?;

        let payload = serde_json::json!({
            "message": {
                "subject": subject,
                "body": {
                    "contentType": "HTML",
                    "content": html_body,
                },
                "toRecipients": [
                    { "emailAddress": { "address": recipient } }
                ],
            },
            "saveToSentItems": true,
        });

        let url = format!("{GRAPH_BASE}/users/{}/sendMail", self.user_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MailError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return Err(MailError::AuthenticationFailed(
                "Graph rejected the access token".into(),
            ));
        }

        // sendMail answers 202 Accepted on success
        if status != 202 {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::SendFailed {
                recipient: recipient.to_string(),
                reason: format!("Graph returned status {status}: {body}"),
            });
        }

        info!(%recipient, %subject, "Digest email sent");
        Ok(())
    }
}

// --- Graph API types (internal) ---

#[derive(Debug, Deserialize)]
struct MessageListing {
    value: Vec<GraphMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphMessage {
    id: String,
    subject: Option<String>,
    from: Option<GraphFrom>,
    received_date_time: Option<String>,
    body: Option<GraphBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphFrom {
    email_address: Option<GraphEmailAddress>,
}

#[derive(Debug, Deserialize)]
struct GraphEmailAddress {
    address: String,
}

#[derive(Debug, Deserialize)]
struct GraphBody {
    content: String,
}
