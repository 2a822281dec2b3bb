//! Microsoft Graph mailbox access for newsbrief.
//!
//! Covers the full mail path: client-credentials authentication against
//! Azure AD, fetching messages with an OData sender/date filter, HTML body
//! extraction into plain text, link hygiene, and sending the final digest.

pub mod auth;
pub mod client;
pub mod content;
pub mod links;

pub use auth::GraphAuthenticator;
pub use client::{GraphMailClient, RawEmail};
pub use content::{EmailContent, extract_content};
pub use links::clean_links;
