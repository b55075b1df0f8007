//! Outbound collaborators: in-app notifications and transactional email.
//!
//! Both are fire-and-forget from the engine's point of view. Callers log
//! failures and never roll back a committed business transaction for them.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::listing::ListingId;
use crate::domain::owner::OwnerId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub owner_id: OwnerId,
    pub kind: String,
    pub subtype: String,
    pub listing_id: Option<ListingId>,
    pub payload: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub owner_id: OwnerId,
    pub kind: String,
    pub subtype: String,
    pub listing_id: Option<ListingId>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notification store unavailable: {0}")]
    Unavailable(String),
    #[error("notification payload rejected: {0}")]
    InvalidPayload(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("email transport failed: {0}")]
    Transport(String),
    #[error("unknown email template `{0}`")]
    UnknownTemplate(String),
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn create(&self, request: NotificationRequest) -> Result<(), NotificationError>;

    async fn exists(
        &self,
        owner_id: &OwnerId,
        subtype: &str,
        listing_id: &ListingId,
    ) -> Result<bool, NotificationError>;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, template: &str, data: serde_json::Value) -> Result<(), EmailError>;
}

#[derive(Clone, Default)]
pub struct InMemoryNotificationSender {
    sent: Arc<Mutex<Vec<NotificationRequest>>>,
}

impl InMemoryNotificationSender {
    pub fn sent(&self) -> Vec<NotificationRequest> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl NotificationSender for InMemoryNotificationSender {
    async fn create(&self, request: NotificationRequest) -> Result<(), NotificationError> {
        match self.sent.lock() {
            Ok(mut sent) => sent.push(request),
            Err(poisoned) => poisoned.into_inner().push(request),
        }
        Ok(())
    }

    async fn exists(
        &self,
        owner_id: &OwnerId,
        subtype: &str,
        listing_id: &ListingId,
    ) -> Result<bool, NotificationError> {
        Ok(self.sent().iter().any(|request| {
            request.owner_id == *owner_id
                && request.subtype == subtype
                && request.listing_id.as_ref() == Some(listing_id)
        }))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentEmail {
    pub template: String,
    pub data: serde_json::Value,
}

#[derive(Clone, Default)]
pub struct InMemoryEmailSender {
    sent: Arc<Mutex<Vec<SentEmail>>>,
}

impl InMemoryEmailSender {
    pub fn sent(&self) -> Vec<SentEmail> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl EmailSender for InMemoryEmailSender {
    async fn send(&self, template: &str, data: serde_json::Value) -> Result<(), EmailError> {
        let email = SentEmail { template: template.to_string(), data };
        match self.sent.lock() {
            Ok(mut sent) => sent.push(email),
            Err(poisoned) => poisoned.into_inner().push(email),
        }
        Ok(())
    }
}
