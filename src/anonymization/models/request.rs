//! Caller context carried by every service operation

use serde::{Deserialize, Serialize};

/// Who is asking, and why
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Processing purpose, checked against the consent policy
    pub purpose: Option<String>,

    /// Free-form reason recorded in the audit trail
    pub access_reason: Option<String>,

    /// Principal that authorized the request
    pub authorized_by: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    pub fn with_access_reason(mut self, reason: impl Into<String>) -> Self {
        self.access_reason = Some(reason.into());
        self
    }

    pub fn with_authorized_by(mut self, principal: impl Into<String>) -> Self {
        self.authorized_by = Some(principal.into());
        self
    }

    /// Purpose or `"unspecified"`
    pub fn purpose_label(&self) -> &str {
        self.purpose.as_deref().unwrap_or("unspecified")
    }
}
