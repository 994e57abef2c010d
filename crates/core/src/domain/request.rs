use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generates a fresh id with the `REQ-` prefix used on the wire.
    pub fn generate() -> Self {
        Self(format!("REQ-{}", Uuid::new_v4().simple()))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Workflow states of a request. The four approval/rejection states are
/// terminal: once reached, no further transition is accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Pending,
    UnderReview,
    ApprovedManager,
    RejectedManager,
    ApprovedCeo,
    RejectedCeo,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderReview => "under-review",
            Self::ApprovedManager => "approved-manager",
            Self::RejectedManager => "rejected-manager",
            Self::ApprovedCeo => "approved-ceo",
            Self::RejectedCeo => "rejected-ceo",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "under-review" => Some(Self::UnderReview),
            "approved-manager" => Some(Self::ApprovedManager),
            "rejected-manager" => Some(Self::RejectedManager),
            "approved-ceo" => Some(Self::ApprovedCeo),
            "rejected-ceo" => Some(Self::RejectedCeo),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ApprovedManager | Self::RejectedManager | Self::ApprovedCeo | Self::RejectedCeo
        )
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Role of the caller performing a workflow action, as reported by the
/// identity collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Employee,
    Manager,
    Ceo,
    Admin,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Manager => "manager",
            Self::Ceo => "ceo",
            Self::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "employee" => Some(Self::Employee),
            "manager" => Some(Self::Manager),
            "ceo" => Some(Self::Ceo),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    pub role: ActorRole,
}

/// Metadata for a file uploaded alongside a request. Byte storage lives
/// with the upload collaborator; only the handle is kept here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    pub file_path: String,
    pub file_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEntry {
    pub author: String,
    pub role: ActorRole,
    pub comment: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

/// An employee-submitted request moving through the approval workflow.
///
/// `comments` and `history` are append-only; entries are never edited,
/// removed, or reordered once written. Every request carries at least one
/// history entry (the submission entry written at creation).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: RequestId,
    pub employee_id: String,
    pub employee_name: String,
    pub request_type: String,
    pub status: RequestStatus,
    pub priority: Priority,
    pub description: String,
    pub reason: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub submission_date: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
    pub comments: Vec<CommentEntry>,
    pub history: Vec<HistoryEntry>,
}

/// Fields accepted from the boundary when creating a request. Everything
/// lifecycle-related (id, status, submission date, history) is assigned by
/// the service, never by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRequest {
    pub employee_id: String,
    pub employee_name: String,
    pub request_type: String,
    pub priority: Priority,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl NewRequest {
    /// Checks the required identity fields, returning every offending
    /// field name rather than only the first.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut missing = Vec::new();
        if self.employee_id.trim().is_empty() {
            missing.push("employeeId".to_owned());
        }
        if self.employee_name.trim().is_empty() {
            missing.push("employeeName".to_owned());
        }
        if self.request_type.trim().is_empty() {
            missing.push("requestType".to_owned());
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation { fields: missing })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{NewRequest, Priority, RequestId, RequestStatus};
    use crate::errors::DomainError;

    fn new_request() -> NewRequest {
        NewRequest {
            employee_id: "E1".to_owned(),
            employee_name: "Ali".to_owned(),
            request_type: "leave".to_owned(),
            priority: Priority::Medium,
            description: "vacation".to_owned(),
            reason: None,
            start_date: None,
            end_date: None,
            amount: None,
            attachments: Vec::new(),
        }
    }

    #[test]
    fn status_slugs_round_trip() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::UnderReview,
            RequestStatus::ApprovedManager,
            RequestStatus::RejectedManager,
            RequestStatus::ApprovedCeo,
            RequestStatus::RejectedCeo,
        ] {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::parse("archived"), None);
    }

    #[test]
    fn only_approval_outcomes_are_terminal() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(!RequestStatus::UnderReview.is_terminal());
        assert!(RequestStatus::ApprovedManager.is_terminal());
        assert!(RequestStatus::RejectedManager.is_terminal());
        assert!(RequestStatus::ApprovedCeo.is_terminal());
        assert!(RequestStatus::RejectedCeo.is_terminal());
    }

    #[test]
    fn validation_reports_every_missing_field() {
        let mut request = new_request();
        request.employee_id = "  ".to_owned();
        request.request_type = String::new();

        let error = request.validate().expect_err("must reject missing fields");
        assert_eq!(
            error,
            DomainError::Validation {
                fields: vec!["employeeId".to_owned(), "requestType".to_owned()]
            }
        );
    }

    #[test]
    fn complete_input_passes_validation() {
        new_request().validate().expect("all required fields present");
    }

    #[test]
    fn generated_ids_carry_the_request_prefix() {
        let id = RequestId::generate();
        assert!(id.0.starts_with("REQ-"));
        assert_ne!(id, RequestId::generate());
    }
}
