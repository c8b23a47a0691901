use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    Open,
    Closed,
}

impl IssueStatus {
    /// Returns the canonical database representation for the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl Default for IssueStatus {
    fn default() -> Self {
        Self::Open
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string is not one of the known values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("status must be one of 'open' or 'closed' (got '{0}')")]
pub struct UnknownStatus(pub String);

impl FromStr for IssueStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Fields shared by a stored issue and a not-yet-stored one.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueDetails {
    pub full_name: String,
    pub contact_info: String,
    pub preferred_contact_method: String,
    pub has_china_experience: bool,
    pub has_supplier_contacts: bool,
    pub product_description: String,
    pub existing_product_links: String,
    pub volume: Option<f64>,
    pub weight: Option<f64>,
    pub density: Option<f64>,
    pub previous_invoice_file: Option<String>,
    pub expected_delivery_date: String,
}

/// An issue that has passed validation and is ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIssue {
    pub details: IssueDetails,
    pub status: IssueStatus,
}

impl NewIssue {
    /// New issues always start out open.
    pub fn open(details: IssueDetails) -> Self {
        Self {
            details,
            status: IssueStatus::Open,
        }
    }
}

/// A persisted issue, including internal bookkeeping fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub id: u32,
    pub details: IssueDetails,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Issue {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Public representation of an issue returned by the HTTP API.
///
/// The deletion marker is never part of this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub id: u32,
    pub full_name: String,
    pub contact_info: String,
    pub preferred_contact_method: String,
    pub has_china_experience: bool,
    pub has_supplier_contacts: bool,
    pub product_description: String,
    pub existing_product_links: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub density: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub previous_invoice_file: Option<String>,
    pub expected_delivery_date: String,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Issue> for IssueResponse {
    fn from(issue: Issue) -> Self {
        let IssueDetails {
            full_name,
            contact_info,
            preferred_contact_method,
            has_china_experience,
            has_supplier_contacts,
            product_description,
            existing_product_links,
            volume,
            weight,
            density,
            previous_invoice_file,
            expected_delivery_date,
        } = issue.details;

        Self {
            id: issue.id,
            full_name,
            contact_info,
            preferred_contact_method,
            has_china_experience,
            has_supplier_contacts,
            product_description,
            existing_product_links,
            volume,
            weight,
            density,
            previous_invoice_file,
            expected_delivery_date,
            status: issue.status,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}
