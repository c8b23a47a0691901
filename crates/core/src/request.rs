use serde::Deserialize;
use thiserror::Error;

use crate::issue::{IssueDetails, IssueStatus, NewIssue};

/// Body accepted by the create endpoint.
///
/// Every field defaults so that a missing required field surfaces as a
/// [`ValidationError`] naming the field instead of a generic decode error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateIssueRequest {
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

impl CreateIssueRequest {
    /// Checks required fields and builds the issue to insert.
    pub fn into_new_issue(self) -> Result<NewIssue, ValidationError> {
        require("fullName", &self.full_name)?;
        require("contactInfo", &self.contact_info)?;
        require("preferredContactMethod", &self.preferred_contact_method)?;
        require("productDescription", &self.product_description)?;
        require("expectedDeliveryDate", &self.expected_delivery_date)?;

        let previous_invoice_file = self
            .previous_invoice_file
            .filter(|value| !value.is_empty());

        Ok(NewIssue::open(IssueDetails {
            full_name: self.full_name,
            contact_info: self.contact_info,
            preferred_contact_method: self.preferred_contact_method,
            has_china_experience: self.has_china_experience,
            has_supplier_contacts: self.has_supplier_contacts,
            product_description: self.product_description,
            existing_product_links: self.existing_product_links,
            volume: self.volume,
            weight: self.weight,
            density: self.density,
            previous_invoice_file,
            expected_delivery_date: self.expected_delivery_date,
        }))
    }
}

/// Body accepted by the status update endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateIssueRequest {
    #[serde(default)]
    pub status: Option<String>,
}

impl UpdateIssueRequest {
    pub fn parse_status(&self) -> Result<IssueStatus, ValidationError> {
        let raw = self
            .status
            .as_deref()
            .filter(|value| !value.is_empty())
            .ok_or(ValidationError::MissingField("status"))?;
        raw.parse()
            .map_err(|_| ValidationError::InvalidStatus(raw.to_string()))
    }
}

/// Client-side mistakes detected before touching the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("status must be one of 'open' or 'closed' (got '{0}')")]
    InvalidStatus(String),
}

/// Presence check only: whitespace counts as a value.
fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}
