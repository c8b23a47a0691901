//! Domain types for the issue desk.
//!
//! Requests are validated into [`issue::NewIssue`] values here; storage turns
//! them into [`issue::Issue`] records and the API exposes
//! [`issue::IssueResponse`].

pub mod issue;
pub mod notification;
pub mod request;

pub use issue::{Issue, IssueDetails, IssueResponse, IssueStatus, NewIssue, UnknownStatus};
pub use request::{CreateIssueRequest, UpdateIssueRequest, ValidationError};
