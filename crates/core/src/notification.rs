use crate::issue::IssueResponse;

pub const SOURCE_LABEL: &str = "Site";
pub const ASSIGNEE_LABEL: &str = "Virtual assistant";
pub const INITIAL_STATUS_LABEL: &str = "Awaiting response";

/// Renders the chat message announcing a freshly created issue.
///
/// The source, assignee and status labels are fixed; the stored status is
/// not consulted.
pub fn new_issue_message(issue: &IssueResponse) -> String {
    format!(
        "<b>New issue</b>:\n\n\
         Name: {}\n\
         Phone: {}\n\n\
         Product: {}\n\
         Source: {SOURCE_LABEL}\n\n\
         Manager: {ASSIGNEE_LABEL}\n\
         Status: {INITIAL_STATUS_LABEL}",
        issue.full_name, issue.contact_info, issue.product_description,
    )
}
