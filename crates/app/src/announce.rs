use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use issue_desk_core::{notification::new_issue_message, IssueResponse};
use issue_desk_notify::NotifyClient;

/// Announces a new issue on a background task.
///
/// Returns `None` when no notification service is configured. Failures are
/// logged and counted, never reported to the caller.
pub fn spawn_new_issue(
    notifier: Option<&NotifyClient>,
    issue: &IssueResponse,
) -> Option<JoinHandle<()>> {
    let Some(notifier) = notifier.cloned() else {
        debug!(stage = "notify", issue_id = issue.id, "notifications disabled");
        return None;
    };

    let issue_id = issue.id;
    let text = new_issue_message(issue);
    Some(tokio::spawn(async move {
        match notifier.send_message(&text).await {
            Ok(()) => {
                counter!("issue_notifications_total", "result" => "sent").increment(1);
                info!(stage = "notify", issue_id, "new issue announced");
            }
            Err(err) => {
                counter!("issue_notifications_total", "result" => "failed").increment(1);
                warn!(stage = "notify", issue_id, error = %err, "failed to announce new issue");
            }
        }
    }))
}
