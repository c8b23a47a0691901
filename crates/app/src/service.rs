use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use issue_desk_core::{IssueResponse, IssueStatus, NewIssue};
use issue_desk_storage::{Database, IssueRepository, IssueStoreError};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Domain operations over issues, mapping stored records to API responses.
#[derive(Clone)]
pub struct IssueService {
    repo: IssueRepository,
    clock: Clock,
}

impl IssueService {
    pub fn new(database: &Database, clock: Clock) -> Self {
        Self {
            repo: database.issues(),
            clock,
        }
    }

    pub async fn create(&self, issue: NewIssue) -> Result<IssueResponse, IssueStoreError> {
        let stored = self.repo.insert(&issue, (self.clock)()).await?;
        info!(stage = "storage", issue_id = stored.id, "issue created");
        Ok(stored.into())
    }

    pub async fn get(&self, id: u32) -> Result<IssueResponse, IssueStoreError> {
        self.repo.fetch(id).await.map(IssueResponse::from)
    }

    pub async fn list(&self) -> Result<Vec<IssueResponse>, IssueStoreError> {
        let issues = self.repo.list().await?;
        Ok(issues.into_iter().map(IssueResponse::from).collect())
    }

    /// Loads the issue, applies the new status and saves the whole record.
    ///
    /// Lookup and save are separate statements; a concurrent delete between
    /// them surfaces as not-found from the save.
    pub async fn update_status(
        &self,
        id: u32,
        status: IssueStatus,
    ) -> Result<IssueResponse, IssueStoreError> {
        let mut issue = self.repo.fetch(id).await?;
        let previous = issue.status;
        issue.status = status;
        issue.updated_at = (self.clock)();
        let saved = self.repo.save(&issue).await?;

        info!(
            stage = "storage",
            issue_id = id,
            from = %previous,
            to = %status,
            "issue status updated"
        );
        Ok(saved.into())
    }

    /// Soft-deletes an issue. No route exposes this.
    #[cfg_attr(not(test), allow(dead_code))]
    pub async fn delete(&self, id: u32) -> Result<(), IssueStoreError> {
        self.repo.soft_delete(id, (self.clock)()).await?;
        info!(stage = "storage", issue_id = id, "issue soft-deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use issue_desk_core::CreateIssueRequest;
    use std::sync::Mutex;

    struct Harness {
        service: IssueService,
        now: Arc<Mutex<DateTime<Utc>>>,
    }

    impl Harness {
        fn advance(&self, by: Duration) {
            let mut now = self.now.lock().expect("clock lock");
            *now += by;
        }
    }

    async fn harness() -> Harness {
        let database = Database::connect("sqlite::memory:").await.expect("connect");
        database.run_migrations().await.expect("migrations");

        let start = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .expect("fixed time")
            .with_timezone(&Utc);
        let now = Arc::new(Mutex::new(start));
        let clock_now = now.clone();
        let clock: Clock = Arc::new(move || *clock_now.lock().expect("clock lock"));

        Harness {
            service: IssueService::new(&database, clock),
            now,
        }
    }

    fn new_issue(name: &str) -> NewIssue {
        CreateIssueRequest {
            full_name: name.to_string(),
            contact_info: "+1-555-0100".to_string(),
            preferred_contact_method: "phone".to_string(),
            product_description: "widgets".to_string(),
            expected_delivery_date: "2025-01-01".to_string(),
            ..CreateIssueRequest::default()
        }
        .into_new_issue()
        .expect("valid request")
    }

    #[tokio::test]
    async fn create_returns_open_issue_with_timestamps() {
        let h = harness().await;
        let created = h.service.create(new_issue("Jane Doe")).await.expect("create");

        assert_eq!(created.id, 1);
        assert_eq!(created.status, IssueStatus::Open);
        assert_eq!(created.created_at, created.updated_at);

        let fetched = h.service.get(created.id).await.expect("get");
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn list_returns_reverse_creation_order() {
        let h = harness().await;
        for name in ["a", "b", "c"] {
            h.service.create(new_issue(name)).await.expect("create");
            h.advance(Duration::seconds(1));
        }

        let names: Vec<String> = h
            .service
            .list()
            .await
            .expect("list")
            .into_iter()
            .map(|issue| issue.full_name)
            .collect();
        assert_eq!(names, ["c", "b", "a"]);
    }

    #[tokio::test]
    async fn update_status_refreshes_updated_at_only() {
        let h = harness().await;
        let created = h.service.create(new_issue("Jane Doe")).await.expect("create");
        h.advance(Duration::minutes(10));

        let updated = h
            .service
            .update_status(created.id, IssueStatus::Closed)
            .await
            .expect("update");
        assert_eq!(updated.status, IssueStatus::Closed);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.updated_at, created.created_at + Duration::minutes(10));

        let fetched = h.service.get(created.id).await.expect("get");
        assert_eq!(fetched.status, IssueStatus::Closed);
    }

    #[tokio::test]
    async fn update_status_of_missing_issue_is_not_found() {
        let h = harness().await;
        let err = h
            .service
            .update_status(5, IssueStatus::Closed)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn deleted_issue_disappears_from_reads() {
        let h = harness().await;
        let first = h.service.create(new_issue("first")).await.expect("create");
        let second = h.service.create(new_issue("second")).await.expect("create");

        h.service.delete(second.id).await.expect("delete");

        assert!(h.service.get(second.id).await.unwrap_err().is_not_found());
        let listed = h.service.list().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, first.id);

        let third = h.service.create(new_issue("third")).await.expect("create");
        assert_eq!(third.id, 3);
    }
}
