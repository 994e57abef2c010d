use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use staffdesk_core::domain::request::{
    ActorRole, Attachment, CommentEntry, HistoryEntry, Priority, Request, RequestId,
    RequestStatus,
};

use super::{RepositoryError, RequestFilter, RequestRepository, TransitionWriteOutcome};
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";

fn decode<E: std::fmt::Display>(error: E) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)).map_err(decode)
}

fn parse_date(raw: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(decode)
}

fn parse_status(raw: &str) -> Result<RequestStatus, RepositoryError> {
    RequestStatus::parse(raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown request status `{raw}`")))
}

fn parse_priority(raw: &str) -> Result<Priority, RepositoryError> {
    Priority::parse(raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown priority `{raw}`")))
}

fn parse_role(raw: &str) -> Result<ActorRole, RepositoryError> {
    ActorRole::parse(raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown actor role `{raw}`")))
}

/// Decodes the scalar columns; child sequences are loaded separately.
fn row_to_request(row: &SqliteRow) -> Result<Request, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode)?;
    let employee_id: String = row.try_get("employee_id").map_err(decode)?;
    let employee_name: String = row.try_get("employee_name").map_err(decode)?;
    let request_type: String = row.try_get("request_type").map_err(decode)?;
    let status: String = row.try_get("status").map_err(decode)?;
    let priority: String = row.try_get("priority").map_err(decode)?;
    let description: String = row.try_get("description").map_err(decode)?;
    let reason: Option<String> = row.try_get("reason").map_err(decode)?;
    let start_date: Option<String> = row.try_get("start_date").map_err(decode)?;
    let end_date: Option<String> = row.try_get("end_date").map_err(decode)?;
    let amount: Option<String> = row.try_get("amount").map_err(decode)?;
    let submission_date: String = row.try_get("submission_date").map_err(decode)?;

    Ok(Request {
        id: RequestId(id),
        employee_id,
        employee_name,
        request_type,
        status: parse_status(&status)?,
        priority: parse_priority(&priority)?,
        description,
        reason,
        start_date: start_date.as_deref().map(parse_date).transpose()?,
        end_date: end_date.as_deref().map(parse_date).transpose()?,
        amount: amount
            .as_deref()
            .map(|raw| Decimal::from_str(raw).map_err(decode))
            .transpose()?,
        submission_date: parse_timestamp(&submission_date)?,
        attachments: Vec::new(),
        comments: Vec::new(),
        history: Vec::new(),
    })
}

async fn load_children(
    conn: &mut SqliteConnection,
    request: &mut Request,
) -> Result<(), RepositoryError> {
    let attachment_rows = sqlx::query(
        "SELECT file_name, file_path, file_type
         FROM request_attachments WHERE request_id = ? ORDER BY seq",
    )
    .bind(&request.id.0)
    .fetch_all(&mut *conn)
    .await?;
    request.attachments = attachment_rows
        .iter()
        .map(|row| {
            Ok(Attachment {
                file_name: row.try_get("file_name").map_err(decode)?,
                file_path: row.try_get("file_path").map_err(decode)?,
                file_type: row.try_get("file_type").map_err(decode)?,
            })
        })
        .collect::<Result<Vec<_>, RepositoryError>>()?;

    let comment_rows = sqlx::query(
        "SELECT author, role, comment, created_at
         FROM request_comments WHERE request_id = ? ORDER BY seq",
    )
    .bind(&request.id.0)
    .fetch_all(&mut *conn)
    .await?;
    request.comments = comment_rows
        .iter()
        .map(|row| {
            let role: String = row.try_get("role").map_err(decode)?;
            let created_at: String = row.try_get("created_at").map_err(decode)?;
            Ok(CommentEntry {
                author: row.try_get("author").map_err(decode)?,
                role: parse_role(&role)?,
                comment: row.try_get("comment").map_err(decode)?,
                timestamp: parse_timestamp(&created_at)?,
            })
        })
        .collect::<Result<Vec<_>, RepositoryError>>()?;

    let history_rows = sqlx::query(
        "SELECT action, author, created_at
         FROM request_history WHERE request_id = ? ORDER BY seq",
    )
    .bind(&request.id.0)
    .fetch_all(&mut *conn)
    .await?;
    request.history = history_rows
        .iter()
        .map(|row| {
            let created_at: String = row.try_get("created_at").map_err(decode)?;
            Ok(HistoryEntry {
                action: row.try_get("action").map_err(decode)?,
                author: row.try_get("author").map_err(decode)?,
                timestamp: parse_timestamp(&created_at)?,
            })
        })
        .collect::<Result<Vec<_>, RepositoryError>>()?;

    Ok(())
}

async fn fetch_request(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<Request>, RepositoryError> {
    let row = sqlx::query(
        "SELECT id, employee_id, employee_name, request_type, status, priority,
                description, reason, start_date, end_date, amount, submission_date
         FROM requests WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(ref row) => {
            let mut request = row_to_request(row)?;
            load_children(conn, &mut request).await?;
            Ok(Some(request))
        }
        None => Ok(None),
    }
}

async fn next_seq(
    conn: &mut SqliteConnection,
    table: &str,
    request_id: &str,
) -> Result<i64, RepositoryError> {
    // `table` is one of our own literals, never caller input.
    let seq: i64 =
        sqlx::query_scalar(&format!("SELECT COALESCE(MAX(seq), 0) + 1 FROM {table} WHERE request_id = ?"))
            .bind(request_id)
            .fetch_one(&mut *conn)
            .await?;
    Ok(seq)
}

async fn insert_history(
    conn: &mut SqliteConnection,
    request_id: &str,
    entry: &HistoryEntry,
) -> Result<(), RepositoryError> {
    let seq = next_seq(conn, "request_history", request_id).await?;
    sqlx::query(
        "INSERT INTO request_history (request_id, seq, action, author, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(request_id)
    .bind(seq)
    .bind(&entry.action)
    .bind(&entry.author)
    .bind(entry.timestamp.to_rfc3339())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_comment(
    conn: &mut SqliteConnection,
    request_id: &str,
    entry: &CommentEntry,
) -> Result<(), RepositoryError> {
    let seq = next_seq(conn, "request_comments", request_id).await?;
    sqlx::query(
        "INSERT INTO request_comments (request_id, seq, author, role, comment, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(request_id)
    .bind(seq)
    .bind(&entry.author)
    .bind(entry.role.as_str())
    .bind(&entry.comment)
    .bind(entry.timestamp.to_rfc3339())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn create(&self, request: Request) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO requests (id, employee_id, employee_name, request_type, status,
                                   priority, description, reason, start_date, end_date,
                                   amount, submission_date)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.employee_id)
        .bind(&request.employee_name)
        .bind(&request.request_type)
        .bind(request.status.as_str())
        .bind(request.priority.as_str())
        .bind(&request.description)
        .bind(&request.reason)
        .bind(request.start_date.map(|date| date.format(DATE_FORMAT).to_string()))
        .bind(request.end_date.map(|date| date.format(DATE_FORMAT).to_string()))
        .bind(request.amount.map(|amount| amount.to_string()))
        .bind(request.submission_date.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for (index, attachment) in request.attachments.iter().enumerate() {
            sqlx::query(
                "INSERT INTO request_attachments (request_id, seq, file_name, file_path, file_type)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&request.id.0)
            .bind(index as i64 + 1)
            .bind(&attachment.file_name)
            .bind(&attachment.file_path)
            .bind(&attachment.file_type)
            .execute(&mut *tx)
            .await?;
        }

        for entry in &request.history {
            insert_history(&mut tx, &request.id.0, entry).await?;
        }
        for entry in &request.comments {
            insert_comment(&mut tx, &request.id.0, entry).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_request(&mut conn, &id.0).await
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<Request>, RepositoryError> {
        let mut sql = String::from(
            "SELECT id, employee_id, employee_name, request_type, status, priority,
                    description, reason, start_date, end_date, amount, submission_date
             FROM requests",
        );
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(status) = filter.status {
            clauses.push("status = ?");
            params.push(status.as_str().to_owned());
        }
        if let Some(request_type) = &filter.request_type {
            clauses.push("request_type = ?");
            params.push(request_type.clone());
        }
        if let Some(search) = &filter.search {
            clauses.push(
                "(LOWER(employee_name) LIKE ? OR LOWER(request_type) LIKE ? OR LOWER(id) LIKE ?)",
            );
            let needle = format!("%{}%", search.to_lowercase());
            params.push(needle.clone());
            params.push(needle.clone());
            params.push(needle);
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY submission_date DESC");

        let mut query = sqlx::query(&sql);
        for param in &params {
            query = query.bind(param);
        }

        let mut conn = self.pool.acquire().await?;
        let rows = query.fetch_all(&mut *conn).await?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut request = row_to_request(row)?;
            load_children(&mut conn, &mut request).await?;
            requests.push(request);
        }
        Ok(requests)
    }

    async fn apply_transition(
        &self,
        id: &RequestId,
        expected_current: RequestStatus,
        next: RequestStatus,
        history: HistoryEntry,
        comment: Option<CommentEntry>,
    ) -> Result<TransitionWriteOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE requests SET status = ? WHERE id = ? AND status = ?")
            .bind(next.as_str())
            .bind(&id.0)
            .bind(expected_current.as_str())
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            // Either the row is gone or another writer won the race; the
            // transaction is dropped without any write either way.
            let actual: Option<String> =
                sqlx::query_scalar("SELECT status FROM requests WHERE id = ?")
                    .bind(&id.0)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Ok(match actual {
                Some(raw) => TransitionWriteOutcome::Conflict { actual: parse_status(&raw)? },
                None => TransitionWriteOutcome::NotFound,
            });
        }

        insert_history(&mut tx, &id.0, &history).await?;
        if let Some(entry) = &comment {
            insert_comment(&mut tx, &id.0, entry).await?;
        }

        let request = fetch_request(&mut tx, &id.0).await?.ok_or_else(|| {
            RepositoryError::Decode(format!("request {id} vanished mid-transaction"))
        })?;

        tx.commit().await?;
        Ok(TransitionWriteOutcome::Applied(request))
    }

    async fn append_comment(
        &self,
        id: &RequestId,
        comment: CommentEntry,
    ) -> Result<Option<Request>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM requests WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        insert_comment(&mut tx, &id.0, &comment).await?;
        let request = fetch_request(&mut tx, &id.0).await?.ok_or_else(|| {
            RepositoryError::Decode(format!("request {id} vanished mid-transaction"))
        })?;

        tx.commit().await?;
        Ok(Some(request))
    }

    async fn delete(&self, id: &RequestId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM requests WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    use staffdesk_core::audit;
    use staffdesk_core::domain::request::{
        ActorRole, Attachment, Priority, Request, RequestId, RequestStatus,
    };

    use super::SqlRequestRepository;
    use crate::repositories::{
        RequestFilter, RequestRepository, TransitionWriteOutcome,
    };
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_request(id: &str, name: &str) -> Request {
        Request {
            id: RequestId(id.to_owned()),
            employee_id: "E1".to_owned(),
            employee_name: name.to_owned(),
            request_type: "leave".to_owned(),
            status: RequestStatus::Pending,
            priority: Priority::Medium,
            description: "vacation".to_owned(),
            reason: Some("annual leave".to_owned()),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 5),
            amount: None,
            submission_date: Utc::now(),
            attachments: vec![Attachment {
                file_name: "ticket.pdf".to_owned(),
                file_path: "uploads/ticket.pdf".to_owned(),
                file_type: "application/pdf".to_owned(),
            }],
            comments: Vec::new(),
            history: vec![audit::submission_entry(name)],
        }
    }

    #[tokio::test]
    async fn create_and_find_round_trip() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);

        let mut request = sample_request("REQ-1", "Ali");
        request.amount = Some(Decimal::new(150_000, 2));
        repo.create(request.clone()).await.expect("create");

        let found = repo
            .find_by_id(&RequestId("REQ-1".to_owned()))
            .await
            .expect("find")
            .expect("should exist");

        assert_eq!(found.employee_id, request.employee_id);
        assert_eq!(found.employee_name, "Ali");
        assert_eq!(found.request_type, "leave");
        assert_eq!(found.status, RequestStatus::Pending);
        assert_eq!(found.priority, Priority::Medium);
        assert_eq!(found.start_date, request.start_date);
        assert_eq!(found.end_date, request.end_date);
        assert_eq!(found.amount, Some(Decimal::new(150_000, 2)));
        assert_eq!(found.attachments, request.attachments);
        assert_eq!(found.history.len(), 1);
        assert_eq!(found.history[0].action, audit::ACTION_SUBMITTED);
        assert!(found.comments.is_empty());
    }

    #[tokio::test]
    async fn find_missing_request_returns_none() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);

        let found = repo.find_by_id(&RequestId("REQ-404".to_owned())).await.expect("find");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn append_comment_leaves_status_and_history_alone() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);
        repo.create(sample_request("REQ-1", "Ali")).await.expect("create");

        let updated = repo
            .append_comment(
                &RequestId("REQ-1".to_owned()),
                audit::comment_entry("Sara", ActorRole::Manager, "please expedite"),
            )
            .await
            .expect("append")
            .expect("request exists");
        assert_eq!(updated.status, RequestStatus::Pending);
        assert_eq!(updated.history.len(), 1);
        assert_eq!(updated.comments.len(), 1);
        assert_eq!(updated.comments[0].comment, "please expedite");

        let missing = repo
            .append_comment(
                &RequestId("REQ-404".to_owned()),
                audit::comment_entry("Sara", ActorRole::Manager, "lost"),
            )
            .await
            .expect("append on missing id");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn list_orders_by_submission_date_descending() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);

        let mut older = sample_request("REQ-1", "Ali");
        older.submission_date = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let mut newer = sample_request("REQ-2", "Sara");
        newer.submission_date = Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 0).unwrap();

        repo.create(older).await.expect("create older");
        repo.create(newer).await.expect("create newer");

        let listed = repo.list(&RequestFilter::default()).await.expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id.0, "REQ-2");
        assert_eq!(listed[1].id.0, "REQ-1");
    }

    #[tokio::test]
    async fn list_applies_status_type_and_search_filters() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);

        repo.create(sample_request("REQ-1", "Ali")).await.expect("create 1");
        let mut advance = sample_request("REQ-2", "Sara");
        advance.request_type = "advance".to_owned();
        repo.create(advance).await.expect("create 2");

        let decision = audit::status_entry(RequestStatus::UnderReview, "Sara");
        repo.apply_transition(
            &RequestId("REQ-2".to_owned()),
            RequestStatus::Pending,
            RequestStatus::UnderReview,
            decision,
            None,
        )
        .await
        .expect("transition");

        let pending = repo
            .list(&RequestFilter { status: Some(RequestStatus::Pending), ..Default::default() })
            .await
            .expect("filter by status");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id.0, "REQ-1");

        let advances = repo
            .list(&RequestFilter {
                request_type: Some("advance".to_owned()),
                ..Default::default()
            })
            .await
            .expect("filter by type");
        assert_eq!(advances.len(), 1);
        assert_eq!(advances[0].id.0, "REQ-2");

        // case-insensitive substring over name, type, and id
        let by_name = repo
            .list(&RequestFilter { search: Some("ALI".to_owned()), ..Default::default() })
            .await
            .expect("search by name");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].employee_name, "Ali");

        let by_id = repo
            .list(&RequestFilter { search: Some("req-2".to_owned()), ..Default::default() })
            .await
            .expect("search by id");
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].id.0, "REQ-2");
    }

    #[tokio::test]
    async fn apply_transition_updates_status_and_appends_entries() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);
        repo.create(sample_request("REQ-1", "Ali")).await.expect("create");

        let outcome = repo
            .apply_transition(
                &RequestId("REQ-1".to_owned()),
                RequestStatus::Pending,
                RequestStatus::ApprovedManager,
                audit::status_entry(RequestStatus::ApprovedManager, "Sara"),
                Some(audit::comment_entry("Sara", ActorRole::Manager, "ok")),
            )
            .await
            .expect("apply");

        let TransitionWriteOutcome::Applied(updated) = outcome else {
            panic!("expected Applied, got {outcome:?}");
        };
        assert_eq!(updated.status, RequestStatus::ApprovedManager);
        assert_eq!(updated.history.len(), 2);
        assert_eq!(updated.history[1].action, "status changed to approved-manager");
        assert_eq!(updated.comments.len(), 1);
        assert_eq!(updated.comments[0].comment, "ok");
    }

    #[tokio::test]
    async fn apply_transition_reports_missing_request() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);

        let outcome = repo
            .apply_transition(
                &RequestId("REQ-404".to_owned()),
                RequestStatus::Pending,
                RequestStatus::UnderReview,
                audit::status_entry(RequestStatus::UnderReview, "Sara"),
                None,
            )
            .await
            .expect("apply");

        assert_eq!(outcome, TransitionWriteOutcome::NotFound);
    }

    #[tokio::test]
    async fn stale_expected_status_conflicts_without_writing() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool);
        repo.create(sample_request("REQ-1", "Ali")).await.expect("create");

        repo.apply_transition(
            &RequestId("REQ-1".to_owned()),
            RequestStatus::Pending,
            RequestStatus::ApprovedManager,
            audit::status_entry(RequestStatus::ApprovedManager, "Sara"),
            None,
        )
        .await
        .expect("first transition");

        // Second writer decided against the stale Pending snapshot.
        let outcome = repo
            .apply_transition(
                &RequestId("REQ-1".to_owned()),
                RequestStatus::Pending,
                RequestStatus::RejectedManager,
                audit::status_entry(RequestStatus::RejectedManager, "Reza"),
                None,
            )
            .await
            .expect("second transition");

        assert_eq!(
            outcome,
            TransitionWriteOutcome::Conflict { actual: RequestStatus::ApprovedManager }
        );

        let found = repo
            .find_by_id(&RequestId("REQ-1".to_owned()))
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(found.status, RequestStatus::ApprovedManager);
        assert_eq!(found.history.len(), 2);
    }

    #[tokio::test]
    async fn racing_transitions_produce_exactly_one_winner() {
        let pool = setup().await;
        let repo = std::sync::Arc::new(SqlRequestRepository::new(pool));
        repo.create(sample_request("REQ-1", "Ali")).await.expect("create");

        let approve = {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.apply_transition(
                    &RequestId("REQ-1".to_owned()),
                    RequestStatus::Pending,
                    RequestStatus::ApprovedManager,
                    audit::status_entry(RequestStatus::ApprovedManager, "Sara"),
                    None,
                )
                .await
            })
        };
        let reject = {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.apply_transition(
                    &RequestId("REQ-1".to_owned()),
                    RequestStatus::Pending,
                    RequestStatus::RejectedManager,
                    audit::status_entry(RequestStatus::RejectedManager, "Reza"),
                    None,
                )
                .await
            })
        };

        let first = approve.await.expect("join").expect("apply");
        let second = reject.await.expect("join").expect("apply");

        let applied = [&first, &second]
            .iter()
            .filter(|outcome| matches!(outcome, TransitionWriteOutcome::Applied(_)))
            .count();
        let conflicts = [&first, &second]
            .iter()
            .filter(|outcome| matches!(outcome, TransitionWriteOutcome::Conflict { .. }))
            .count();
        assert_eq!((applied, conflicts), (1, 1));

        let found = repo
            .find_by_id(&RequestId("REQ-1".to_owned()))
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(found.history.len(), 2, "exactly one transition landed");
        assert_eq!(
            found.history[1].action,
            format!("status changed to {}", found.status),
            "status matches the last committed history entry",
        );
    }

    #[tokio::test]
    async fn delete_removes_request_and_children() {
        let pool = setup().await;
        let repo = SqlRequestRepository::new(pool.clone());
        repo.create(sample_request("REQ-1", "Ali")).await.expect("create");

        assert!(repo.delete(&RequestId("REQ-1".to_owned())).await.expect("delete"));
        assert!(repo.find_by_id(&RequestId("REQ-1".to_owned())).await.expect("find").is_none());

        let orphans: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM request_history WHERE request_id = 'REQ-1'")
                .fetch_one(&pool)
                .await
                .expect("count history");
        assert_eq!(orphans, 0, "cascade removes child rows");

        // retry-safe: deleting again just reports not found
        assert!(!repo.delete(&RequestId("REQ-1".to_owned())).await.expect("redelete"));
    }
}
