use crate::db::models::QueueEntry;
use crate::db::queries;
use crate::error::AppError;
use crate::services::generate_code;
use crate::validation::QUEUE_CODE_LEN;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct QueuePosition {
    #[serde(flatten)]
    pub entry: QueueEntry,
    pub people_ahead: i64,
}

const JOIN_RETRY_ATTEMPTS: usize = 3;

pub struct QueueService {
    pool: PgPool,
}

impl QueueService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Walk-in joins the branch queue and gets a ticket code. Two concurrent
    /// joins can read the same MAX(position); the unique (branch_id, position)
    /// constraint rejects the loser, which retries with a fresh read.
    pub async fn join(&self, branch_id: Uuid, customer_id: Uuid) -> Result<QueueEntry, AppError> {
        for _ in 0..JOIN_RETRY_ATTEMPTS {
            let mut tx = self.pool.begin().await?;
            let code = generate_code(QUEUE_CODE_LEN);

            match queries::insert_queue_entry(&mut tx, branch_id, customer_id, &code).await {
                Ok(entry) => {
                    tx.commit().await?;
                    tracing::info!(branch_id = %branch_id, code = %entry.queue_code, position = entry.position, "customer joined queue");
                    return Ok(entry);
                }
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Conflict(
            "queue is busy, could not assign a position".to_string(),
        ))
    }

    /// Calls the lowest waiting position. Empty queue is a 404, not an error
    /// state.
    pub async fn call_next(&self, branch_id: Uuid) -> Result<QueueEntry, AppError> {
        let mut tx = self.pool.begin().await?;

        let entry = queries::next_waiting_entry_for_update(&mut tx, branch_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No waiting customers for branch {}", branch_id))
            })?;

        queries::set_queue_entry_status(&mut tx, entry.id, "called").await?;
        tx.commit().await?;

        tracing::info!(branch_id = %branch_id, code = %entry.queue_code, "customer called");
        Ok(QueueEntry {
            status: "called".to_string(),
            ..entry
        })
    }

    pub async fn mark_served(&self, queue_code: &str) -> Result<QueueEntry, AppError> {
        self.transition(queue_code, &["called"], "served").await
    }

    pub async fn leave(&self, queue_code: &str) -> Result<QueueEntry, AppError> {
        self.transition(queue_code, &["waiting", "called"], "left").await
    }

    pub async fn position(&self, queue_code: &str) -> Result<QueuePosition, AppError> {
        let entry = queries::get_queue_entry_by_code(&self.pool, queue_code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Queue entry {} not found", queue_code)))?;

        let people_ahead = if entry.status == "waiting" {
            queries::count_waiting_ahead(&self.pool, entry.branch_id, entry.position).await?
        } else {
            0
        };

        Ok(QueuePosition {
            entry,
            people_ahead,
        })
    }

    /// Status check and write share the row lock, so two transitions racing on
    /// one ticket serialize and the loser sees the committed status.
    async fn transition(
        &self,
        queue_code: &str,
        allowed_from: &[&str],
        to: &str,
    ) -> Result<QueueEntry, AppError> {
        let mut tx = self.pool.begin().await?;

        let entry = queries::get_queue_entry_by_code_for_update(&mut tx, queue_code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Queue entry {} not found", queue_code)))?;

        if !allowed_from.contains(&entry.status.as_str()) {
            return Err(AppError::Conflict(format!(
                "cannot move queue entry from {} to {}",
                entry.status, to
            )));
        }

        queries::set_queue_entry_status(&mut tx, entry.id, to).await?;
        tx.commit().await?;

        Ok(QueueEntry {
            status: to.to_string(),
            ..entry
        })
    }
}
