//! Like relations for posts and comments.
//!
//! A like is the existence of an `(account, target)` row. The composite
//! primary key on each like table is what rules out duplicates; the ledger
//! never relies on a read-then-insert check. Counts are aggregated from the
//! relation inside the same transaction as the mutation.

use sqlx::{SqliteConnection, SqlitePool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Post,
    Comment,
}

impl TargetKind {
    pub fn label(&self) -> &'static str {
        match self {
            TargetKind::Post => "Post",
            TargetKind::Comment => "Comment",
        }
    }

    fn insert_sql(&self) -> &'static str {
        match self {
            TargetKind::Post => "INSERT INTO post_likes (account_id, post_id) VALUES (?1, ?2)",
            TargetKind::Comment => {
                "INSERT INTO comment_likes (account_id, comment_id) VALUES (?1, ?2)"
            }
        }
    }

    fn delete_sql(&self) -> &'static str {
        match self {
            TargetKind::Post => "DELETE FROM post_likes WHERE account_id = ?1 AND post_id = ?2",
            TargetKind::Comment => {
                "DELETE FROM comment_likes WHERE account_id = ?1 AND comment_id = ?2"
            }
        }
    }

    fn count_sql(&self) -> &'static str {
        match self {
            TargetKind::Post => "SELECT COUNT(*) FROM post_likes WHERE post_id = ?1",
            TargetKind::Comment => "SELECT COUNT(*) FROM comment_likes WHERE comment_id = ?1",
        }
    }

    fn exists_sql(&self) -> &'static str {
        match self {
            TargetKind::Post => "SELECT EXISTS (SELECT 1 FROM posts WHERE id = ?1)",
            TargetKind::Comment => "SELECT EXISTS (SELECT 1 FROM comments WHERE id = ?1)",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("{} already liked", .0.label())]
    AlreadyLiked(TargetKind),

    #[error("{} not liked", .0.label())]
    NotLiked(TargetKind),

    #[error("{} not found", .0.label())]
    TargetNotFound(TargetKind),

    #[error("ledger store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Maps constraint violations from the like insert onto ledger outcomes.
fn classify_insert_error(err: sqlx::Error, kind: TargetKind) -> LedgerError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return LedgerError::AlreadyLiked(kind);
        }
        if db.is_foreign_key_violation() {
            return LedgerError::TargetNotFound(kind);
        }
    }
    LedgerError::Store(err)
}

async fn count_in(
    conn: &mut SqliteConnection,
    target_id: i64,
    kind: TargetKind,
) -> Result<u64, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(kind.count_sql())
        .bind(target_id)
        .fetch_one(conn)
        .await?;
    Ok(count.max(0) as u64)
}

#[derive(Clone)]
pub struct InteractionLedger {
    pool: SqlitePool,
}

impl InteractionLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Records that `actor_id` likes the target and returns the new total.
    ///
    /// The insert is the first statement of the transaction, so concurrent
    /// callers serialise on the write lock and all but one hit the key.
    pub async fn like(
        &self,
        actor_id: i64,
        target_id: i64,
        kind: TargetKind,
    ) -> Result<u64, LedgerError> {
        let mut tx = self.pool.begin().await?;

        if let Err(e) = sqlx::query(kind.insert_sql())
            .bind(actor_id)
            .bind(target_id)
            .execute(&mut *tx)
            .await
        {
            return Err(classify_insert_error(e, kind));
        }

        let count = count_in(&mut tx, target_id, kind).await?;
        tx.commit().await?;

        tracing::debug!(actor_id, target_id, kind = kind.label(), count, "like recorded");
        Ok(count)
    }

    /// Removes the like and returns the new total.
    pub async fn unlike(
        &self,
        actor_id: i64,
        target_id: i64,
        kind: TargetKind,
    ) -> Result<u64, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(kind.delete_sql())
            .bind(actor_id)
            .bind(target_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            let exists: bool = sqlx::query_scalar(kind.exists_sql())
                .bind(target_id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists {
                LedgerError::NotLiked(kind)
            } else {
                LedgerError::TargetNotFound(kind)
            });
        }

        let count = count_in(&mut tx, target_id, kind).await?;
        tx.commit().await?;

        tracing::debug!(actor_id, target_id, kind = kind.label(), count, "like removed");
        Ok(count)
    }

    /// Current number of likes on the target; 0 for unknown targets.
    pub async fn count_for(&self, target_id: i64, kind: TargetKind) -> Result<u64, LedgerError> {
        let count: i64 = sqlx::query_scalar(kind.count_sql())
            .bind(target_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
