/// Listing status collaborator
///
/// The listing lifecycle is owned elsewhere; this service only reads and
/// writes the status slice it needs: forcing a submission into review, and
/// publishing or rejecting it when staff decide.
use crate::error::{ModError, ModResult};
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

/// Listing status values this service touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingStatus {
    PendingReview,
    Published,
    Rejected,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::PendingReview => "pending_review",
            ListingStatus::Published => "published",
            ListingStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> ModResult<Self> {
        match s.to_lowercase().as_str() {
            "pending_review" => Ok(ListingStatus::PendingReview),
            "published" => Ok(ListingStatus::Published),
            "rejected" => Ok(ListingStatus::Rejected),
            _ => Err(ModError::Validation(format!("Invalid listing status: {}", s))),
        }
    }
}

/// Listing store
#[derive(Clone)]
pub struct ListingStore {
    db: SqlitePool,
}

impl ListingStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Current status of a listing, None if the row does not exist yet
    pub async fn status(&self, id: &str) -> ModResult<Option<ListingStatus>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT status FROM listing WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.map(|(status,)| ListingStatus::from_str(&status)).transpose()
    }

    /// Force an existing listing into review, regardless of what the
    /// submitter requested. Returns false when no row exists yet (the
    /// create flow: the listing service applies the pending status itself
    /// when it persists the listing).
    pub async fn force_pending_review(&self, id: &str) -> ModResult<bool> {
        let result = sqlx::query("UPDATE listing SET status = ?, updated_at = ? WHERE id = ?")
            .bind(ListingStatus::PendingReview.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Status update inside a caller-owned transaction. Returns the number
    /// of rows touched; the caller treats zero as a missing listing.
    pub(crate) async fn set_status_tx(
        tx: &mut Transaction<'_, Sqlite>,
        id: &str,
        status: ListingStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE listing SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> ListingStore {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        ListingStore::new(pool)
    }

    async fn seed_listing(store: &ListingStore, id: &str, status: &str) {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO listing (id, user_id, status, created_at, updated_at) VALUES (?, 'user-1', ?, ?, ?)",
        )
        .bind(id)
        .bind(status)
        .bind(&now)
        .bind(&now)
        .execute(&store.db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_force_pending_review_overrides_published() {
        let store = test_store().await;
        seed_listing(&store, "ad-1", "published").await;

        assert!(store.force_pending_review("ad-1").await.unwrap());
        assert_eq!(
            store.status("ad-1").await.unwrap(),
            Some(ListingStatus::PendingReview)
        );
    }

    #[tokio::test]
    async fn test_force_pending_review_without_row_is_a_noop() {
        let store = test_store().await;

        assert!(!store.force_pending_review("missing").await.unwrap());
        assert_eq!(store.status("missing").await.unwrap(), None);
    }
}
