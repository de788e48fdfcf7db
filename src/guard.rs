//! Ownership checks in front of every post, comment and profile mutation.

use sqlx::SqlitePool;

use crate::models::account::Account;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Delete,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Post,
    Comment,
    Account,
}

impl ResourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Post => "Post",
            ResourceKind::Comment => "Comment",
            ResourceKind::Account => "User",
        }
    }

    fn owner_query(&self) -> &'static str {
        match self {
            ResourceKind::Post => "SELECT author_id FROM posts WHERE id = ?1",
            ResourceKind::Comment => "SELECT author_id FROM comments WHERE id = ?1",
            ResourceKind::Account => "SELECT id FROM accounts WHERE id = ?1",
        }
    }
}

/// An existing resource together with the account that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub kind: ResourceKind,
    pub id: i64,
    pub owner_id: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("{} not found", .0.label())]
    NotFound(ResourceKind),

    #[error("not the owner of this {}", .kind.label())]
    Forbidden { kind: ResourceKind },

    #[error("ownership lookup failed: {0}")]
    Store(#[from] sqlx::Error),
}

/// Decides whether `account` may perform `action` on an existing `resource`.
///
/// Accounts are owned by themselves, so a profile edit is only allowed when
/// the target id is the caller's own id.
pub fn authorize(account: &Account, action: Action, resource: &Resource) -> Result<(), AuthzError> {
    let permitted = match resource.kind {
        ResourceKind::Account => resource.id == account.id && resource.owner_id == account.id,
        ResourceKind::Post | ResourceKind::Comment => resource.owner_id == account.id,
    };

    if permitted {
        Ok(())
    } else {
        tracing::warn!(
            account_id = account.id,
            ?action,
            kind = resource.kind.label(),
            resource_id = resource.id,
            owner_id = resource.owner_id,
            "ownership check failed"
        );
        Err(AuthzError::Forbidden {
            kind: resource.kind,
        })
    }
}

/// Loads resource owners from the store and applies [`authorize`].
#[derive(Clone)]
pub struct OwnershipGuard {
    pool: SqlitePool,
}

impl OwnershipGuard {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn load(&self, kind: ResourceKind, id: i64) -> Result<Option<Resource>, sqlx::Error> {
        let owner_id: Option<i64> = sqlx::query_scalar(kind.owner_query())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(owner_id.map(|owner_id| Resource { kind, id, owner_id }))
    }

    /// Existence is checked first: a missing resource is `NotFound`, an
    /// existing one owned by someone else is `Forbidden`.
    pub async fn check(
        &self,
        account: &Account,
        action: Action,
        kind: ResourceKind,
        id: i64,
    ) -> Result<Resource, AuthzError> {
        let resource = self.load(kind, id).await?.ok_or(AuthzError::NotFound(kind))?;
        authorize(account, action, &resource)?;
        Ok(resource)
    }
}
