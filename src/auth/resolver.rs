use sqlx::SqlitePool;

use super::{AuthError, Identity};
use crate::models::account::Account;

/// Maps a verified [`Identity`] onto a stored [`Account`].
///
/// Never provisions accounts; registration is a separate, explicit flow.
#[derive(Clone)]
pub struct IdentityResolver {
    pool: SqlitePool,
}

impl IdentityResolver {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn resolve(&self, identity: &Identity) -> Result<Account, AuthError> {
        match identity {
            Identity::External(subject) => Account::find_by_external_subject(&self.pool, subject)
                .await?
                .ok_or(AuthError::UnknownExternalIdentity),
            Identity::Local(account_id) => Account::find_by_id(&self.pool, *account_id)
                .await?
                .ok_or(AuthError::UnknownAccount),
        }
    }
}
