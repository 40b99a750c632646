/// Ordered precondition checks for deleting a category.
///
/// `authorize_deletion` settles who is asking and for what; `validate_deletion`
/// then checks the fallback category. Each check returns the first failing
/// `DeletionError`; nothing is mutated before all of them pass.
use uuid::Uuid;

use super::categories::DeletionError;
use crate::models::{Category, User};
use crate::store::{LinkStore, UserDirectory};

/// A known admin asking to delete an existing category.
#[derive(Debug, Clone)]
pub struct AuthorizedDeletion {
    pub requester: User,
    pub category: Category,
}

/// Everything the cascade needs once validation has passed.
#[derive(Debug, Clone)]
pub struct ValidatedDeletion {
    pub requester: User,
    pub category: Category,
    pub fallback: Category,
}

pub async fn authorize_deletion(
    store: &dyn LinkStore,
    users: &dyn UserDirectory,
    requester_id: Option<Uuid>,
    category_id: Uuid,
) -> Result<AuthorizedDeletion, DeletionError> {
    let requester = require_known_requester(users, requester_id).await?;
    let category = require_category(store, category_id).await?;
    require_admin(&requester)?;

    Ok(AuthorizedDeletion {
        requester,
        category,
    })
}

pub async fn validate_deletion(
    store: &dyn LinkStore,
    authorized: AuthorizedDeletion,
    fallback_name: &str,
) -> Result<ValidatedDeletion, DeletionError> {
    let fallback = require_fallback_other_than(store, &authorized.category, fallback_name).await?;

    Ok(ValidatedDeletion {
        requester: authorized.requester,
        category: authorized.category,
        fallback,
    })
}

async fn require_known_requester(
    users: &dyn UserDirectory,
    requester_id: Option<Uuid>,
) -> Result<User, DeletionError> {
    let requester_id = requester_id.ok_or(DeletionError::Unauthorized)?;
    users
        .find_user_by_id(requester_id)
        .await?
        .ok_or(DeletionError::Unauthorized)
}

async fn require_category(
    store: &dyn LinkStore,
    category_id: Uuid,
) -> Result<Category, DeletionError> {
    store
        .find_category_by_id(category_id)
        .await?
        .ok_or(DeletionError::NotFound)
}

fn require_admin(requester: &User) -> Result<(), DeletionError> {
    if requester.is_admin() {
        Ok(())
    } else {
        Err(DeletionError::Forbidden)
    }
}

/// The fallback is looked up on every call, never cached.
async fn require_fallback_other_than(
    store: &dyn LinkStore,
    category: &Category,
    fallback_name: &str,
) -> Result<Category, DeletionError> {
    let fallback = store
        .find_fallback_category()
        .await?
        .ok_or_else(|| DeletionError::FallbackMissing {
            name: fallback_name.to_string(),
        })?;

    if fallback.id == category.id {
        return Err(DeletionError::CannotDeleteFallback {
            name: fallback.name,
        });
    }

    Ok(fallback)
}
