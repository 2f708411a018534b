use uuid::Uuid;

use crate::{auth::AuthUser, error::ApiError, models::Role};

/// The mutation kinds the authorization engine distinguishes. Creation of
/// role-gated resources (categories, author accounts, newsletter management)
/// goes through `AdminCreate`; everything else is an update or delete against
/// an owned resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Update,
    Delete,
    AdminCreate,
}

/// can_mutate
///
/// Pure decision function: given the caller and the target's owner (None for
/// role-only gated resources), decide whether the mutation is permitted.
/// Ordered predicate set, first match wins:
/// 1. admins may do anything;
/// 2. owners may update/delete their own resources;
/// 3. everything else is denied.
///
/// Decision only — the caller applies the effect and maps a denial to
/// `Forbidden`, never to `NotFound`.
pub fn can_mutate(caller: &AuthUser, owner: Option<Uuid>, action: Action) -> bool {
    if caller.role == Role::Admin {
        return true;
    }
    match action {
        Action::Update | Action::Delete => owner.is_some_and(|o| o == caller.id),
        Action::AdminCreate => false,
    }
}

/// can_mutate_all
///
/// Batch variant: allowed only when the caller is authorized for **every**
/// entity (admin, or owner of all). All-or-nothing by design — a batch is
/// never partially authorized.
pub fn can_mutate_all(
    caller: &AuthUser,
    owners: impl IntoIterator<Item = Uuid>,
    action: Action,
) -> bool {
    if caller.role == Role::Admin {
        return true;
    }
    if action == Action::AdminCreate {
        return false;
    }
    owners.into_iter().all(|o| o == caller.id)
}

/// Only authors and admins may create posts.
pub fn can_author_posts(role: Role) -> bool {
    matches!(role, Role::Author | Role::Admin)
}

/// Maps a denied `can_mutate` to the Forbidden error handlers return.
pub fn ensure_can_mutate(
    caller: &AuthUser,
    owner: Option<Uuid>,
    action: Action,
    message: &str,
) -> Result<(), ApiError> {
    if can_mutate(caller, owner, action) {
        Ok(())
    } else {
        Err(ApiError::forbidden(message))
    }
}

/// Admin gate for the role-only endpoints (dashboards, user management,
/// category and newsletter writes).
pub fn ensure_admin(caller: &AuthUser) -> Result<(), ApiError> {
    ensure_can_mutate(
        caller,
        None,
        Action::AdminCreate,
        "Only admin, access denied !",
    )
}

/// Author gate for the author dashboard endpoints.
pub fn ensure_author(caller: &AuthUser) -> Result<(), ApiError> {
    if caller.role == Role::Author {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only authors, access denied !"))
    }
}
