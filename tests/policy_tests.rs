use uuid::Uuid;

use inkpress::{
    auth::AuthUser,
    error::ApiError,
    models::Role,
    policy::{Action, can_author_posts, can_mutate, can_mutate_all, ensure_admin},
};

fn caller(role: Role) -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        role,
    }
}

#[test]
fn admin_may_mutate_anything() {
    let admin = caller(Role::Admin);
    let foreign_owner = Some(Uuid::new_v4());

    assert!(can_mutate(&admin, foreign_owner, Action::Update));
    assert!(can_mutate(&admin, foreign_owner, Action::Delete));
    assert!(can_mutate(&admin, None, Action::AdminCreate));
}

#[test]
fn owner_may_update_and_delete_own_resource() {
    let owner = caller(Role::Reader);

    assert!(can_mutate(&owner, Some(owner.id), Action::Update));
    assert!(can_mutate(&owner, Some(owner.id), Action::Delete));
}

#[test]
fn non_owner_is_denied() {
    let user = caller(Role::Author);
    let foreign_owner = Some(Uuid::new_v4());

    assert!(!can_mutate(&user, foreign_owner, Action::Update));
    assert!(!can_mutate(&user, foreign_owner, Action::Delete));
}

#[test]
fn delete_permission_matches_admin_or_owner_exactly() {
    // For every (caller, post) pair: allowed iff admin or owner.
    let owner_id = Uuid::new_v4();
    for role in [Role::Admin, Role::Author, Role::Reader] {
        for is_owner in [true, false] {
            let caller = AuthUser {
                id: if is_owner { owner_id } else { Uuid::new_v4() },
                role,
            };
            let expected = role == Role::Admin || is_owner;
            assert_eq!(
                can_mutate(&caller, Some(owner_id), Action::Delete),
                expected,
                "role={role:?} is_owner={is_owner}"
            );
        }
    }
}

#[test]
fn admin_create_is_denied_for_everyone_else() {
    // Ownership grants nothing for role-gated creation.
    let author = caller(Role::Author);
    let reader = caller(Role::Reader);

    assert!(!can_mutate(&author, Some(author.id), Action::AdminCreate));
    assert!(!can_mutate(&reader, None, Action::AdminCreate));
}

#[test]
fn batch_authorization_is_all_or_nothing() {
    let user = caller(Role::Reader);
    let other = Uuid::new_v4();

    assert!(can_mutate_all(&user, [user.id, user.id], Action::Delete));
    assert!(!can_mutate_all(&user, [user.id, other], Action::Delete));
    assert!(can_mutate_all(&caller(Role::Admin), [other, other], Action::Delete));
    // An empty batch has no entity the caller lacks rights to.
    assert!(can_mutate_all(&user, Vec::<Uuid>::new(), Action::Delete));
}

#[test]
fn only_authors_and_admins_may_create_posts() {
    assert!(can_author_posts(Role::Admin));
    assert!(can_author_posts(Role::Author));
    assert!(!can_author_posts(Role::Reader));
}

#[test]
fn denial_maps_to_forbidden_not_not_found() {
    let err = ensure_admin(&caller(Role::Author)).unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
}
