//! Cascading deletion of higher-level entities.
//!
//! Each coordinator operation enumerates dependents, releases hosted assets,
//! then removes database rows. The sequence is deliberately not transactional:
//! the store only guarantees per-statement atomicity, so an asset-host failure
//! mid-sequence surfaces as `ExternalService` and leaves the remaining steps
//! unexecuted. A caller retry re-enumerates whatever is left and the asset
//! host treats double-release as a no-op, so retries converge.

use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::ApiError,
    models::{Category, Post, User},
    policy::{self, Action},
    repository::Repository,
    storage::AssetHost,
};

/// Deletes a post: release its hosted image, remove its comments, remove the
/// row. Authorization (owner or admin) must already have been approved by the
/// caller.
pub async fn delete_post(
    repo: &dyn Repository,
    assets: &dyn AssetHost,
    post: &Post,
) -> Result<(), ApiError> {
    if let Some(key) = &post.image_key {
        assets.release(key).await?;
    }
    repo.delete_comments_by_post(post.id).await?;
    repo.delete_posts(&[post.id]).await?;
    Ok(())
}

/// Deletes a user account and everything it owns: every post (with its image
/// and its comments), the user's own comments, the profile image, and finally
/// the user row. Authorization (self or admin) must already have been
/// approved by the caller.
pub async fn delete_user(
    repo: &dyn Repository,
    assets: &dyn AssetHost,
    user: &User,
) -> Result<(), ApiError> {
    let posts = repo.posts_owned_by(user.id).await?;

    let image_keys: Vec<String> = posts.iter().filter_map(|p| p.image_key.clone()).collect();
    assets.release_many(&image_keys).await?;

    // Comments under the user's posts go with the posts; the user's own
    // comments elsewhere go with the account.
    for post in &posts {
        repo.delete_comments_by_post(post.id).await?;
    }
    repo.delete_comments_by_user(user.id).await?;

    if let Some(key) = &user.avatar_key {
        assets.release(key).await?;
    }

    let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
    repo.delete_posts(&post_ids).await?;
    repo.delete_user_row(user.id).await?;
    Ok(())
}

/// Deletes a category and its hosted image. Posts referencing the category
/// are intentionally left in place with a dangling reference; read paths
/// join leniently.
pub async fn delete_category(
    repo: &dyn Repository,
    assets: &dyn AssetHost,
    category: &Category,
) -> Result<(), ApiError> {
    if let Some(key) = &category.image_key {
        assets.release(key).await?;
    }
    repo.delete_categories(&[category.id]).await?;
    Ok(())
}

/// Batch post deletion. Every id must resolve (otherwise the whole batch is
/// rejected with `NotFound` and nothing is deleted) and the caller must be
/// authorized for every post — admin, or owner of all.
pub async fn delete_many_posts(
    repo: &dyn Repository,
    assets: &dyn AssetHost,
    caller: &AuthUser,
    ids: &[Uuid],
) -> Result<u64, ApiError> {
    let posts = repo.get_posts_by_ids(ids).await?;
    if posts.len() != ids.len() {
        return Err(ApiError::not_found("One or more posts"));
    }
    if !policy::can_mutate_all(caller, posts.iter().map(|p| p.author_id), Action::Delete) {
        return Err(ApiError::forbidden(
            "You are not allowed to delete these posts !",
        ));
    }

    let image_keys: Vec<String> = posts.iter().filter_map(|p| p.image_key.clone()).collect();
    assets.release_many(&image_keys).await?;

    for post in &posts {
        repo.delete_comments_by_post(post.id).await?;
    }
    repo.delete_posts(ids).await
}

/// Batch comment deletion with the same all-or-nothing resolution and
/// authorization rules.
pub async fn delete_many_comments(
    repo: &dyn Repository,
    caller: &AuthUser,
    ids: &[Uuid],
) -> Result<u64, ApiError> {
    let comments = repo.get_comments_by_ids(ids).await?;
    if comments.len() != ids.len() {
        return Err(ApiError::not_found("One or more comments"));
    }
    if !policy::can_mutate_all(caller, comments.iter().map(|c| c.user_id), Action::Delete) {
        return Err(ApiError::forbidden(
            "You are not allowed to delete these comments !",
        ));
    }
    repo.delete_comments(ids).await
}

/// Batch category deletion (admin gate applied by the caller). Whole-batch
/// resolution check, then asset release, then row deletion.
pub async fn delete_many_categories(
    repo: &dyn Repository,
    assets: &dyn AssetHost,
    ids: &[Uuid],
) -> Result<u64, ApiError> {
    let categories = repo.get_categories_by_ids(ids).await?;
    if categories.len() != ids.len() {
        return Err(ApiError::not_found("One or more categories"));
    }

    let image_keys: Vec<String> = categories
        .iter()
        .filter_map(|c| c.image_key.clone())
        .collect();
    assets.release_many(&image_keys).await?;

    repo.delete_categories(ids).await
}
