use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use uuid::Uuid;
use validator::Validate;

use super::read_multipart;
use crate::{
    AppState, cascade,
    auth::AuthUser,
    error::ApiError,
    models::{
        Category, CategoryWithCount, CreateCategoryFields, DeleteCategoriesRequest,
        MessageResponse, UpdateCategoryRequest, slugify,
    },
    policy,
    repository::{CategoryPatch, NewCategory},
    storage::make_asset_key,
};

/// list_categories
///
/// [Public Route] All categories with their current post counts, newest
/// first. Counts are recomputed from the store on every read.
#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "Categories", body = [CategoryWithCount]))
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryWithCount>>, ApiError> {
    let categories = state.repo.list_categories().await?;
    Ok(Json(categories))
}

/// get_category
///
/// [Public Route] A single category by slug.
#[utoipa::path(
    get,
    path = "/api/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses((status = 200, description = "Found", body = Category))
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Category>, ApiError> {
    let category = state
        .repo
        .find_category_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))?;
    Ok(Json(category))
}

/// create_category
///
/// [Admin Route] Creates a category from a multipart body (image plus text
/// fields). Title/slug uniqueness is enforced before any side effect.
#[utoipa::path(
    post,
    path = "/api/admin/categories",
    responses(
        (status = 201, description = "Created", body = MessageResponse),
        (status = 409, description = "Title taken")
    )
)]
pub async fn create_category(
    caller: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    policy::ensure_admin(&caller)?;

    let (fields, image) = read_multipart(&mut multipart).await?;
    let image = image.ok_or_else(|| ApiError::invalid("No image provided !"))?;

    let payload = CreateCategoryFields {
        title: fields.get("title").cloned().unwrap_or_default(),
        description: fields.get("description").cloned().unwrap_or_default(),
        icon: fields.get("icon").cloned(),
    };
    payload.validate()?;

    let slug = slugify(&payload.title);
    if state.repo.find_category_by_slug(&slug).await?.is_some() {
        return Err(ApiError::conflict("This category already exists !"));
    }

    let asset = state
        .assets
        .store(
            &make_asset_key("categories", &image.filename),
            image.bytes,
            &image.content_type,
        )
        .await?;

    let category = state
        .repo
        .create_category(NewCategory {
            title: payload.title,
            slug,
            description: payload.description,
            icon: payload.icon,
            image_url: asset.url,
            image_key: Some(asset.key),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(format!(
            "{} category has been created successfully !",
            category.title.to_uppercase()
        ))),
    ))
}

/// update_category
///
/// [Admin Route] Partial update; a title change re-derives the slug and
/// re-checks uniqueness against other categories.
#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}",
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Updated", body = MessageResponse),
        (status = 409, description = "Title taken")
    )
)]
pub async fn update_category(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    policy::ensure_admin(&caller)?;
    payload.validate()?;

    let category = state
        .repo
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))?;

    let slug = match &payload.title {
        Some(title) => {
            let slug = slugify(title);
            if let Some(other) = state.repo.find_category_by_slug(&slug).await? {
                if other.id != category.id {
                    return Err(ApiError::conflict(
                        "This category title already exists !",
                    ));
                }
            }
            Some(slug)
        }
        None => None,
    };

    let updated = state
        .repo
        .update_category(
            category.id,
            CategoryPatch {
                title: payload.title,
                slug,
                description: payload.description,
                icon: payload.icon,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))?;

    Ok(Json(MessageResponse::new(format!(
        "{} has been updated successfully !",
        updated.title.to_uppercase()
    ))))
}

/// update_category_image
///
/// [Admin Route] Replaces the category image, releasing the old hosted asset.
#[utoipa::path(
    put,
    path = "/api/admin/categories/upload-image/{id}",
    responses((status = 200, description = "Image updated", body = MessageResponse))
)]
pub async fn update_category_image(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    policy::ensure_admin(&caller)?;

    let (_fields, image) = read_multipart(&mut multipart).await?;
    let image = image.ok_or_else(|| ApiError::invalid("No image provided !"))?;

    let category = state
        .repo
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))?;

    if let Some(old_key) = &category.image_key {
        state.assets.release(old_key).await?;
    }
    let asset = state
        .assets
        .store(
            &make_asset_key("categories", &image.filename),
            image.bytes,
            &image.content_type,
        )
        .await?;
    state
        .repo
        .set_category_image(category.id, &asset.url, &asset.key)
        .await?;

    Ok(Json(MessageResponse::new(
        "Category image updated successfully !",
    )))
}

/// delete_category
///
/// [Admin Route] Deletes a category and releases its hosted image. Posts
/// referencing the category keep their (now dangling) reference.
#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses((status = 200, description = "Deleted", body = MessageResponse))
)]
pub async fn delete_category(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    policy::ensure_admin(&caller)?;

    let category = state
        .repo
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))?;

    cascade::delete_category(state.repo.as_ref(), state.assets.as_ref(), &category).await?;
    Ok(Json(MessageResponse::new(
        "Category deleted successfully !",
    )))
}

/// delete_many_categories
///
/// [Admin Route] Batch deletion; a single unresolved id rejects the whole
/// batch before anything is touched.
#[utoipa::path(
    delete,
    path = "/api/admin/categories",
    request_body = DeleteCategoriesRequest,
    responses((status = 200, description = "Deleted", body = MessageResponse))
)]
pub async fn delete_many_categories(
    caller: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<DeleteCategoriesRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    policy::ensure_admin(&caller)?;
    payload.validate()?;

    let deleted = cascade::delete_many_categories(
        state.repo.as_ref(),
        state.assets.as_ref(),
        &payload.categories,
    )
    .await?;
    Ok(Json(MessageResponse::new(format!(
        "{deleted} categories have been deleted successfully!"
    ))))
}
