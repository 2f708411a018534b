use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{
        DeleteSubscriptionsRequest, MessageResponse, NewsletterSubscription, SubscribeRequest,
    },
    policy,
};

/// subscribe
///
/// [Public Route] Adds an email to the newsletter with notifications enabled.
#[utoipa::path(
    post,
    path = "/api/newsletter",
    request_body = SubscribeRequest,
    responses(
        (status = 201, description = "Subscribed", body = MessageResponse),
        (status = 409, description = "Already subscribed")
    )
)]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(payload): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    payload.validate()?;

    if state.repo.find_subscription(&payload.email).await?.is_some() {
        return Err(ApiError::conflict(format!(
            "{} already exists on our newsletter !",
            payload.email
        )));
    }

    let subscription = state.repo.subscribe(&payload.email).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(format!(
            "{} has been added to our newsletter",
            subscription.email
        ))),
    ))
}

/// list_subscriptions
///
/// [Admin Route] Every newsletter entry, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/newsletter",
    responses((status = 200, description = "Subscriptions", body = [NewsletterSubscription]))
)]
pub async fn list_subscriptions(
    caller: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<NewsletterSubscription>>, ApiError> {
    policy::ensure_admin(&caller)?;
    Ok(Json(state.repo.list_subscriptions().await?))
}

/// toggle_subscription
///
/// [Admin Route] Flips the notification flag for one subscription.
#[utoipa::path(
    put,
    path = "/api/admin/newsletter/{id}",
    params(("id" = Uuid, Path, description = "Subscription ID")),
    responses((status = 200, description = "Toggled", body = MessageResponse))
)]
pub async fn toggle_subscription(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    policy::ensure_admin(&caller)?;

    let subscription = state
        .repo
        .get_subscription(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Subscription"))?;

    let updated = state
        .repo
        .set_subscription_notification(subscription.id, !subscription.notification)
        .await?
        .ok_or_else(|| ApiError::not_found("Subscription"))?;

    let status = if updated.notification {
        "active"
    } else {
        "inactive"
    };
    Ok(Json(MessageResponse::new(format!(
        "Notification is {status} for {}",
        updated.email
    ))))
}

/// delete_subscription
///
/// [Admin Route] Removes one address from the newsletter.
#[utoipa::path(
    delete,
    path = "/api/admin/newsletter/{id}",
    params(("id" = Uuid, Path, description = "Subscription ID")),
    responses((status = 200, description = "Deleted", body = MessageResponse))
)]
pub async fn delete_subscription(
    caller: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    policy::ensure_admin(&caller)?;

    let subscription = state
        .repo
        .get_subscription(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Subscription"))?;

    state.repo.delete_subscriptions(&[subscription.id]).await?;
    Ok(Json(MessageResponse::new(format!(
        "{} has been removed from the newsletter !",
        subscription.email
    ))))
}

/// delete_many_subscriptions
///
/// [Admin Route] Batch removal; one unresolved id rejects the whole batch.
#[utoipa::path(
    delete,
    path = "/api/admin/newsletter",
    request_body = DeleteSubscriptionsRequest,
    responses((status = 200, description = "Deleted", body = MessageResponse))
)]
pub async fn delete_many_subscriptions(
    caller: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<DeleteSubscriptionsRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    policy::ensure_admin(&caller)?;
    payload.validate()?;

    let found = state
        .repo
        .get_subscriptions_by_ids(&payload.emails_ids)
        .await?;
    if found.len() != payload.emails_ids.len() {
        return Err(ApiError::not_found("One or more emails"));
    }

    let deleted = state.repo.delete_subscriptions(&payload.emails_ids).await?;
    Ok(Json(MessageResponse::new(format!(
        "{deleted} email(s) deleted successfully !"
    ))))
}
