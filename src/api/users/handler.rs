// User resource handlers

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use crate::config::state::AppState;
use crate::models::user::{NewUser, User, UserChanges, UserFilters, UserId, ValidationErrors};
use crate::utils::json::merge_objects;
use crate::utils::response_handler::HandlerResponse;

// =============================================================================
// HELPERS
// =============================================================================

/// Path segments that are not numeric can never name a stored user
fn parse_user_id(raw: &str) -> Option<UserId> {
    raw.trim().parse::<UserId>().ok()
}

fn validation_failed(errors: ValidationErrors) -> HandlerResponse {
    HandlerResponse::new(StatusCode::UNPROCESSABLE_ENTITY)
        .data(json!({ "validationErrors": errors.details }))
        .message("Invalid user data")
}

fn internal_error(message: &str) -> HandlerResponse {
    HandlerResponse::new(StatusCode::INTERNAL_SERVER_ERROR).message(message)
}

fn user_not_found() -> HandlerResponse {
    HandlerResponse::new(StatusCode::NOT_FOUND).message("User not found")
}

/// Outcome of the fetch, validate, write sequence behind PUT
#[derive(Debug, thiserror::Error)]
pub enum UpdateUserError {
    #[error("record not found")]
    RecordNotFound,

    #[error("invalid data")]
    InvalidData(ValidationErrors),

    #[error("malformed JSON body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Lists users, optionally restricted to one language
#[instrument(name = "list_users", skip(state))]
pub async fn list_users_handler(
    State(state): State<AppState>,
    Query(filters): Query<UserFilters>,
) -> HandlerResponse {
    match state.users.find_many(&filters).await {
        Ok(users) => {
            info!("Retrieved {} users", users.len());
            HandlerResponse::new(StatusCode::OK).data(json!(users))
        }
        Err(e) => {
            error!("Failed to list users: {:#}", e);
            internal_error("Error retrieving users from database")
        }
    }
}

/// Fetches a single user by id
#[instrument(name = "get_user", skip(state))]
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResponse {
    let Some(user_id) = parse_user_id(&id) else {
        return user_not_found();
    };

    match state.users.find_one(user_id).await {
        Ok(Some(user)) => HandlerResponse::new(StatusCode::OK).data(json!(user)),
        Ok(None) => {
            warn!("User {} not found", user_id);
            user_not_found()
        }
        Err(e) => {
            error!("Failed to fetch user {}: {:#}", user_id, e);
            internal_error("Error retrieving user from database")
        }
    }
}

/// Validates the body with creation rules and stores a new user
#[instrument(name = "create_user", skip(state, body))]
pub async fn create_user_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> HandlerResponse {
    if let Some(errors) = state.users.validate(&body, true) {
        warn!("Rejected user creation with {} validation errors", errors.details.len());
        return validation_failed(errors);
    }

    let new_user: NewUser = match serde_json::from_value(body) {
        Ok(new_user) => new_user,
        Err(e) => {
            error!("Validated body did not map to a user: {}", e);
            return internal_error("Error saving the user");
        }
    };

    match state.users.create(&new_user).await {
        Ok(user) => {
            info!("Created user {}", user.id);
            HandlerResponse::new(StatusCode::CREATED).data(json!(user))
        }
        Err(e) => {
            error!("Failed to create user: {:#}", e);
            internal_error("Error saving the user")
        }
    }
}

/// Applies a partial update and returns the existing record overlaid with the body
#[instrument(name = "update_user", skip(state, body))]
pub async fn update_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> HandlerResponse {
    match update_user_internal(&state, &id, &body).await {
        Ok(merged) => HandlerResponse::new(StatusCode::OK).data(merged),
        Err(UpdateUserError::RecordNotFound) => {
            warn!("User {} not found for update", id);
            HandlerResponse::new(StatusCode::NOT_FOUND)
                .message(format!("User with id {} not found.", id))
        }
        Err(UpdateUserError::InvalidData(errors)) => {
            warn!("Rejected update of user {} with {} validation errors", id, errors.details.len());
            validation_failed(errors)
        }
        Err(UpdateUserError::MalformedBody(e)) => {
            warn!("Rejected update of user {}: {}", id, e);
            HandlerResponse::new(StatusCode::BAD_REQUEST)
                .message(format!("Malformed JSON body: {}", e))
        }
        Err(UpdateUserError::Backend(e)) => {
            error!("Failed to update user {}: {:#}", id, e);
            internal_error("Error updating a user.")
        }
    }
}

/// An empty body is an empty change set
fn parse_update_body(raw: &[u8]) -> Result<Value, UpdateUserError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(raw).map_err(UpdateUserError::MalformedBody)
}

/// Fetch, then parse and validate, then write. Not atomic: the record may
/// change between steps. The body is only looked at once the user exists.
async fn update_user_internal(
    state: &AppState,
    raw_id: &str,
    raw_body: &[u8],
) -> Result<Value, UpdateUserError> {
    let user_id: UserId = parse_user_id(raw_id).ok_or(UpdateUserError::RecordNotFound)?;

    let existing: User = state
        .users
        .find_one(user_id)
        .await?
        .ok_or(UpdateUserError::RecordNotFound)?;

    let body: Value = parse_update_body(raw_body)?;

    if let Some(errors) = state.users.validate(&body, false) {
        return Err(UpdateUserError::InvalidData(errors));
    }

    let changes: UserChanges = serde_json::from_value(body.clone())
        .context("Validated body did not map to user changes")?;

    state.users.update(user_id, &changes).await?;

    let existing_json: Value = serde_json::to_value(&existing)
        .context("Failed to serialize existing user")?;

    Ok(merge_objects(existing_json, &body))
}

/// Deletes a user
#[instrument(name = "delete_user", skip(state))]
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResponse {
    let Some(user_id) = parse_user_id(&id) else {
        return user_not_found();
    };

    match state.users.destroy(user_id).await {
        Ok(true) => {
            info!("Deleted user {}", user_id);
            HandlerResponse::new(StatusCode::OK).message("🎉 User deleted!")
        }
        Ok(false) => {
            warn!("User {} not found for deletion", user_id);
            user_not_found()
        }
        Err(e) => {
            error!("Failed to delete user {}: {:#}", user_id, e);
            internal_error("Error deleting a user")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_ids_only() {
        assert_eq!(parse_user_id("42"), Some(42));
        assert_eq!(parse_user_id(" 7 "), Some(7));
        assert_eq!(parse_user_id("abc"), None);
        assert_eq!(parse_user_id(""), None);
    }

    #[test]
    fn blank_update_body_is_an_empty_change_set() {
        assert_eq!(parse_update_body(b"").unwrap(), json!({}));
        assert_eq!(parse_update_body(b" \n").unwrap(), json!({}));
        assert_eq!(parse_update_body(br#"{"city":"Lyon"}"#).unwrap(), json!({ "city": "Lyon" }));
        assert!(matches!(
            parse_update_body(b"{ not json"),
            Err(UpdateUserError::MalformedBody(_))
        ));
    }

    #[test]
    fn validation_failures_carry_details_under_validation_errors() {
        let errors: ValidationErrors =
            crate::models::user::validate(&json!({}), true).unwrap();
        let response: HandlerResponse = validation_failed(errors);

        assert_eq!(response.status_code, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.data["validationErrors"].as_array().map(Vec::len), Some(3));
    }
}
