//! Custom user field administration: install, remove, and choice edits that
//! queue a rebuild of stored values.
//!
//! Everything here logs under the library add-on.

use addonlog_core::choices::{build_rename_map, choices_changed, Choices, RenameMap};
use addonlog_core::context::LogContext;
use addonlog_core::error::CoreError;
use addonlog_core::rebuild::{merge_queued_states, unique_key, RebuildCheckpoint, JOB_TYPE};
use addonlog_core::types::DbId;
use addonlog_core::user_field::{validate_field_id, UserFieldOptions};
use addonlog_db::models::background_job::EnqueueJob;
use addonlog_db::models::user_field::{CreateUserField, UserField};
use addonlog_db::repositories::{BackgroundJobRepo, UserFieldRepo};
use addonlog_db::DbPool;
use addonlog_logger::AddonLogger;
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Outcome of [`update_choices_if_changed`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChoiceUpdate {
    /// New choices were saved and a rebuild queued.
    pub updated: bool,
    pub before: Choices,
    pub after: Choices,
    /// The field does not exist.
    pub missing_field: bool,
    pub rename_map: RenameMap,
    pub job_id: Option<DbId>,
    /// The rebuild was queued behind a run already in progress.
    pub follow_up: bool,
}

impl ChoiceUpdate {
    fn unchanged(current: Choices) -> Self {
        Self {
            before: current.clone(),
            after: current,
            ..Default::default()
        }
    }

    fn missing() -> Self {
        Self {
            missing_field: true,
            ..Default::default()
        }
    }
}

/// Save `new_choices` on `field_id` if they differ from the stored set, then
/// queue a value rebuild carrying the inferred rename map.
///
/// A rebuild already in progress for the field finishes its pass against the
/// keys it started with; this one runs after it.
///
/// A failed save is logged and reported as `updated: false`.
pub async fn update_choices_if_changed(
    pool: &DbPool,
    logger: &AddonLogger,
    field_id: &str,
    new_choices: Choices,
) -> AppResult<ChoiceUpdate> {
    let Some(field) = UserFieldRepo::find(pool, field_id).await? else {
        return Ok(ChoiceUpdate::missing());
    };

    let current = field.choices();
    if !choices_changed(&current, &new_choices) {
        return Ok(ChoiceUpdate::unchanged(current));
    }

    match UserFieldRepo::update_choices(pool, field_id, &new_choices).await {
        Ok(Some(_)) => {}
        Ok(None) => return Ok(ChoiceUpdate::missing()),
        Err(e) => {
            logger
                .error(
                    "Error saving User Field options",
                    LogContext::new()
                        .with("field_id", field_id)
                        .with_error(&e),
                )
                .await;
            return Ok(ChoiceUpdate::unchanged(current));
        }
    }

    let rename_map = build_rename_map(&current, &new_choices);
    let checkpoint = RebuildCheckpoint::new(field_id, rename_map.clone())
        .with_allowed(new_choices.keys().cloned());
    let state = serde_json::to_value(&checkpoint).map_err(AppError::encode("job state"))?;
    let job_key = unique_key(field_id);

    let job = BackgroundJobRepo::enqueue_unique(
        pool,
        &EnqueueJob {
            unique_key: Some(job_key.clone()),
            job_type: JOB_TYPE.to_string(),
            state,
            status_message: Some(checkpoint.status_message()),
        },
        merge_queued_states,
    )
    .await?;
    let follow_up = job.next_state.is_some();

    logger
        .info(
            "Queued user field value rebuild after choice update",
            LogContext::new()
                .with("field_id", field_id)
                .with("job_unique", job_key)
                .with("follow_up", follow_up)
                .with_json("rename_map", &rename_map),
        )
        .await;

    Ok(ChoiceUpdate {
        updated: true,
        before: current,
        after: new_choices,
        missing_field: false,
        rename_map,
        job_id: Some(job.id),
        follow_up,
    })
}

/// Install a field with the default options overridden by `input`.
///
/// Choice-based types must come with choices. Failures are logged at error
/// level and returned.
pub async fn create_user_field(
    pool: &DbPool,
    logger: &AddonLogger,
    input: CreateUserField,
) -> AppResult<UserField> {
    let field_id = input.field_id.trim().to_string();
    if let Err(e) = validate_field_id(&field_id) {
        return Err(logger
            .logged_error(
                &validation_message(&e),
                LogContext::new().with("field_id", field_id.as_str()),
            )
            .await
            .into());
    }

    logger
        .debug(
            "Creating user field: {field_id}",
            LogContext::new()
                .with("field_id", field_id.as_str())
                .with("title", input.title.as_str()),
        )
        .await;

    let options = UserFieldOptions::merged(input.options);
    if let Err(e) = options.validate() {
        return Err(logger
            .logged_error(
                &validation_message(&e),
                LogContext::new()
                    .with("field_id", field_id.as_str())
                    .with("field_type", options.field_type.as_str()),
            )
            .await
            .into());
    }

    if UserFieldRepo::find(pool, &field_id).await?.is_some() {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "User field '{field_id}' already exists"
        ))));
    }

    let field =
        UserFieldRepo::create(pool, &field_id, &input.title, &input.description, &options).await?;

    logger
        .debug(
            "User field created",
            LogContext::new()
                .with("field_id", field_id.as_str())
                .with_json("options", &options),
        )
        .await;

    Ok(field)
}

/// Remove a field and its stored values. A field that does not exist counts
/// as removed; returns whether a row was actually deleted.
pub async fn remove_user_field(pool: &DbPool, field_id: &str) -> AppResult<bool> {
    let removed = UserFieldRepo::delete(pool, field_id).await?;
    if removed {
        tracing::info!(field_id, "User field removed");
    }
    Ok(removed)
}

/// Message of a validation error without the `Validation failed:` prefix.
fn validation_message(err: &CoreError) -> String {
    match err {
        CoreError::Validation(msg) => msg.clone(),
        other => other.to_string(),
    }
}
