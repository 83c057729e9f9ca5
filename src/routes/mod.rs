pub mod admin;
pub mod notifications;
pub mod trainer;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

use crate::console::confirm::failure_message;
use crate::console::{ConsoleSession, ListCommand, ListPage, ListView, Notifier, Page, SessionRegistry};
use crate::guards::Operator;
use crate::models::StatusFilter;
use crate::query::{MutationError, Query, QueryClient};
use crate::utils::ApiError;

pub(crate) fn open_session(
    registry: &SessionRegistry,
    operator: &Operator,
) -> Result<Arc<AsyncMutex<ConsoleSession>>, ApiError> {
    registry
        .open(operator)
        .map_err(|e| ApiError::internal_error(format!("Could not start console session: {}", e)))
}

/// Opens the operator's session on `page`; queries owned by other pages
/// are unmounted first.
pub(crate) async fn visit(
    registry: &SessionRegistry,
    operator: &Operator,
    page: Page,
) -> Result<Arc<AsyncMutex<ConsoleSession>>, ApiError> {
    let session = open_session(registry, operator)?;
    session.lock().await.enter(page);
    Ok(session)
}

/// Data for a mounted query, fetching it first if needed. Stale data is
/// served when the refresh fails.
pub(crate) async fn read<T: DeserializeOwned>(query: &Query<T>) -> Result<T, ApiError> {
    let refreshed = query.ensure().await;
    let state = query.state();
    match (state.data, refreshed, state.error) {
        (Some(data), _, _) => Ok(data),
        (None, Err(e), _) => Err(e.into()),
        (None, Ok(()), Some(error)) => Err(ApiError::bad_gateway(error)),
        (None, Ok(()), None) => Err(ApiError::bad_gateway("No data received")),
    }
}

/// Loads a listing, applying a control command first when given.
pub(crate) async fn list<T, S>(
    page: &mut ListPage<T, S>,
    client: &QueryClient,
    command: Option<&ListCommand>,
) -> Result<ListView<T>, ApiError>
where
    T: DeserializeOwned,
    S: StatusFilter + PartialEq,
{
    match command {
        Some(command) => page
            .handle(client, command)
            .await
            .map_err(ApiError::bad_request),
        None => Ok(page.load(client).await),
    }
}

/// Reports a write's outcome as a toast and converts it for the response.
pub(crate) fn settle_write(
    notifier: &Notifier,
    result: Result<Value, MutationError>,
    success: impl Into<String>,
) -> Result<Value, ApiError> {
    match result {
        Ok(value) => {
            notifier.success(success);
            Ok(value)
        }
        Err(err) => {
            notifier.error(failure_message(&err));
            Err(err.into())
        }
    }
}
