use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    services::reviews::review_stream,
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Resume point for clients that cannot send `Last-Event-ID`.
    after: Option<i64>,
}

/// Server-sent review events. Reconnecting clients get every event after the
/// last id they saw, then live events.
pub async fn review_events(
    State(state): State<AppState>,
    current: CurrentUser,
    query: Result<Query<EventsQuery>, QueryRejection>,
    headers: HeaderMap,
) -> AppResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let Query(query) = query?;
    let after_id = headers
        .get("last-event-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .or(query.after);

    // Subscribe first so events recorded while the backlog loads are not lost.
    let receiver = state.reviews.subscribe();
    let backlog = match after_id {
        Some(id) => state.store.reviews_after(id).await?,
        None => Vec::new(),
    };
    log::debug!(
        "User {} subscribed to review events ({} replayed)",
        current.user.id,
        backlog.len()
    );

    let events = review_stream(backlog, receiver).map(|review| {
        Event::default()
            .id(review.id.to_string())
            .event("review")
            .json_data(&review)
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
