use axum::{
    extract::{Path, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::stream::{self, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{
    handlers::ApiError, metrics::SSE_CONNECTIONS_ACTIVE, models::timer::TimerEvent,
    services::AppState,
};

/// Keeps `sse_connections_active` honest however the stream ends.
struct ConnectionGuard {
    session_id: String,
}

impl ConnectionGuard {
    fn new(session_id: String) -> Self {
        SSE_CONNECTIONS_ACTIVE.inc();
        Self { session_id }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
        tracing::info!(session_id = %self.session_id, "SSE stream closed");
    }
}

fn to_sse_event(event: &TimerEvent) -> Event {
    Event::default()
        .event(event.event_name())
        .data(event.to_sse_data())
}

/// SSE endpoint for session events
/// GET /api/v1/sessions/{id}/stream
pub async fn session_stream(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (receiver, snapshot) = state.sessions.subscribe(&session_id).await?;
    tracing::info!(session_id = %session_id, "Client connected to SSE stream");

    // Nothing more will happen once the test is submitted.
    let finished = matches!(snapshot, TimerEvent::Submitted(_));
    let guard = ConnectionGuard::new(session_id);
    let initial = stream::once(async move { Ok::<_, Infallible>(to_sse_event(&snapshot)) });
    let updates = stream::unfold(
        (!finished).then_some((receiver, guard)),
        |state| async move {
            let (mut receiver, guard) = state?;
            let event = next_event(&mut receiver, &guard).await?;
            let next_state = match event {
                TimerEvent::Submitted(_) => None,
                _ => Some((receiver, guard)),
            };
            Some((Ok(to_sse_event(&event)), next_state))
        },
    );

    Ok(Sse::new(initial.chain(updates)).keep_alive(KeepAlive::default()))
}

async fn next_event(
    receiver: &mut broadcast::Receiver<TimerEvent>,
    guard: &ConnectionGuard,
) -> Option<TimerEvent> {
    loop {
        match receiver.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(session_id = %guard.session_id, skipped, "SSE subscriber lagged");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}
