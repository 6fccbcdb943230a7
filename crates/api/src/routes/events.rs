use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::{self, Stream, StreamExt};
use sitepress_core::PublishEvent;
use tokio::sync::broadcast;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/events", get(events))
}

/// Server-sent stream of publish outcomes, starting with a `welcome` event.
async fn events(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before anything is sent so no publish slips between the two.
    let receiver = state.event_bus().subscribe();
    tracing::debug!(
        subscribers = state.event_bus().subscriber_count(),
        "event stream opened"
    );

    let welcome = stream::iter(to_sse(&PublishEvent::Welcome).map(Ok::<_, Infallible>));
    let live = stream::unfold(receiver, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(sse) = to_sse(&event) {
                        return Some((Ok::<_, Infallible>(sse), rx));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event stream lagged, skipping ahead");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(welcome.chain(live)).keep_alive(KeepAlive::default().interval(Duration::from_secs(30)))
}

fn to_sse(event: &PublishEvent) -> Option<Event> {
    match Event::default().event(event.name()).json_data(event) {
        Ok(sse) => Some(sse),
        Err(err) => {
            tracing::warn!(error = %err, "failed to encode event");
            None
        }
    }
}
