use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc, watch,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use crate::{
    dto::sse::{Handshake, ServerEvent},
    services::sse_events::{self, EVENT_HANDSHAKE},
    state::{
        SharedState,
        session::{SessionId, SessionSnapshot},
    },
};

/// Subscribe to the shared public SSE stream.
pub fn subscribe_public(state: &SharedState) -> broadcast::Receiver<ServerEvent> {
    state.public_sse().subscribe()
}

/// First event sent on a fresh public connection.
pub fn public_handshake(state: &SharedState) -> Option<ServerEvent> {
    ServerEvent::json(
        Some(EVENT_HANDSHAKE.to_string()),
        &Handshake {
            stream: "public".into(),
            message: "public stream connected".into(),
            degraded: state.is_degraded(),
        },
    )
    .ok()
}

/// Convert a broadcast receiver into an SSE response, starting with `handshake`
/// and forwarding events until the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    handshake: Option<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(handshake) = handshake {
            if tx.send(Ok(to_event(handshake))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        // lagged receivers skip ahead
                        Err(RecvError::Lagged(_)) => continue,
                    }
                }
            }
        }

        info!("Public SSE stream disconnected");
    });

    sse_response(rx)
}

/// Stream every published snapshot of one session, current one first.
///
/// The stream ends when the session worker stops.
pub fn session_stream(
    session_id: SessionId,
    mut snapshots: watch::Receiver<SessionSnapshot>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        loop {
            let event = {
                let snapshot = snapshots.borrow_and_update();
                sse_events::snapshot_event(session_id, &snapshot)
            };
            if let Some(event) = event {
                if tx.send(Ok(to_event(event))).await.is_err() {
                    break;
                }
            }

            tokio::select! {
                _ = tx.closed() => break,
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(%session_id, "game SSE stream disconnected");
    });

    sse_response(rx)
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default();
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event.data(payload.data)
}

fn sse_response(
    rx: mpsc::Receiver<Result<Event, Infallible>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
