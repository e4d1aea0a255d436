//! WebSocket session stream with backpressure support.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info, warn};
use tubefetch_models::{DownloadSnapshot, WsMessage};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::metrics;
use crate::state::AppState;

/// Global counter for active WebSocket connections.
static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

/// Configuration for WebSocket backpressure.
const WS_SEND_BUFFER_SIZE: usize = 32;
const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

const ENDPOINT: &str = "session";

/// Send a WebSocket message with backpressure handling.
async fn send_ws_message(tx: &mpsc::Sender<Message>, msg: &WsMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(j) => j,
        Err(_) => return false,
    };
    let sent = match tx.try_send(Message::Text(json)) {
        Ok(_) => true,
        Err(mpsc::error::TrySendError::Full(msg)) => {
            debug!("WebSocket send buffer full, applying backpressure");
            tx.send(msg).await.is_ok()
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    };
    if sent {
        metrics::record_ws_message_sent(ENDPOINT, msg.kind());
    }
    sent
}

/// Session event stream endpoint.
///
/// Sends the current download status on connect, then every session event
/// until the client disconnects or the session is removed.
pub async fn ws_session(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Response> {
    let session = state.sessions.get(session_id).await?;
    let events = session.subscribe();
    let snapshot = session.runner().await.snapshot().await;
    let initial = initial_messages(session_id, &snapshot);
    // The stream must not keep the session alive after it is deleted.
    drop(session);

    metrics::record_ws_connection(ENDPOINT);

    Ok(ws.on_upgrade(move |socket| async move {
        let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_ws_active_connections(count);
        let _guard = scopeguard::guard((), |_| {
            let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
            metrics::set_ws_active_connections(count);
        });

        let (ws_sender, receiver) = socket.split();
        stream_session(ws_sender, receiver, session_id, events, initial).await;
    }))
}

/// Frames sent before any live event: a greeting and the download state.
fn initial_messages(session_id: Uuid, snapshot: &DownloadSnapshot) -> Vec<WsMessage> {
    let mut messages = vec![
        WsMessage::log(format!("Subscribed to session {}", session_id)),
        WsMessage::status(snapshot.status, snapshot.attempt),
    ];
    if snapshot.status.is_active() {
        messages.push(WsMessage::progress(snapshot.percent(), snapshot.attempt));
    }
    messages
}

/// Forward session events to the socket until either side goes away.
async fn stream_session<W, R>(
    ws_sender: W,
    mut receiver: R,
    session_id: Uuid,
    mut events: broadcast::Receiver<WsMessage>,
    initial: Vec<WsMessage>,
) where
    W: Sink<Message> + Unpin + Send + 'static,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    // Create a bounded channel for backpressure
    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);

    let send_task = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    info!(session_id = %session_id, "WebSocket stream opened");

    for msg in &initial {
        if !send_ws_message(&tx, msg).await {
            drop(tx);
            let _ = send_task.await;
            return;
        }
    }

    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(msg) => {
                        last_activity = Instant::now();
                        if !send_ws_message(&tx, &msg).await {
                            warn!(session_id = %session_id, "WebSocket send failed, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(session_id = %session_id, skipped, "WebSocket client lagging, events dropped");
                        let notice = WsMessage::error(format!("{} events dropped", skipped));
                        if !send_ws_message(&tx, &notice).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!(session_id = %session_id, "Session closed");
                        break;
                    }
                }
            }
            // Heartbeat to keep connection alive
            _ = heartbeat.tick() => {
                if last_activity.elapsed() > WS_HEARTBEAT_INTERVAL / 2
                    && tx.send(Message::Ping(vec![])).await.is_err()
                {
                    warn!(session_id = %session_id, "Heartbeat failed, client disconnected");
                    break;
                }
            }
            client_msg = receiver.next() => {
                match client_msg {
                    Some(Ok(Message::Pong(_))) => {
                        last_activity = Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        info!(session_id = %session_id, "Client closed connection");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    drop(tx);
    let _ = send_task.await;
    info!(session_id = %session_id, "WebSocket stream ended");
}
