//! WebSocket sessions bound to one drawing.

use std::sync::Arc;

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use drawingboard_core::{ChannelConnection, Connection, DrawingId, ServerMessage, Shape};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(drawing_id): Path<DrawingId>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, drawing_id, state))
}

/// Handle a WebSocket connection
///
/// The client is registered with the hub for the lifetime of the socket.
/// A writer task drains the connection's queue into the socket while this
/// task reads shapes from the client and publishes them. Once the hub closes
/// the connection the writer ends and the socket is dropped.
async fn handle_socket(socket: WebSocket, drawing_id: DrawingId, state: Arc<AppState>) {
    let (connection, mut outbound) = ChannelConnection::new(state.queue_capacity);
    let connection = Arc::new(connection);
    let conn_id = connection.id();
    info!("Connection {} opened on drawing {}", conn_id, drawing_id);

    state.hub.register(drawing_id, connection.clone());

    let (mut sender, mut receiver) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(item) = outbound.recv().await {
            for message in item.into_messages() {
                let json = match message.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to encode message for {}: {}", conn_id, e);
                        continue;
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
        }
    });

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        accept_frame(&state, drawing_id, connection.as_ref(), text.as_bytes());
                    }
                    Some(Ok(Message::Binary(data))) => {
                        accept_frame(&state, drawing_id, connection.as_ref(), &data);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {} // Ignore ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", conn_id, e);
                        break;
                    }
                }
            }

            // Writer finishes when the socket refuses writes or the hub
            // closes the connection (failed join or eviction).
            _ = &mut writer => {
                debug!("Writer for {} stopped", conn_id);
                break;
            }
        }
    }

    // Cleanup on disconnect
    state.hub.deregister(drawing_id, conn_id);
    writer.abort();
    info!("Connection {} closed", conn_id);
}

/// Parse one client frame as a shape and publish it.
fn accept_frame(
    state: &AppState,
    drawing_id: DrawingId,
    connection: &ChannelConnection,
    frame: &[u8],
) {
    match serde_json::from_slice::<Shape>(frame) {
        Ok(shape) => {
            debug!("Shape {:?} from {} on drawing {}", shape.kind(), connection.id(), drawing_id);
            state.hub.publish(drawing_id, shape);
        }
        Err(e) => {
            warn!("Invalid shape from {}: {}", connection.id(), e);
            let notice = ServerMessage::error(format!("Invalid shape: {}", e));
            if let Err(e) = connection.send(&notice) {
                warn!("Could not report error to {}: {}", connection.id(), e);
            }
        }
    }
}
