//! WebSocket handler for client connections
//!
//! Handles the upgrade, the connection lifecycle, and dispatch of
//! client actions into the import coordinator. Action failures are
//! logged and answered with an error push; they never take the socket
//! down.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::gateway::state::AppState;
use crate::import::ImportCoordinator;
use crate::transaction::TransactionToken;

use super::messages::{ClientAction, ConnectedPush, ErrorPush};
use super::registry::{ConnectionId, ConnectionRegistry, Outbound, OutboundSender};

/// WebSocket upgrade handler
///
/// Endpoint: GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let registry = state.registry.clone();
    let coordinator = state.coordinator.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, registry, coordinator))
}

/// Handle WebSocket connection lifecycle
async fn handle_socket(
    socket: WebSocket,
    registry: Arc<ConnectionRegistry>,
    coordinator: Arc<ImportCoordinator>,
) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    // Register connection and get unique ID
    let conn_id = registry.register(tx.clone());

    // Send welcome message
    let welcome = ConnectedPush {
        connection_id: conn_id,
    };
    if let Ok(json) = serde_json::to_string(&welcome) {
        let _ = sender.send(Message::Text(json.into())).await;
    }

    // Forward queued frames to the socket until Close or peer loss
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                Outbound::Payload(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // Dispatch incoming client actions
    let tx_for_recv = tx.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    dispatch_action(&text, conn_id, &coordinator, &tx_for_recv).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    // Cleanup using connection ID
    registry.deregister(conn_id);
}

async fn dispatch_action(
    text: &str,
    conn_id: ConnectionId,
    coordinator: &Arc<ImportCoordinator>,
    tx: &OutboundSender,
) {
    match serde_json::from_str::<ClientAction>(text) {
        Ok(ClientAction::GetUrl) => {
            // the coordinator pushes the slot payload itself
            if let Err(e) = coordinator.request_slot(conn_id).await {
                error!(conn_id, error = %e, "getUrl action failed");
                send_error(tx, "upload slot unavailable");
            }
        }
        Ok(ClientAction::CancelImport { transaction_id }) => {
            let token = TransactionToken::from(transaction_id);
            if let Err(e) = coordinator.cancel(&token, conn_id).await {
                error!(conn_id, token = %token, error = %e, "cancelImport action failed");
                send_error(tx, "cancel failed");
            }
        }
        Err(e) => {
            warn!(conn_id, error = %e, "Unrecognized client action");
            send_error(tx, "unrecognized action");
        }
    }
}

fn send_error(tx: &OutboundSender, message: &str) {
    let push = ErrorPush {
        message: message.to_string(),
    };
    if let Ok(json) = serde_json::to_string(&push) {
        let _ = tx.send(Outbound::Payload(json));
    }
}
