//! WebSocket upgrade handler for controllers

use std::net::SocketAddr;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::{GameCommand, GameHandle};
use crate::util::rate_limit::ControlRateLimiter;
use crate::ws::protocol::{ClientCommand, ServerMsg};

/// WebSocket upgrade handler. The peer address is the player identity.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    info!(player = %addr, "Controller connecting");
    ws.on_upgrade(move |socket| handle_socket(socket, addr, state.game))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, addr: SocketAddr, game: GameHandle) {
    let (ws_sink, ws_stream) = socket.split();
    let outbound_rx = game.subscribe_outbound();

    run_connection(addr, ws_sink, ws_stream, outbound_rx, game).await;

    // The player stays in the game; only this connection is gone
    info!(player = %addr, "Controller disconnected");
}

/// Run the connection with read/write split
async fn run_connection(
    addr: SocketAddr,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    mut outbound_rx: broadcast::Receiver<ServerMsg>,
    game: GameHandle,
) {
    let rate_limiter = ControlRateLimiter::new();

    // Writer task: broadcast messages -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match outbound_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = ws_sink.send(Message::Text(msg.to_string())).await {
                        debug!(player = %addr, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(player = %addr, lagged_count = n, "Controller lagged, skipped {} messages", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(player = %addr, "Outbound channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> game session
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check() {
                    debug!(player = %addr, "Rate limited control message");
                    continue;
                }

                match ClientCommand::parse(&text) {
                    Ok(command) => {
                        if game.send(GameCommand::Control { from: addr, command }).await.is_err() {
                            debug!(player = %addr, "Game session closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(player = %addr, error = %e, message = %text, "Dropped malformed control message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player = %addr, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player = %addr, "Controller initiated close");
                break;
            }
            Err(e) => {
                error!(player = %addr, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}
