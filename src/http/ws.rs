use super::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let (session_id, mut rx) = state.broadcast_bridge.attach();

    loop {
        tokio::select! {
            frame = rx.recv() => {
                match frame {
                    Some(body) => {
                        if socket.send(Message::Text(body.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = socket.recv() => {
                // The protocol never expects inbound frames beyond
                // ping/pong/close, which axum handles before this branch
                // sees them; any text/binary payload is ignored.
                match incoming {
                    Some(Ok(_)) => continue,
                    _ => break,
                }
            }
        }
    }

    state.broadcast_bridge.detach(session_id);
}
