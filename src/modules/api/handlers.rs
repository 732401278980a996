use futures_channel::mpsc::unbounded;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use warp::ws::{Message, WebSocket, Ws};

use super::board::ChartBoard;
use crate::shared::errors::{AppError, ErrorType};

fn unknown_chart(aspect: &str) -> warp::Rejection {
    warp::reject::custom(AppError::new(
        &format!("No chart for aspect '{}'", aspect),
        ErrorType::NotFound,
    ))
}

pub async fn list_charts(board: Arc<ChartBoard>) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&board.aspects()))
}

pub async fn chart_option_handler(
    aspect: String,
    board: Arc<ChartBoard>,
) -> Result<impl warp::Reply, warp::Rejection> {
    match board.option(&aspect) {
        Some(option) => Ok(warp::reply::json(&option)),
        None => Err(unknown_chart(&aspect)),
    }
}

pub async fn chart_socket_handler(
    aspect: String,
    ws: Ws,
    board: Arc<ChartBoard>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if board.option(&aspect).is_none() {
        return Err(unknown_chart(&aspect));
    }

    Ok(ws.on_upgrade(move |socket| watch_chart(socket, aspect, board)))
}

/// Pushes every redraw of `aspect` to the client until either side goes away.
async fn watch_chart(socket: WebSocket, aspect: String, board: Arc<ChartBoard>) {
    let (mut outgoing, mut incoming) = socket.split();
    let (tx, mut rx) = unbounded::<String>();
    board.add_watcher(&aspect, tx);
    log::info!("Chart watcher connected to '{}'", aspect);

    let forward = async {
        while let Some(json) = rx.next().await {
            if let Err(err) = outgoing.send(Message::text(json)).await {
                log::error!("Failed to send chart update: {}", err);
                break;
            }
        }
    };

    // Clients only listen; drain until they close
    let drain = async {
        while let Some(msg) = incoming.next().await {
            match msg {
                Ok(message) if message.is_close() => break,
                Ok(_) => continue,
                Err(err) => {
                    log::error!("Chart watcher disconnected due to error: {}", err);
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = forward => {}
        _ = drain => {}
    }

    log::info!("Chart watcher of '{}' disconnected", aspect);
}
