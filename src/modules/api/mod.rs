mod board;
mod handlers;
mod routes;

pub use board::ChartBoard;

use crate::shared::errors::handle_rejection;
use std::{net::SocketAddr, sync::Arc};
use tokio::task::JoinHandle;
use warp::Filter;

pub fn start_api(board: Arc<ChartBoard>, address: SocketAddr) -> JoinHandle<()> {
    tokio::spawn(async move {
        let routes = routes::chart_routes(board).recover(handle_rejection);

        log::info!("Starting chart API on {}...", address);
        warp::serve(routes).run(address).await;
    })
}
