use std::{convert::Infallible, sync::Arc};
use warp::Filter;

use super::{
    board::ChartBoard,
    handlers::{chart_option_handler, chart_socket_handler, list_charts},
};

fn with_board(
    board: Arc<ChartBoard>,
) -> impl Filter<Extract = (Arc<ChartBoard>,), Error = Infallible> + Clone {
    warp::any().map(move || board.clone())
}

/// GET /api/charts
/// GET /api/charts/{aspect}
/// GET /ws/charts/{aspect} (websocket)
pub fn chart_routes(
    board: Arc<ChartBoard>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let list = warp::path!("api" / "charts")
        .and(warp::get())
        .and(with_board(board.clone()))
        .and_then(list_charts);

    let option = warp::path!("api" / "charts" / String)
        .and(warp::get())
        .and(with_board(board.clone()))
        .and_then(chart_option_handler);

    let socket = warp::path!("ws" / "charts" / String)
        .and(warp::ws())
        .and(with_board(board))
        .and_then(chart_socket_handler);

    list.or(option).or(socket)
}
