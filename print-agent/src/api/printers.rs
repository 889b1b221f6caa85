//! 打印机列表

use axum::{Json, Router, extract::State, routing::get};
use shared::message::{PrinterInfo, PrintersResponse};

use crate::core::AgentState;

pub fn router() -> Router<AgentState> {
    Router::new().route("/printers", get(list_printers))
}

async fn list_printers(State(state): State<AgentState>) -> Json<PrintersResponse> {
    let printers = state.backend.printers().into_iter().map(PrinterInfo::new).collect();
    Json(PrintersResponse { printers })
}
