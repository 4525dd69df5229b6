use actix_web::{get, web, HttpResponse};
use serde::Serialize;

use super::AppState;
use crate::error::Result;
use crate::jobs::run_warm_cycle;
use crate::services::PrecomputeOutcome;

#[derive(Debug, Serialize)]
pub struct PrecomputeResponse {
    pub message: &'static str,
    pub processed: usize,
    pub details: Vec<PrecomputeOutcome>,
}

/// Warm page-1 feeds of recently active users
#[get("/cron/feed-precompute")]
pub async fn feed_precompute(state: web::Data<AppState>) -> Result<HttpResponse> {
    let report = run_warm_cycle(state.users.as_ref(), &state.feed, &state.warmer).await?;

    Ok(HttpResponse::Ok().json(PrecomputeResponse {
        message: "Feed pre-computation complete",
        processed: report.processed(),
        details: report.outcomes,
    }))
}
