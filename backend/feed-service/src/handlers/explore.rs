use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

use super::AppState;
use crate::error::Result;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreQueryParams {
    pub user_id: Option<String>,
    pub limit: Option<i64>,
}

/// Ranked discovery content; without `userId` nothing is excluded
#[get("/explore")]
pub async fn get_explore(
    query: web::Query<ExploreQueryParams>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let viewer = query
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let items = state
        .feed
        .explore(viewer, query.limit.unwrap_or(0))
        .await?;

    Ok(HttpResponse::Ok().json(items))
}
