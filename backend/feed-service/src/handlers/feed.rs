use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use tracing::debug;

use super::{require_id, AppState};
use crate::error::Result;
use crate::models::FeedResponse;
use crate::services::Pagination;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQueryParams {
    #[serde(default)]
    pub user_id: String,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[get("/feed")]
pub async fn get_feed(
    query: web::Query<FeedQueryParams>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user_id = require_id(&query.user_id, "userId")?;
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(0);
    let paging = Pagination::normalize(page, limit, state.feed.config());

    debug!(
        user_id = %user_id,
        page = paging.page,
        limit = paging.limit,
        "Getting feed"
    );

    let feed = state.feed.feed_page(user_id, page, limit).await?;

    Ok(HttpResponse::Ok().json(FeedResponse {
        items: feed.items,
        page: paging.page,
        limit: paging.limit,
        has_more: feed.has_more,
    }))
}
