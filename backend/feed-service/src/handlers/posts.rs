use actix_web::{post, web, HttpResponse};
use serde::{Deserialize, Serialize};

use super::{require_id, AppState};
use crate::error::Result;
use crate::models::ContentKind;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(default)]
    pub user_id: String,
    pub caption: Option<String>,
    pub image: Option<String>,
    pub video: Option<String>,
    pub location: Option<String>,
}

impl CreatePostRequest {
    /// A `video` makes the item a shot; otherwise it is an image post
    fn media(&self) -> (ContentKind, &str) {
        match self.video.as_deref() {
            Some(video) => (ContentKind::Shot, video),
            None => (ContentKind::Post, self.image.as_deref().unwrap_or_default()),
        }
    }

    /// Location is folded into the caption as "caption • location"
    fn caption(&self) -> Option<String> {
        let caption = self.caption.as_deref().map(str::trim).unwrap_or_default();
        let location = self.location.as_deref().map(str::trim).unwrap_or_default();

        match (caption.is_empty(), location.is_empty()) {
            (true, true) => None,
            (false, true) => Some(caption.to_string()),
            (true, false) => Some(format!("• {}", location)),
            (false, false) => Some(format!("{} • {}", caption, location)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub text: String,
}

#[post("/posts")]
pub async fn create_post(
    body: web::Json<CreatePostRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user_id = require_id(&body.user_id, "userId")?;
    let (kind, media) = body.media();

    let item = state
        .engagement
        .create_post(user_id, body.caption(), media, kind)
        .await?;

    Ok(HttpResponse::Created().json(item))
}

#[post("/posts/{id}/like")]
pub async fn toggle_like(
    path: web::Path<String>,
    body: web::Json<LikeRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user_id = require_id(&body.user_id, "userId")?;
    let toggle = state.engagement.toggle_like(user_id, &path).await?;

    Ok(HttpResponse::Ok().json(LikeResponse {
        liked: toggle.liked,
        message: if toggle.liked { "Like added" } else { "Like removed" },
    }))
}

#[post("/posts/{id}/comments")]
pub async fn add_comment(
    path: web::Path<String>,
    body: web::Json<CommentRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let user_id = require_id(&body.user_id, "userId")?;
    let comment = state
        .engagement
        .add_comment(user_id, &path, &body.text)
        .await?;

    Ok(HttpResponse::Created().json(comment))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(image: Option<&str>, video: Option<&str>, location: Option<&str>) -> CreatePostRequest {
        CreatePostRequest {
            user_id: "u1".into(),
            caption: Some("sunset".into()),
            image: image.map(String::from),
            video: video.map(String::from),
            location: location.map(String::from),
        }
    }

    #[test]
    fn test_video_makes_a_shot() {
        let req = request(Some("a.jpg"), Some("b.mp4"), None);
        assert_eq!(req.media(), (ContentKind::Shot, "b.mp4"));

        let req = request(Some("a.jpg"), None, None);
        assert_eq!(req.media(), (ContentKind::Post, "a.jpg"));

        let req = request(None, None, None);
        assert_eq!(req.media(), (ContentKind::Post, ""));
    }

    #[test]
    fn test_location_is_folded_into_caption() {
        assert_eq!(
            request(None, None, Some("Lisbon")).caption().as_deref(),
            Some("sunset • Lisbon")
        );
        assert_eq!(request(None, None, None).caption().as_deref(), Some("sunset"));
    }
}
