use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::models::*;
use crate::repo::Repo;
use crate::revalidate::Revalidator;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(
                web::resource("/threads")
                    .route(web::get().to(feed))
                    .route(web::post().to(create_thread)),
            )
            .service(
                web::resource("/threads/{id}")
                    .route(web::get().to(get_thread))
                    .route(web::delete().to(delete_thread)),
            )
            .service(
                web::resource("/threads/{id}/comments").route(web::post().to(add_comment)),
            )
            .service(web::resource("/users").route(web::post().to(onboard_user)))
            .service(web::resource("/users/{id}").route(web::get().to(get_user)))
            .service(web::resource("/users/{id}/threads").route(web::get().to(user_threads)))
            .service(web::resource("/users/{id}/activity").route(web::get().to(activity)))
            .service(web::resource("/communities").route(web::post().to(upsert_community)))
            .service(web::resource("/communities/{id}").route(web::get().to(get_community))),
    );
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub revalidator: Arc<dyn Revalidator>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateThreadRequest {
    pub text: String,
    pub author: String,
    pub community_id: Option<String>,
    /// Page path whose cached output becomes stale.
    pub path: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCommentRequest {
    pub text: String,
    pub author: String,
    pub path: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OnboardRequest {
    pub id: String,
    pub username: String,
    pub name: String,
    pub bio: String,
    pub image: String,
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteThreadQuery {
    pub path: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/threads",
    params(
        ("page_number" = Option<u32>, Query, description = "1-based page, default 1"),
        ("page_size" = Option<u32>, Query, description = "Page size, default 20")
    ),
    responses(
        (status = 200, description = "Top-level feed page", body = FeedPage),
        (status = 400, description = "Non-positive paging parameter")
    )
)]
pub async fn feed(
    data: web::Data<AppState>,
    query: web::Query<FeedQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = data.repo.top_level_threads(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    post,
    path = "/api/v1/threads",
    request_body = CreateThreadRequest,
    responses(
        (status = 201, description = "Thread created"),
        (status = 404, description = "Author not found"),
        (status = 400, description = "Missing text or author")
    )
)]
pub async fn create_thread(
    data: web::Data<AppState>,
    payload: web::Json<CreateThreadRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    let id = data
        .repo
        .create_thread(NewThread {
            text: req.text,
            author: req.author,
            community_id: req.community_id,
        })
        .await?;
    data.revalidator.invalidate(&req.path);
    Ok(HttpResponse::Created().json(serde_json::json!({ "id": id })))
}

#[utoipa::path(
    get,
    path = "/api/v1/threads/{id}",
    params(("id" = Id, Path, description = "Thread id")),
    responses(
        (status = 200, description = "Thread with two child levels expanded", body = ThreadView),
        (status = 404, description = "Thread not found")
    )
)]
pub async fn get_thread(
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let view = data.repo.get_thread(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[utoipa::path(
    delete,
    path = "/api/v1/threads/{id}",
    params(
        ("id" = Id, Path, description = "Thread id"),
        ("path" = Option<String>, Query, description = "Page path to invalidate")
    ),
    responses(
        (status = 204, description = "Thread and all descendants deleted"),
        (status = 404, description = "Thread not found")
    )
)]
pub async fn delete_thread(
    data: web::Data<AppState>,
    path: web::Path<Id>,
    query: web::Query<DeleteThreadQuery>,
) -> Result<HttpResponse, ApiError> {
    data.repo.delete_thread(path.into_inner()).await?;
    if let Some(p) = &query.path {
        data.revalidator.invalidate(p);
    }
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/v1/threads/{id}/comments",
    params(("id" = Id, Path, description = "Parent thread id")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment attached"),
        (status = 404, description = "Parent thread or author not found"),
        (status = 400, description = "Missing text or author")
    )
)]
pub async fn add_comment(
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    let id = data
        .repo
        .add_comment(path.into_inner(), NewComment { text: req.text, author: req.author })
        .await?;
    data.revalidator.invalidate(&req.path);
    Ok(HttpResponse::Created().json(serde_json::json!({ "id": id })))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = OnboardRequest,
    responses(
        (status = 204, description = "User created or updated"),
        (status = 400, description = "Missing id or username")
    )
)]
pub async fn onboard_user(
    data: web::Data<AppState>,
    payload: web::Json<OnboardRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    data.repo
        .upsert_user(UpsertUser {
            id: req.id,
            username: req.username,
            name: req.name,
            bio: req.bio,
            image: req.image,
        })
        .await?;
    // only the profile-edit page caches anything worth invalidating here
    if req.path == "/profile/edit" {
        data.revalidator.invalidate(&req.path);
    }
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "External user id")),
    responses(
        (status = 200, description = "User record", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let user = data.repo.get_user(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/threads",
    params(("id" = String, Path, description = "External user id")),
    responses(
        (status = 200, description = "Profile fields plus owned threads", body = UserThreads),
        (status = 404, description = "User not found")
    )
)]
pub async fn user_threads(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let profile = data.repo.user_threads(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/activity",
    params(("id" = String, Path, description = "External user id")),
    responses(
        (status = 200, description = "Replies by others to the user's threads", body = [ActivityItem])
    )
)]
pub async fn activity(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let items = data.repo.activity(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(items))
}

#[utoipa::path(
    post,
    path = "/api/v1/communities",
    request_body = UpsertCommunity,
    responses(
        (status = 204, description = "Community registered or updated"),
        (status = 400, description = "Missing id or name")
    )
)]
pub async fn upsert_community(
    data: web::Data<AppState>,
    payload: web::Json<UpsertCommunity>,
) -> Result<HttpResponse, ApiError> {
    data.repo.upsert_community(payload.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/communities/{id}",
    params(("id" = String, Path, description = "External community id")),
    responses(
        (status = 200, description = "Community record", body = Community),
        (status = 404, description = "Community not found")
    )
)]
pub async fn get_community(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let community = data.repo.get_community(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(community))
}
