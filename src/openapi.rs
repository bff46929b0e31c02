use crate::models::{
    ActivityItem, AuthorView, Community, CommunityView, FeedPage, FeedQuery, NewComment,
    NewThread, Thread, ThreadView, UpsertCommunity, UpsertUser, User, UserThreads,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::feed,
        crate::routes::create_thread,
        crate::routes::get_thread,
        crate::routes::delete_thread,
        crate::routes::add_comment,
        crate::routes::onboard_user,
        crate::routes::get_user,
        crate::routes::user_threads,
        crate::routes::activity,
        crate::routes::upsert_community,
        crate::routes::get_community,
    ),
    components(schemas(
        User, UpsertUser, Thread, NewThread, NewComment, Community, UpsertCommunity,
        AuthorView, CommunityView, ThreadView, FeedQuery, FeedPage, UserThreads, ActivityItem,
        crate::routes::CreateThreadRequest, crate::routes::CreateCommentRequest,
        crate::routes::OnboardRequest,
    )),
    tags(
        (name = "threads", description = "Thread and comment operations"),
        (name = "users", description = "User onboarding and profile reads"),
        (name = "communities", description = "Community registration"),
    )
)]
pub struct ApiDoc;
