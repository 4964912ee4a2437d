pub mod error;
pub mod store;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::{Extension, Router};
use tokio::sync::Mutex;

use crate::store::Store;

/// Listen port from the first CLI argument (default 8000), data file
/// from `EGATE_DATA` (default `data.json`).
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub data_file: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut port = 8000;
        if let Some(arg) = std::env::args().nth(1) {
            port = arg
                .parse()
                .with_context(|| format!("invalid port argument {arg:?}"))?;
        }
        let data_file = std::env::var_os("EGATE_DATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data.json"));
        Ok(Self { port, data_file })
    }
}

/// One mutex around the whole store: every request runs its
/// read-modify-persist cycle to completion before the next one starts.
pub type SharedStore = Arc<Mutex<Store>>;

pub fn app(store: SharedStore) -> Router {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/users", get(handlers::list_users))
        .route("/sendFriendRequest", post(handlers::send_friend_request))
        .route("/friendRequests", get(handlers::friend_requests))
        .route("/respondFriendRequest", post(handlers::respond_friend_request))
        .route("/approvedFriends", get(handlers::approved_friends))
        .route("/updateUser", post(handlers::update_user))
        .route("/chatHistory", get(handlers::chat_history))
        .layer(Extension(store))
}

mod handlers {
    use axum::extract::Query;
    use axum::{Extension, Json};
    use egate_common::{
        ApprovedFriendsResponse, ChatHistoryResponse, Credentials, FriendRequestBody,
        FriendRequestsResponse, MessageResponse, RespondBody, UpdateUserBody, UserResponse,
        UsersResponse,
    };
    use serde::Deserialize;

    use crate::error::{ApiError, Result};
    use crate::SharedStore;

    #[derive(Deserialize)]
    pub struct UsernameQuery {
        username: Option<String>,
    }

    #[derive(Deserialize)]
    pub struct PairQuery {
        user1: Option<String>,
        user2: Option<String>,
    }

    pub async fn register(
        Extension(store): Extension<SharedStore>,
        Json(body): Json<Credentials>,
    ) -> Result<Json<UserResponse>> {
        let user = store.lock().await.register(&body.username, &body.password)?;
        Ok(Json(UserResponse {
            message: "registration successful".into(),
            user,
        }))
    }

    pub async fn login(
        Extension(store): Extension<SharedStore>,
        Json(body): Json<Credentials>,
    ) -> Result<Json<UserResponse>> {
        let user = store.lock().await.login(&body.username, &body.password)?;
        Ok(Json(UserResponse {
            message: "login successful".into(),
            user,
        }))
    }

    pub async fn list_users(
        Extension(store): Extension<SharedStore>,
        Query(query): Query<UsernameQuery>,
    ) -> Result<Json<UsersResponse>> {
        let users = store
            .lock()
            .await
            .list_users(query.username.as_deref().unwrap_or_default());
        Ok(Json(UsersResponse { users }))
    }

    pub async fn send_friend_request(
        Extension(store): Extension<SharedStore>,
        Json(body): Json<FriendRequestBody>,
    ) -> Result<Json<MessageResponse>> {
        store
            .lock()
            .await
            .send_friend_request(&body.from, &body.to)?;
        Ok(Json(MessageResponse {
            message: "friend request sent".into(),
        }))
    }

    pub async fn friend_requests(
        Extension(store): Extension<SharedStore>,
        Query(query): Query<UsernameQuery>,
    ) -> Result<Json<FriendRequestsResponse>> {
        let friend_requests = store
            .lock()
            .await
            .friend_requests(query.username.as_deref().unwrap_or_default())?;
        Ok(Json(FriendRequestsResponse { friend_requests }))
    }

    pub async fn respond_friend_request(
        Extension(store): Extension<SharedStore>,
        Json(body): Json<RespondBody>,
    ) -> Result<Json<MessageResponse>> {
        let accepted = store.lock().await.respond_friend_request(
            &body.username,
            &body.from,
            &body.response,
        )?;
        let message = if accepted {
            "friend request accepted"
        } else {
            "friend request rejected"
        };
        Ok(Json(MessageResponse {
            message: message.into(),
        }))
    }

    pub async fn approved_friends(
        Extension(store): Extension<SharedStore>,
        Query(query): Query<UsernameQuery>,
    ) -> Result<Json<ApprovedFriendsResponse>> {
        let approved_friends = store
            .lock()
            .await
            .approved_friends(query.username.as_deref().unwrap_or_default())?;
        Ok(Json(ApprovedFriendsResponse { approved_friends }))
    }

    pub async fn update_user(
        Extension(store): Extension<SharedStore>,
        Json(body): Json<UpdateUserBody>,
    ) -> Result<Json<UserResponse>> {
        let user = store.lock().await.update_user(&body)?;
        Ok(Json(UserResponse {
            message: "user updated".into(),
            user,
        }))
    }

    pub async fn chat_history(
        Extension(store): Extension<SharedStore>,
        Query(query): Query<PairQuery>,
    ) -> Result<Json<ChatHistoryResponse>> {
        let (user1, user2) = match (query.user1.as_deref(), query.user2.as_deref()) {
            (Some(user1), Some(user2)) if !user1.is_empty() && !user2.is_empty() => {
                (user1, user2)
            }
            _ => return Err(ApiError::MissingParameters("user1 and user2")),
        };
        let chat_history = store.lock().await.chat_history(user1, user2);
        Ok(Json(ChatHistoryResponse { chat_history }))
    }
}
