use serde::{Deserialize, Serialize};

/// A registered account plus its contact-graph state.
///
/// Serialized camelCase so a `data.json` written by the original
/// deployment loads unchanged.
#[derive(Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub password: String,
    pub birthday: Option<String>,
    pub approved_friends: Vec<String>,
    pub friend_requests: Vec<String>,
}

impl User {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            birthday: None,
            approved_friends: Vec::new(),
            friend_requests: Vec::new(),
        }
    }
}

/// Order-independent key for a two-party conversation: the usernames
/// sorted lexicographically, joined with `|`.
pub fn conversation_key(user1: &str, user2: &str) -> String {
    let mut pair = [user1, user2];
    pair.sort();
    pair.join("|")
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FriendRequestBody {
    pub from: String,
    pub to: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RespondBody {
    pub username: String,
    pub from: String,
    /// `"accept"` approves; any other value rejects.
    pub response: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserBody {
    pub username: String,
    pub new_username: Option<String>,
    pub new_password: Option<String>,
    pub birthday: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub message: String,
    pub user: User,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestsResponse {
    pub friend_requests: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedFriendsResponse {
    pub approved_friends: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryResponse {
    pub chat_history: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
