//! Typed async client for the egate backend, one function per route.

use anyhow::{bail, Result};
use egate_common::{
    ApprovedFriendsResponse, ChatHistoryResponse, Credentials, ErrorResponse, FriendRequestBody,
    FriendRequestsResponse, MessageResponse, RespondBody, UpdateUserBody, UserResponse,
    UsersResponse,
};
use reqwest::Client;

/// Turn a non-success status into an `Err` carrying the server's
/// error message.
async fn checked(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error = response
        .json::<ErrorResponse>()
        .await
        .map(|body| body.error)
        .unwrap_or_else(|_| String::from("unknown error"));
    bail!("{status}: {error}")
}

pub async fn register(
    client: &Client,
    base: &str,
    username: &str,
    password: &str,
) -> Result<UserResponse> {
    let response = client
        .post(format!("{base}/register"))
        .json(&Credentials {
            username: username.to_string(),
            password: password.to_string(),
        })
        .send()
        .await?;
    Ok(checked(response).await?.json().await?)
}

pub async fn login(
    client: &Client,
    base: &str,
    username: &str,
    password: &str,
) -> Result<UserResponse> {
    let response = client
        .post(format!("{base}/login"))
        .json(&Credentials {
            username: username.to_string(),
            password: password.to_string(),
        })
        .send()
        .await?;
    Ok(checked(response).await?.json().await?)
}

pub async fn list_users(client: &Client, base: &str, username: &str) -> Result<Vec<String>> {
    let response = client
        .get(format!("{base}/users"))
        .query(&[("username", username)])
        .send()
        .await?;
    let body: UsersResponse = checked(response).await?.json().await?;
    Ok(body.users)
}

pub async fn send_friend_request(
    client: &Client,
    base: &str,
    from: &str,
    to: &str,
) -> Result<MessageResponse> {
    let response = client
        .post(format!("{base}/sendFriendRequest"))
        .json(&FriendRequestBody {
            from: from.to_string(),
            to: to.to_string(),
        })
        .send()
        .await?;
    Ok(checked(response).await?.json().await?)
}

pub async fn friend_requests(client: &Client, base: &str, username: &str) -> Result<Vec<String>> {
    let response = client
        .get(format!("{base}/friendRequests"))
        .query(&[("username", username)])
        .send()
        .await?;
    let body: FriendRequestsResponse = checked(response).await?.json().await?;
    Ok(body.friend_requests)
}

pub async fn respond_friend_request(
    client: &Client,
    base: &str,
    username: &str,
    from: &str,
    response: &str,
) -> Result<MessageResponse> {
    let response = client
        .post(format!("{base}/respondFriendRequest"))
        .json(&RespondBody {
            username: username.to_string(),
            from: from.to_string(),
            response: response.to_string(),
        })
        .send()
        .await?;
    Ok(checked(response).await?.json().await?)
}

pub async fn approved_friends(client: &Client, base: &str, username: &str) -> Result<Vec<String>> {
    let response = client
        .get(format!("{base}/approvedFriends"))
        .query(&[("username", username)])
        .send()
        .await?;
    let body: ApprovedFriendsResponse = checked(response).await?.json().await?;
    Ok(body.approved_friends)
}

pub async fn update_user(
    client: &Client,
    base: &str,
    update: &UpdateUserBody,
) -> Result<UserResponse> {
    let response = client
        .post(format!("{base}/updateUser"))
        .json(update)
        .send()
        .await?;
    Ok(checked(response).await?.json().await?)
}

pub async fn chat_history(
    client: &Client,
    base: &str,
    user1: &str,
    user2: &str,
) -> Result<Vec<serde_json::Value>> {
    let response = client
        .get(format!("{base}/chatHistory"))
        .query(&[("user1", user1), ("user2", user2)])
        .send()
        .await?;
    let body: ChatHistoryResponse = checked(response).await?.json().await?;
    Ok(body.chat_history)
}
