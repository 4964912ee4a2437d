//! End-to-end tests: the real router on an ephemeral port, driven
//! through the typed client.

use std::net::SocketAddr;
use std::sync::Arc;

use egate_common::UpdateUserBody;
use egate_server::app;
use egate_server::store::Store;
use reqwest::Client;
use tempfile::TempDir;
use tokio::sync::Mutex;

async fn spawn_server() -> anyhow::Result<(String, TempDir)> {
    let dir = TempDir::new()?;
    let store = Store::load(dir.path().join("data.json"))?;
    let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
        .serve(app(Arc::new(Mutex::new(store))).into_make_service());
    let base = format!("http://{}", server.local_addr());
    tokio::spawn(server);
    Ok((base, dir))
}

#[tokio::test]
async fn friend_request_lifecycle() -> anyhow::Result<()> {
    let (base, _dir) = spawn_server().await?;
    let client = Client::new();

    let alice = egate_client::register(&client, &base, "alice", "pw1").await?;
    assert_eq!(alice.user.username, "alice");
    egate_client::register(&client, &base, "bob", "pw2").await?;

    assert_eq!(
        egate_client::list_users(&client, &base, "alice").await?,
        vec!["bob"]
    );

    egate_client::send_friend_request(&client, &base, "alice", "bob").await?;
    assert_eq!(
        egate_client::friend_requests(&client, &base, "bob").await?,
        vec!["alice"]
    );

    egate_client::respond_friend_request(&client, &base, "bob", "alice", "accept").await?;
    assert_eq!(
        egate_client::approved_friends(&client, &base, "alice").await?,
        vec!["bob"]
    );
    assert_eq!(
        egate_client::approved_friends(&client, &base, "bob").await?,
        vec!["alice"]
    );
    assert!(egate_client::friend_requests(&client, &base, "bob")
        .await?
        .is_empty());

    Ok(())
}

#[tokio::test]
async fn reject_leaves_no_approved_edge() -> anyhow::Result<()> {
    let (base, _dir) = spawn_server().await?;
    let client = Client::new();

    egate_client::register(&client, &base, "alice", "pw1").await?;
    egate_client::register(&client, &base, "bob", "pw2").await?;
    egate_client::send_friend_request(&client, &base, "alice", "bob").await?;
    let reply =
        egate_client::respond_friend_request(&client, &base, "bob", "alice", "deny").await?;
    assert_eq!(reply.message, "friend request rejected");
    assert!(egate_client::friend_requests(&client, &base, "bob")
        .await?
        .is_empty());
    assert!(egate_client::approved_friends(&client, &base, "bob")
        .await?
        .is_empty());

    Ok(())
}

#[tokio::test]
async fn error_statuses_match_the_wire_contract() -> anyhow::Result<()> {
    let (base, _dir) = spawn_server().await?;
    let client = Client::new();

    egate_client::register(&client, &base, "alice", "pw1").await?;

    let err = egate_client::register(&client, &base, "alice", "pw9")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("400"), "got: {err}");

    let err = egate_client::login(&client, &base, "alice", "wrong")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("401"), "got: {err}");

    let err = egate_client::friend_requests(&client, &base, "nobody")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("404"), "got: {err}");

    let err = egate_client::send_friend_request(&client, &base, "alice", "nobody")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("404"), "got: {err}");

    // chatHistory without both parameters is a 400.
    let status = client
        .get(format!("{base}/chatHistory"))
        .query(&[("user1", "alice")])
        .send()
        .await?
        .status();
    assert_eq!(status, 400);

    Ok(())
}

#[tokio::test]
async fn chat_history_is_order_independent_over_the_wire() -> anyhow::Result<()> {
    let (base, _dir) = spawn_server().await?;
    let client = Client::new();

    egate_client::register(&client, &base, "alice", "pw1").await?;
    egate_client::register(&client, &base, "bob", "pw2").await?;

    let forward = egate_client::chat_history(&client, &base, "alice", "bob").await?;
    let reverse = egate_client::chat_history(&client, &base, "bob", "alice").await?;
    assert_eq!(forward, reverse);
    assert!(forward.is_empty());

    Ok(())
}

#[tokio::test]
async fn update_user_renames_and_sets_birthday() -> anyhow::Result<()> {
    let (base, _dir) = spawn_server().await?;
    let client = Client::new();

    egate_client::register(&client, &base, "alice", "pw1").await?;
    let updated = egate_client::update_user(
        &client,
        &base,
        &UpdateUserBody {
            username: "alice".into(),
            new_username: Some("alicia".into()),
            birthday: Some("1990-04-01".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(updated.user.username, "alicia");
    assert_eq!(updated.user.birthday.as_deref(), Some("1990-04-01"));

    let login = egate_client::login(&client, &base, "alicia", "pw1").await?;
    assert_eq!(login.user.username, "alicia");

    let err = egate_client::login(&client, &base, "alice", "pw1")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("401"), "got: {err}");

    Ok(())
}
