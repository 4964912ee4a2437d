//! Flat-file JSON store for users and chat transcripts.
//!
//! The whole document lives in memory and is rewritten to disk after
//! every mutation, via a temp file and rename so a crash mid-write
//! never corrupts the previously-durable state.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use egate_common::{conversation_key, UpdateUserBody, User};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ApiError, Result};

/// The durable document. Field names match the data file written by
/// the original deployment, so an existing `data.json` loads as-is.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreData {
    pub users: Vec<User>,
    pub chat_history: HashMap<String, Vec<serde_json::Value>>,
}

pub struct Store {
    path: PathBuf,
    data: StoreData,
}

impl Store {
    /// Load the document at `path`, or initialize an empty one if the
    /// file does not exist yet. A file that is present but unreadable
    /// or malformed is fatal: refusing to start beats silently
    /// shadowing durable data with an empty store.
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(contents) => {
                let data: StoreData = serde_json::from_str(&contents)
                    .with_context(|| format!("malformed store file {}", path.display()))?;
                info!(users = data.users.len(), "loaded store from {}", path.display());
                data
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let data = StoreData::default();
                persist(&path, &data)?;
                info!("initialized empty store at {}", path.display());
                data
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("reading store file {}", path.display()))
            }
        };
        Ok(Self { path, data })
    }

    pub fn data(&self) -> &StoreData {
        &self.data
    }

    /// Persist `next` and only then swap it in. A failed write leaves
    /// both the in-memory and durable state at the pre-request
    /// snapshot, so the request fails with nothing half-applied.
    fn commit(&mut self, next: StoreData) -> Result<()> {
        persist(&self.path, &next)?;
        self.data = next;
        Ok(())
    }

    fn find_user(&self, username: &str) -> Option<&User> {
        self.data.users.iter().find(|u| u.username == username)
    }

    pub fn register(&mut self, username: &str, password: &str) -> Result<User> {
        if self.find_user(username).is_some() {
            return Err(ApiError::DuplicateUsername);
        }
        let user = User::new(username, password);
        let mut next = self.data.clone();
        next.users.push(user.clone());
        self.commit(next)?;
        info!(username, "registered user");
        Ok(user)
    }

    /// Exact-match credential check. Returns the full record, password
    /// included, for wire compatibility with the original deployment.
    pub fn login(&self, username: &str, password: &str) -> Result<User> {
        self.data
            .users
            .iter()
            .find(|u| u.username == username && u.password == password)
            .cloned()
            .ok_or(ApiError::InvalidCredentials)
    }

    /// All usernames except the requester's own, insertion order.
    pub fn list_users(&self, requester: &str) -> Vec<String> {
        self.data
            .users
            .iter()
            .filter(|u| u.username != requester)
            .map(|u| u.username.clone())
            .collect()
    }

    /// Queue `from` on `to`'s pending list. A request that is already
    /// pending is rejected rather than merged, so the list never holds
    /// duplicates. The opposite direction may be pending at the same
    /// time; that is allowed.
    pub fn send_friend_request(&mut self, from: &str, to: &str) -> Result<()> {
        let mut next = self.data.clone();
        let target = next
            .users
            .iter_mut()
            .find(|u| u.username == to)
            .ok_or(ApiError::TargetNotFound)?;
        if target.friend_requests.iter().any(|r| r == from) {
            return Err(ApiError::DuplicateRequest);
        }
        target.friend_requests.push(from.to_string());
        self.commit(next)?;
        debug!(from, to, "friend request queued");
        Ok(())
    }

    pub fn friend_requests(&self, username: &str) -> Result<Vec<String>> {
        Ok(self
            .find_user(username)
            .ok_or(ApiError::UserNotFound)?
            .friend_requests
            .clone())
    }

    /// Remove `from` from `username`'s pending list and, if `response`
    /// is `"accept"`, record the approved edge on both endpoints.
    /// Both sides are mutated before the single persist, so a failed
    /// write never leaves a half-applied friendship. Returns whether
    /// the request was accepted.
    pub fn respond_friend_request(
        &mut self,
        username: &str,
        from: &str,
        response: &str,
    ) -> Result<bool> {
        let mut next = self.data.clone();
        let user_idx = next
            .users
            .iter()
            .position(|u| u.username == username)
            .ok_or(ApiError::UserNotFound)?;
        let request_idx = next.users[user_idx]
            .friend_requests
            .iter()
            .position(|r| r == from)
            .ok_or(ApiError::RequestNotFound)?;
        next.users[user_idx].friend_requests.remove(request_idx);

        let accepted = response == "accept";
        if accepted {
            let recipient = &mut next.users[user_idx];
            if !recipient.approved_friends.iter().any(|f| f == from) {
                recipient.approved_friends.push(from.to_string());
            }
            // The sender may no longer exist; the edge is then recorded
            // on the recipient only.
            if let Some(sender) = next.users.iter_mut().find(|u| u.username == from) {
                if !sender.approved_friends.iter().any(|f| f == username) {
                    sender.approved_friends.push(username.to_string());
                }
            }
        }
        self.commit(next)?;
        info!(username, from, accepted, "friend request answered");
        Ok(accepted)
    }

    pub fn approved_friends(&self, username: &str) -> Result<Vec<String>> {
        Ok(self
            .find_user(username)
            .ok_or(ApiError::UserNotFound)?
            .approved_friends
            .clone())
    }

    /// Overwrite whichever fields are provided and non-empty; absent
    /// or empty fields are left untouched. A rename onto a taken name
    /// is a conflict, and a successful rename cascades to every
    /// referencing list and conversation key.
    pub fn update_user(&mut self, update: &UpdateUserBody) -> Result<User> {
        let mut next = self.data.clone();
        let idx = next
            .users
            .iter()
            .position(|u| u.username == update.username)
            .ok_or(ApiError::UserNotFound)?;

        if let Some(new_username) = update.new_username.as_deref().filter(|s| !s.is_empty()) {
            if new_username != update.username {
                if next.users.iter().any(|u| u.username == new_username) {
                    return Err(ApiError::DuplicateUsername);
                }
                rename_references(&mut next, &update.username, new_username);
                next.users[idx].username = new_username.to_string();
            }
        }
        if let Some(password) = update.new_password.as_deref().filter(|s| !s.is_empty()) {
            next.users[idx].password = password.to_string();
        }
        if let Some(birthday) = update.birthday.as_deref().filter(|s| !s.is_empty()) {
            next.users[idx].birthday = Some(birthday.to_string());
        }

        let user = next.users[idx].clone();
        self.commit(next)?;
        info!(username = update.username.as_str(), "updated user");
        Ok(user)
    }

    /// Transcript for the order-independent pair key, empty if the two
    /// users have never talked. Read-only: messages are written by an
    /// external collaborator straight into the data file.
    pub fn chat_history(&self, user1: &str, user2: &str) -> Vec<serde_json::Value> {
        self.data
            .chat_history
            .get(&conversation_key(user1, user2))
            .cloned()
            .unwrap_or_default()
    }
}

/// Rewrite every reference to a renamed user: other users' approved
/// and pending lists, and the keys of conversations they appear in.
fn rename_references(data: &mut StoreData, old: &str, new: &str) {
    for user in &mut data.users {
        for name in user
            .approved_friends
            .iter_mut()
            .chain(user.friend_requests.iter_mut())
        {
            if name == old {
                *name = new.to_string();
            }
        }
    }

    let affected: Vec<String> = data
        .chat_history
        .keys()
        .filter(|key| key.split('|').any(|part| part == old))
        .cloned()
        .collect();
    for key in affected {
        if let Some(messages) = data.chat_history.remove(&key) {
            let mut parts: Vec<&str> = key
                .split('|')
                .map(|part| if part == old { new } else { part })
                .collect();
            parts.sort();
            data.chat_history.insert(parts.join("|"), messages);
        }
    }
}

/// Full-document overwrite via temp file + rename.
fn persist(path: &Path, data: &StoreData) -> anyhow::Result<()> {
    let tmp = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(data)?;
    fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
