//! Static bearer tokens from the configuration file

use crate::config::TokenEntry;
use async_trait::async_trait;
use axum_table_editor::{Authenticator, CurrentUser};
use std::collections::HashMap;

pub struct StaticTokenAuthenticator {
    users: HashMap<String, CurrentUser>,
}

impl StaticTokenAuthenticator {
    pub fn new(entries: &[TokenEntry]) -> Self {
        let users = entries
            .iter()
            .map(|entry| {
                (
                    entry.token.clone(),
                    CurrentUser {
                        id: entry.user_id,
                        role: entry.role,
                    },
                )
            })
            .collect();
        Self { users }
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn current_user(&self, token: &str) -> Option<CurrentUser> {
        self.users.get(token).cloned()
    }
}
