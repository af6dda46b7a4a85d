use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::identity::{AuthError, IdentityProvider, Profile};

/// Connection-scoped identifier assigned by the server.
pub type NetworkId = u64;

/// Account attached to a player after a successful login or registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLink {
    pub account_id: String,
    /// Credential for the identity service. Never sent to other players.
    #[serde(skip)]
    pub id_token: String,
}

/// A participant in lobbies and matches.
///
/// Two players are the same player when both the display name and the
/// network id match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub network_id: NetworkId,
    pub account: Option<AccountLink>,
    #[serde(skip)]
    pub is_local: bool,
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.network_id == other.network_id
    }
}

impl Eq for Player {}

impl Hash for Player {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.network_id.hash(state);
    }
}

impl Player {
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            network_id: 0,
            account: None,
            is_local: true,
        }
    }

    pub fn remote(name: impl Into<String>, network_id: NetworkId) -> Self {
        Self {
            name: name.into(),
            network_id,
            account: None,
            is_local: false,
        }
    }

    /// Placeholder name used until the player links an account.
    pub fn default_name(network_id: NetworkId) -> String {
        format!("Player {network_id}")
    }

    pub fn account_id(&self) -> Option<&str> {
        self.account.as_ref().map(|a| a.account_id.as_str())
    }

    /// Attach a profile returned by the identity service.
    pub fn link_profile(&mut self, profile: &Profile) {
        self.name = profile.display_name.clone();
        self.account = Some(AccountLink {
            account_id: profile.account_id.clone(),
            id_token: profile.id_token.clone(),
        });
    }

    /// Log in through `provider` and attach the resulting profile.
    /// On failure the player is left untouched.
    pub async fn login<P: IdentityProvider>(
        &mut self,
        provider: &P,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let profile = provider.login(email, password).await?;
        self.link_profile(&profile);
        Ok(())
    }

    /// Register a new account through `provider` and attach it.
    pub async fn register<P: IdentityProvider>(
        &mut self,
        provider: &P,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<(), AuthError> {
        let profile = provider.register(email, password, display_name).await?;
        self.link_profile(&profile);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::identity::MemoryIdentity;

    #[test]
    fn equality_uses_name_and_network_id() {
        let a = Player::remote("Alice", 1);
        let mut b = Player::remote("Alice", 1);
        b.is_local = true;
        b.account = Some(AccountLink {
            account_id: "acc".into(),
            id_token: String::new(),
        });
        assert_eq!(a, b);
        assert_ne!(a, Player::remote("Alice", 2));
        assert_ne!(a, Player::remote("Bob", 1));

        let set: HashSet<Player> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn id_token_is_not_serialized() {
        let mut p = Player::remote("Alice", 3);
        p.account = Some(AccountLink {
            account_id: "acc-1".into(),
            id_token: "secret".into(),
        });
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("acc-1"));
        assert!(!json.contains("secret"));
        assert!(!json.contains("is_local"));
    }

    #[tokio::test]
    async fn login_links_account() {
        let identity = MemoryIdentity::new();
        identity
            .register("a@example.com", "hunter22", "Alice")
            .await
            .unwrap();

        let mut p = Player::local("guest");
        p.login(&identity, "a@example.com", "hunter22").await.unwrap();
        assert_eq!(p.name, "Alice");
        assert!(p.account_id().is_some());
    }

    #[tokio::test]
    async fn failed_login_leaves_player_alone() {
        let identity = MemoryIdentity::new();
        let mut p = Player::local("guest");
        let err = p
            .login(&identity, "nobody@example.com", "whatever")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        assert_eq!(p.name, "guest");
        assert!(p.account.is_none());
    }
}
