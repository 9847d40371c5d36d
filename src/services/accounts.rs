//! Registration, login and user administration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{hash_password, verify_password, TokenService};
use crate::domain::aggregates::{User, UserProfile};
use crate::domain::value_objects::{Actor, Role};
use crate::store::{Collection, Filter, SharedStore, Update};
use crate::{EcommerceError, Result};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_EMAIL: &str = "admin@example.com";

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 4, max = 128))]
    pub password: String,
    #[serde(default)]
    pub role_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserChanges {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 4, max = 128))]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthToken {
    pub token: String,
    pub role: Role,
}

#[derive(Clone)]
pub struct AccountService {
    users: Collection<User>,
    tokens: TokenService,
}

/// Argon2 is CPU bound; keep it off the async workers.
async fn hash_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| EcommerceError::Internal(format!("hashing task failed: {e}")))?
}

impl AccountService {
    pub fn new(store: SharedStore, tokens: TokenService) -> Self {
        Self { users: Collection::new(store), tokens }
    }

    /// Public sign-up. Only the `user` role can be chosen here; staff roles are
    /// granted by an admin through [`AccountService::change_role`].
    pub async fn register(&self, input: NewAccount) -> Result<AuthToken> {
        input.validate()?;
        let role = match input.role_name.as_deref() {
            None => Role::User,
            Some(name) => name.parse::<Role>().map_err(|e| EcommerceError::Validation(e.to_string()))?,
        };
        if role != Role::User {
            return Err(EcommerceError::AccessDenied(format!("cannot self-register as {role}")));
        }
        let email = input.email.trim().to_lowercase();
        let taken = self.users.find_one(&Filter::all().eq("username", &input.username)).await?.is_some()
            || self.users.find_one(&Filter::all().eq("email", &email)).await?.is_some();
        if taken {
            return Err(EcommerceError::AlreadyExists("User exists".into()));
        }

        let hash = hash_blocking(input.password).await?;
        let user = User::create(input.username, email, hash, role);
        self.users.save(&user).await.map_err(|e| match e {
            EcommerceError::AlreadyExists(_) => EcommerceError::AlreadyExists("User exists".into()),
            other => other,
        })?;
        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(AuthToken { token: self.tokens.issue(user.id, user.role)?, role: user.role })
    }

    pub async fn login(&self, credentials: Credentials) -> Result<AuthToken> {
        let invalid = || EcommerceError::Unauthorized("Invalid credentials".into());
        let user = self.get_by_username(&credentials.username).await.map_err(|_| invalid())?;
        let stored = user.password_hash.clone();
        let password = credentials.password;
        let ok = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| EcommerceError::Internal(format!("verification task failed: {e}")))?;
        if !ok {
            tracing::warn!(username = %user.username, "failed login");
            return Err(invalid());
        }
        Ok(AuthToken { token: self.tokens.issue(user.id, user.role)?, role: user.role })
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>> {
        Ok(self.users.find(&Filter::all()).await?.iter().map(User::profile).collect())
    }

    pub async fn get_user(&self, actor: &Actor, id: Uuid) -> Result<UserProfile> {
        actor.require_self_or_admin(id)?;
        Ok(self.users.get(id).await?.profile())
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        self.users
            .find_one(&Filter::all().eq("username", username))
            .await?
            .ok_or(EcommerceError::NotFound("User"))
    }

    pub async fn update_user(&self, actor: &Actor, id: Uuid, changes: UserChanges) -> Result<UserProfile> {
        actor.require_self_or_admin(id)?;
        changes.validate()?;
        let mut update = Update::new();
        if let Some(email) = changes.email {
            update = update.set("email", email.trim().to_lowercase());
        }
        if let Some(password) = changes.password {
            update = update.set("passwordHash", hash_blocking(password).await?);
        }
        if update.is_empty() {
            return self.users.get(id).await.map(|u| u.profile());
        }
        let user = self
            .users
            .find_by_id_and_update(id, &Filter::all(), &update)
            .await?
            .ok_or(EcommerceError::NotFound("User"))?;
        tracing::info!(user_id = %id, "user updated");
        Ok(user.profile())
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<UserProfile> {
        let user = self.users.find_by_id_and_delete(id).await?.ok_or(EcommerceError::NotFound("User"))?;
        tracing::info!(user_id = %id, "user deleted");
        Ok(user.profile())
    }

    pub async fn change_role(&self, id: Uuid, role_name: &str) -> Result<UserProfile> {
        let role = role_name.parse::<Role>().map_err(|e| EcommerceError::Validation(e.to_string()))?;
        let user = self
            .users
            .find_by_id_and_update(id, &Filter::all(), &Update::new().set("role", role))
            .await?
            .ok_or(EcommerceError::NotFound("User"))?;
        tracing::info!(user_id = %id, %role, "role changed");
        Ok(user.profile())
    }

    /// Create the default admin account when no user holds the admin username.
    /// Returns true when an account was created.
    pub async fn ensure_admin(&self, password: &str) -> Result<bool> {
        if self.users.find_one(&Filter::all().eq("username", ADMIN_USERNAME)).await?.is_some() {
            return Ok(false);
        }
        let hash = hash_blocking(password.to_string()).await?;
        let admin = User::create(ADMIN_USERNAME, ADMIN_EMAIL, hash, Role::Admin);
        match self.users.save(&admin).await {
            Ok(()) => {
                tracing::info!(user_id = %admin.id, "default admin created");
                Ok(true)
            }
            Err(EcommerceError::AlreadyExists(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
