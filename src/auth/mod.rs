//! Access control gate: resolves a bearer credential to an [`Actor`] and checks
//! role allow-lists. Order and inventory logic only ever see the resolved actor.

pub mod password;
pub mod token;

use uuid::Uuid;

pub use crate::domain::value_objects::{Actor, Role};
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenService};

use crate::domain::aggregates::User;
use crate::store::{Collection, SharedStore};
use crate::{EcommerceError, Result};

#[derive(Clone)]
pub struct AccessGate {
    tokens: TokenService,
    users: Collection<User>,
}

impl AccessGate {
    pub fn new(tokens: TokenService, store: SharedStore) -> Self {
        Self { tokens, users: Collection::new(store) }
    }

    /// Resolve a bearer token. The account is re-read so deleted users are
    /// rejected and role changes apply to tokens issued before them.
    pub async fn authenticate(&self, credential: Option<&str>) -> Result<Actor> {
        let token = credential
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| EcommerceError::Unauthorized("No token".into()))?;
        let claims = self.tokens.verify(token)?;
        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| EcommerceError::Unauthorized("Invalid user".into()))?;
        Ok(Actor::new(user.id, user.role))
    }
}

pub fn authorize(role: Role, allowed: &[Role]) -> bool {
    allowed.contains(&role)
}

impl Actor {
    pub fn require(&self, allowed: &[Role]) -> Result<()> {
        if authorize(self.role, allowed) { Ok(()) }
        else { Err(EcommerceError::AccessDenied(format!("role {} is not permitted", self.role))) }
    }

    /// Admins may act on any account; everyone else only on their own.
    pub fn require_self_or_admin(&self, user_id: Uuid) -> Result<()> {
        if self.id == user_id || self.is(Role::Admin) { Ok(()) }
        else { Err(EcommerceError::AccessDenied("not your account".into())) }
    }
}
