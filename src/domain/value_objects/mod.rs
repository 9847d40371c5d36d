//! Value Objects for E-commerce

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role assigned to every account. Closed set; authorization decisions match on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    WarehouseManager,
    DeliveryAgent,
    User,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::WarehouseManager, Role::DeliveryAgent, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::WarehouseManager => "warehouse_manager",
            Self::DeliveryAgent => "delivery_agent",
            Self::User => "user",
        }
    }
}

impl Default for Role {
    fn default() -> Self { Self::User }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| RoleError::Unknown(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum RoleError { Unknown(String) }
impl std::error::Error for RoleError {}
impl fmt::Display for RoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Unknown(name) => write!(f, "Invalid role: {name}") }
    }
}

/// Resolved caller identity. This is all the order and inventory core sees of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: uuid::Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: uuid::Uuid, role: Role) -> Self { Self { id, role } }
    pub fn is(&self, role: Role) -> bool { self.role == role }
}

/// Positive line-item quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value <= 0 { return Err(QuantityError::NotPositive(value)); }
        u32::try_from(value).map(Self).map_err(|_| QuantityError::TooLarge(value))
    }
    pub fn as_i64(&self) -> i64 { i64::from(self.0) }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;
    fn try_from(value: i64) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for i64 {
    fn from(q: Quantity) -> Self { q.as_i64() }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { NotPositive(i64), TooLarge(i64) }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive(v) => write!(f, "quantity must be positive, got {v}"),
            Self::TooLarge(v) => write!(f, "quantity {v} is too large"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_role_parse() {
        assert_eq!("warehouse_manager".parse::<Role>().unwrap(), Role::WarehouseManager);
        assert_eq!(" admin ".parse::<Role>().unwrap(), Role::Admin);
        assert!("superuser".parse::<Role>().is_err());
    }
    #[test]
    fn test_role_serde_matches_display() {
        for role in Role::ALL {
            assert_eq!(serde_json::to_value(role).unwrap(), serde_json::json!(role.to_string()));
        }
    }
    #[test]
    fn test_quantity() {
        assert_eq!(Quantity::new(4).unwrap().as_i64(), 4);
        assert_eq!(Quantity::new(0), Err(QuantityError::NotPositive(0)));
        assert!(Quantity::new(-2).is_err());
        assert!(serde_json::from_str::<Quantity>("-1").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("3").unwrap().as_i64(), 3);
    }
}
