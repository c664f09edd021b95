use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Permission;
use crate::permissions::{INVENTORY_ADJUST, INVENTORY_READ};

/// Role identifier used for RBAC.
///
/// Role names are compared exactly (`"Admin"`, not `"admin"`), matching how the
/// roles table stores them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: &'static str = "Admin";
    pub const MANAGER: &'static str = "Manager";
    pub const CASHIER: &'static str = "Cashier";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn admin() -> Self {
        Self::new(Self::ADMIN)
    }

    pub fn manager() -> Self {
        Self::new(Self::MANAGER)
    }

    pub fn cashier() -> Self {
        Self::new(Self::CASHIER)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Static role→permission policy.
    ///
    /// `Admin` gets the wildcard; `Manager` may read and adjust inventory;
    /// every other role gets nothing on the inventory surface.
    pub fn permissions(&self) -> Vec<Permission> {
        match self.as_str() {
            Self::ADMIN => vec![Permission::new("*")],
            Self::MANAGER => vec![INVENTORY_READ, INVENTORY_ADJUST],
            _ => Vec::new(),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_gets_inventory_permissions_only() {
        let perms = Role::manager().permissions();
        assert!(perms.contains(&INVENTORY_READ));
        assert!(perms.contains(&INVENTORY_ADJUST));
        assert!(!perms.iter().any(Permission::is_wildcard));
    }

    #[test]
    fn role_names_are_case_sensitive() {
        assert!(Role::new("admin").permissions().is_empty());
        assert!(Role::admin().permissions()[0].is_wildcard());
        assert!(Role::cashier().permissions().is_empty());
    }
}
