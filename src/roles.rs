//! Role hierarchy and capability predicates.
//!
//! Every function here is pure and total over [`Role`]. Role strings that do not
//! parse never become a `Role`, so callers holding "no role" get no capability.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{auth::Principal, models::Order};

/// Role
///
/// The closed set of roles a principal can hold. The four ranked roles form a total
/// order; `Rider` sits outside the hierarchy and only passes explicit allowed-sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Role {
    Customer,
    StoreAdmin,
    FranchiseAdmin,
    SuperAdmin,
    Rider,
}

/// Staff roles allowed to work on orders of stores in their scope.
pub const ORDER_STAFF: &[Role] = &[Role::StoreAdmin, Role::FranchiseAdmin, Role::SuperAdmin];

/// Roles allowed to create and edit stores.
pub const STORE_MANAGERS: &[Role] = &[Role::FranchiseAdmin, Role::SuperAdmin];

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Customer,
        Role::StoreAdmin,
        Role::FranchiseAdmin,
        Role::SuperAdmin,
        Role::Rider,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::StoreAdmin => "STORE_ADMIN",
            Role::FranchiseAdmin => "FRANCHISE_ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Rider => "RIDER",
        }
    }

    /// Position in the hierarchy. `None` for roles outside it.
    pub fn rank(self) -> Option<u8> {
        match self {
            Role::Customer => Some(1),
            Role::StoreAdmin => Some(2),
            Role::FranchiseAdmin => Some(3),
            Role::SuperAdmin => Some(4),
            Role::Rider => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized role")]
pub struct UnknownRole;

impl FromStr for Role {
    type Err = UnknownRole;

    /// Exact match on the canonical names; anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or(UnknownRole)
    }
}

/// True iff `role` ranks at or above `required`. Unranked roles on either side fail closed.
pub fn is_at_least(role: Role, required: Role) -> bool {
    match (role.rank(), required.rank()) {
        (Some(have), Some(need)) => have >= need,
        _ => false,
    }
}

pub fn can_manage_franchises(role: Role) -> bool {
    role == Role::SuperAdmin
}

pub fn can_manage_stores(role: Role) -> bool {
    STORE_MANAGERS.contains(&role)
}

pub fn can_manage_orders(role: Role) -> bool {
    ORDER_STAFF.contains(&role)
}

/// Scope
///
/// Who administers the store a resource belongs to. Built by the caller from the store
/// row and its franchise row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope {
    pub store_admin_id: Option<Uuid>,
    pub franchise_owner_id: Option<Uuid>,
}

/// Whether an admin principal's role covers a store-scoped resource.
pub fn dominates_scope(principal: &Principal, scope: &Scope) -> bool {
    match principal.role {
        Role::SuperAdmin => true,
        Role::FranchiseAdmin => scope.franchise_owner_id == Some(principal.id),
        Role::StoreAdmin => scope.store_admin_id == Some(principal.id),
        Role::Customer | Role::Rider => false,
    }
}

/// can_view_order
///
/// Customers see their own orders, riders the orders assigned to them, store staff the
/// orders inside their scope, super admins everything.
pub fn can_view_order(principal: &Principal, order: &Order, scope: &Scope) -> bool {
    match principal.role {
        Role::Customer => order.customer_id == principal.id,
        Role::Rider => order.rider_id == Some(principal.id),
        Role::StoreAdmin | Role::FranchiseAdmin | Role::SuperAdmin => {
            dominates_scope(principal, scope)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderStatus;

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            role,
            active: true,
        }
    }

    fn order_for(customer_id: Uuid) -> Order {
        Order {
            id: Uuid::new_v4(),
            customer_id,
            store_id: Uuid::new_v4(),
            address_id: Uuid::new_v4(),
            rider_id: None,
            status: OrderStatus::Pending,
            items: vec![],
            total_cents: 0,
            notes: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn hierarchy_comparisons() {
        assert!(is_at_least(Role::SuperAdmin, Role::StoreAdmin));
        assert!(!is_at_least(Role::Customer, Role::StoreAdmin));
        assert!(is_at_least(Role::StoreAdmin, Role::StoreAdmin));
        assert!(is_at_least(Role::FranchiseAdmin, Role::Customer));
    }

    #[test]
    fn rider_is_outside_the_hierarchy() {
        assert!(!is_at_least(Role::Rider, Role::Customer));
        assert!(!is_at_least(Role::Rider, Role::Rider));
        assert!(!is_at_least(Role::SuperAdmin, Role::Rider));
    }

    #[test]
    fn capability_predicates() {
        assert!(can_manage_franchises(Role::SuperAdmin));
        assert!(!can_manage_franchises(Role::FranchiseAdmin));

        assert!(can_manage_stores(Role::SuperAdmin));
        assert!(can_manage_stores(Role::FranchiseAdmin));
        assert!(!can_manage_stores(Role::StoreAdmin));

        assert!(can_manage_orders(Role::StoreAdmin));
        assert!(can_manage_orders(Role::FranchiseAdmin));
        assert!(can_manage_orders(Role::SuperAdmin));
        assert!(!can_manage_orders(Role::Customer));
        assert!(!can_manage_orders(Role::Rider));
    }

    #[test]
    fn parsing_is_exact_and_fails_closed() {
        assert_eq!("SUPER_ADMIN".parse::<Role>(), Ok(Role::SuperAdmin));
        assert_eq!("RIDER".parse::<Role>(), Ok(Role::Rider));
        assert_eq!("".parse::<Role>(), Err(UnknownRole));
        assert_eq!("super_admin".parse::<Role>(), Err(UnknownRole));
        assert_eq!("ADMIN".parse::<Role>(), Err(UnknownRole));
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&Role::FranchiseAdmin).unwrap();
        assert_eq!(json, "\"FRANCHISE_ADMIN\"");
        for role in Role::ALL {
            assert_eq!(format!("\"{}\"", role.as_str()), serde_json::to_string(&role).unwrap());
        }
    }

    #[test]
    fn customers_only_view_their_own_orders() {
        let customer = principal(Role::Customer);
        let own = order_for(customer.id);
        let foreign = order_for(Uuid::new_v4());

        assert!(can_view_order(&customer, &own, &Scope::default()));
        assert!(!can_view_order(&customer, &foreign, &Scope::default()));
    }

    #[test]
    fn riders_only_view_assigned_orders() {
        let rider = principal(Role::Rider);
        let mut order = order_for(Uuid::new_v4());
        assert!(!can_view_order(&rider, &order, &Scope::default()));

        order.rider_id = Some(rider.id);
        assert!(can_view_order(&rider, &order, &Scope::default()));
    }

    #[test]
    fn staff_view_orders_inside_their_scope() {
        let store_admin = principal(Role::StoreAdmin);
        let franchise_admin = principal(Role::FranchiseAdmin);
        let super_admin = principal(Role::SuperAdmin);
        let order = order_for(Uuid::new_v4());

        let scope = Scope {
            store_admin_id: Some(store_admin.id),
            franchise_owner_id: Some(franchise_admin.id),
        };
        assert!(can_view_order(&store_admin, &order, &scope));
        assert!(can_view_order(&franchise_admin, &order, &scope));
        assert!(can_view_order(&super_admin, &order, &Scope::default()));

        let elsewhere = Scope {
            store_admin_id: Some(Uuid::new_v4()),
            franchise_owner_id: Some(Uuid::new_v4()),
        };
        assert!(!can_view_order(&store_admin, &order, &elsewhere));
        assert!(!can_view_order(&franchise_admin, &order, &elsewhere));
    }
}
