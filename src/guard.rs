//! Per-route guards.
//!
//! Finer than the access gate: handlers call these before doing any work, so a failed
//! check always short-circuits the request.

use uuid::Uuid;

use crate::{
    auth::{Identity, Principal},
    error::ApiError,
    models::Store,
    repository::RepositoryState,
    roles::{self, Role, Scope},
};

/// Unwraps an authenticated principal. Missing and unrecognized identities are both 401.
pub fn authenticated(identity: Identity) -> Result<Principal, ApiError> {
    match identity {
        Identity::Authenticated(principal) if principal.active => Ok(principal),
        Identity::Authenticated(_) | Identity::Anonymous | Identity::Unrecognized => {
            Err(ApiError::Unauthenticated)
        }
    }
}

/// Explicit allowed-set check.
pub fn require_roles(principal: &Principal, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        tracing::debug!(user_id = %principal.id, role = %principal.role, "role not allowed");
        Err(ApiError::Forbidden)
    }
}

/// Hierarchy check: the principal's role must rank at or above `required`.
pub fn require_at_least(principal: &Principal, required: Role) -> Result<(), ApiError> {
    if roles::is_at_least(principal.role, required) {
        Ok(())
    } else {
        tracing::debug!(user_id = %principal.id, role = %principal.role, %required, "role ranks too low");
        Err(ApiError::Forbidden)
    }
}

/// Capability check against one of the role-policy predicates, e.g.
/// [`roles::can_manage_stores`].
pub fn require_capability(
    principal: &Principal,
    capability: fn(Role) -> bool,
) -> Result<(), ApiError> {
    if capability(principal.role) {
        Ok(())
    } else {
        tracing::debug!(user_id = %principal.id, role = %principal.role, "capability not granted");
        Err(ApiError::Forbidden)
    }
}

/// Ownership check for customer-owned resources. A foreign resource is reported as
/// missing so its existence is not revealed.
pub fn ensure_owner(
    owner_id: Uuid,
    principal: &Principal,
    what: &'static str,
) -> Result<(), ApiError> {
    if owner_id == principal.id {
        Ok(())
    } else {
        Err(ApiError::NotFound(what))
    }
}

/// Scope check for store-scoped resources, reported as missing on failure.
pub fn ensure_scope(
    principal: &Principal,
    scope: &Scope,
    what: &'static str,
) -> Result<(), ApiError> {
    if roles::dominates_scope(principal, scope) {
        Ok(())
    } else {
        Err(ApiError::NotFound(what))
    }
}

/// Builds the scope of a store from its own row and its franchise's owner.
pub async fn store_scope(repo: &RepositoryState, store: &Store) -> Result<Scope, ApiError> {
    let franchise = repo.get_franchise(store.franchise_id).await?;
    Ok(Scope {
        store_admin_id: store.admin_id,
        franchise_owner_id: franchise.map(|f| f.owner_id),
    })
}

/// Loads a store and checks it lies inside the principal's scope.
pub async fn store_in_scope(
    repo: &RepositoryState,
    principal: &Principal,
    store_id: Uuid,
) -> Result<Store, ApiError> {
    let store = repo
        .get_store(store_id)
        .await?
        .ok_or(ApiError::NotFound("store"))?;
    let scope = store_scope(repo, &store).await?;
    ensure_scope(principal, &scope, "store")?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            role,
            active: true,
        }
    }

    #[test]
    fn authenticated_rejects_everything_but_active_principals() {
        let active = principal(Role::Customer);
        assert_eq!(
            authenticated(Identity::Authenticated(active.clone())).unwrap(),
            active
        );

        let inactive = Principal { active: false, ..principal(Role::SuperAdmin) };
        for identity in [
            Identity::Anonymous,
            Identity::Unrecognized,
            Identity::Authenticated(inactive),
        ] {
            assert!(matches!(authenticated(identity), Err(ApiError::Unauthenticated)));
        }
    }

    #[test]
    fn explicit_sets_do_not_use_the_hierarchy() {
        let super_admin = principal(Role::SuperAdmin);
        assert!(matches!(
            require_roles(&super_admin, &[Role::Rider]),
            Err(ApiError::Forbidden)
        ));
        assert!(require_roles(&principal(Role::Rider), &[Role::Rider]).is_ok());
    }

    #[test]
    fn hierarchy_requirement() {
        assert!(require_at_least(&principal(Role::FranchiseAdmin), Role::StoreAdmin).is_ok());
        assert!(matches!(
            require_at_least(&principal(Role::Customer), Role::StoreAdmin),
            Err(ApiError::Forbidden)
        ));
        assert!(require_at_least(&principal(Role::Rider), Role::Customer).is_err());
    }

    #[test]
    fn capabilities_come_from_the_role_policy() {
        assert!(require_capability(&principal(Role::FranchiseAdmin), roles::can_manage_stores).is_ok());
        assert!(matches!(
            require_capability(&principal(Role::StoreAdmin), roles::can_manage_stores),
            Err(ApiError::Forbidden)
        ));
        assert!(require_capability(&principal(Role::StoreAdmin), roles::can_manage_orders).is_ok());
        assert!(require_capability(&principal(Role::Rider), roles::can_manage_orders).is_err());
        assert!(require_capability(&principal(Role::FranchiseAdmin), roles::can_manage_franchises).is_err());
    }

    #[test]
    fn foreign_resources_look_missing() {
        let caller = principal(Role::Customer);
        assert!(ensure_owner(caller.id, &caller, "address").is_ok());
        assert!(matches!(
            ensure_owner(Uuid::new_v4(), &caller, "address"),
            Err(ApiError::NotFound("address"))
        ));
    }
}
