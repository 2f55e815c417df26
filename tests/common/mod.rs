//! Shared fixtures for the integration tests: an in-memory `AppState` plus seeding
//! helpers that go through the repository, never through private fields.
#![allow(dead_code)]

use laundry_hub::{
    AppState, MemoryNotifier, MemoryRepository, Pbkdf2Hasher,
    auth::Principal,
    config::AppConfig,
    models::{
        AddressRequest, CreateFranchiseRequest, CreateStoreRequest, Franchise, NewOrder, Order,
        OrderItem, ServiceKind, Store, User,
    },
    roles::Role,
};
use std::sync::Arc;
use uuid::Uuid;

pub const PASSWORD: &str = "password123";

pub struct TestContext {
    pub state: AppState,
    pub notifier: Arc<MemoryNotifier>,
}

/// Local defaults with a cheap work factor so tests stay fast.
pub fn test_config() -> AppConfig {
    AppConfig {
        password_hash_iterations: 1_000,
        ..AppConfig::default()
    }
}

pub fn create_test_context() -> TestContext {
    create_test_context_with(test_config())
}

pub fn create_test_context_with(config: AppConfig) -> TestContext {
    let notifier = Arc::new(MemoryNotifier::new());
    let state = AppState {
        repo: Arc::new(MemoryRepository::new()),
        notifier: notifier.clone(),
        hasher: Arc::new(Pbkdf2Hasher::new(config.password_hash_iterations)),
        config,
    };
    TestContext { state, notifier }
}

pub async fn seed_user(state: &AppState, role: Role) -> User {
    let email = format!("{}-{}@example.com", role.as_str().to_lowercase(), Uuid::new_v4());
    seed_user_with_email(state, &email, role).await
}

pub async fn seed_user_with_email(state: &AppState, email: &str, role: Role) -> User {
    state
        .repo
        .create_user(laundry_hub::models::NewUser {
            email: email.to_string(),
            name: "Test User".to_string(),
            phone: None,
            password_hash: state.hasher.hash(PASSWORD),
            role,
        })
        .await
        .expect("seed user")
}

pub fn principal_of(user: &User) -> Principal {
    Principal {
        id: user.id,
        role: user.role.parse().expect("seeded users have a known role"),
        active: user.is_active,
    }
}

pub async fn seed_principal(state: &AppState, role: Role) -> Principal {
    principal_of(&seed_user(state, role).await)
}

pub async fn seed_franchise(state: &AppState, owner_id: Uuid) -> Franchise {
    state
        .repo
        .create_franchise(&CreateFranchiseRequest {
            name: "Fresh Folds".to_string(),
            owner_id,
        })
        .await
        .expect("seed franchise")
}

pub async fn seed_store(state: &AppState, franchise_id: Uuid, admin_id: Option<Uuid>) -> Store {
    state
        .repo
        .create_store(&CreateStoreRequest {
            franchise_id,
            name: "Main Street".to_string(),
            address: "1 Main Street".to_string(),
            admin_id,
        })
        .await
        .expect("seed store")
}

pub fn address_request(label: &str) -> AddressRequest {
    AddressRequest {
        label: label.to_string(),
        line1: "12 Elm Road".to_string(),
        line2: None,
        city: "Springfield".to_string(),
        postal_code: "12345".to_string(),
        is_default: false,
    }
}

/// A tenant with one franchise (owned by `franchise_admin`) and one store (run by
/// `store_admin`), plus a customer with one address.
pub struct Tenant {
    pub franchise_admin: Principal,
    pub store_admin: Principal,
    pub customer: Principal,
    pub franchise: Franchise,
    pub store: Store,
    pub address_id: Uuid,
}

pub async fn seed_tenant(state: &AppState) -> Tenant {
    let franchise_admin = seed_principal(state, Role::FranchiseAdmin).await;
    let store_admin = seed_principal(state, Role::StoreAdmin).await;
    let customer = seed_principal(state, Role::Customer).await;
    let franchise = seed_franchise(state, franchise_admin.id).await;
    let store = seed_store(state, franchise.id, Some(store_admin.id)).await;
    let address = state
        .repo
        .create_address(customer.id, &address_request("Home"))
        .await
        .expect("seed address");
    Tenant {
        franchise_admin,
        store_admin,
        customer,
        franchise,
        store,
        address_id: address.id,
    }
}

pub async fn seed_order(state: &AppState, tenant: &Tenant) -> Order {
    let items = vec![OrderItem {
        service: ServiceKind::WashAndFold,
        quantity: 2,
    }];
    state
        .repo
        .create_order(NewOrder {
            customer_id: tenant.customer.id,
            store_id: tenant.store.id,
            address_id: tenant.address_id,
            total_cents: laundry_hub::models::order_total_cents(&items),
            items,
            notes: None,
        })
        .await
        .expect("seed order")
}
