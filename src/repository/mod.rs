use crate::models::{
    Address, AddressRequest, CreateFranchiseRequest, CreateStoreRequest, DashboardStats,
    Franchise, NewOrder, NewUser, Order, OrderStatus, Store, UpdateAddressRequest,
    UpdateFranchiseRequest, UpdateStoreRequest, User,
};
use crate::roles::Role;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// RepositoryError
///
/// Failures surfaced by the data store. Unique and foreign-key violations are reported as
/// `Conflict` so handlers can answer 409 instead of 500.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("conflict on {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        let constraint = match &err {
            sqlx::Error::Database(db)
                if db.is_unique_violation() || db.is_foreign_key_violation() =>
            {
                Some(db.constraint().unwrap_or("constraint").to_string())
            }
            _ => None,
        };
        match (constraint, err) {
            (Some(constraint), _) => RepositoryError::Conflict(constraint),
            (None, sqlx::Error::RowNotFound) => RepositoryError::NotFound,
            (None, other) => RepositoryError::Database(other),
        }
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Which stores a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFilter {
    All,
    ActiveOnly,
    /// Stores of every franchise owned by this FRANCHISE_ADMIN.
    FranchiseOwner(Uuid),
    /// Stores run by this STORE_ADMIN.
    StoreAdmin(Uuid),
}

/// Which orders a listing should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderFilter {
    All,
    Customer(Uuid),
    Rider(Uuid),
    Stores(Vec<Uuid>),
}

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers only see this trait,
/// so Postgres and the in-memory store are interchangeable behind `Arc<dyn Repository>`.
///
/// Methods taking a `customer_id` alongside a resource id enforce ownership in the query
/// itself: a foreign resource behaves exactly like a missing one.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    /// Fails with `Conflict` when the email (case-insensitive) is already registered.
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>>;
    async fn set_user_active(&self, id: Uuid, is_active: bool) -> RepoResult<Option<User>>;

    // --- Franchises ---
    async fn create_franchise(&self, req: &CreateFranchiseRequest) -> RepoResult<Franchise>;
    async fn get_franchise(&self, id: Uuid) -> RepoResult<Option<Franchise>>;
    async fn list_franchises(&self) -> RepoResult<Vec<Franchise>>;
    async fn update_franchise(
        &self,
        id: Uuid,
        req: &UpdateFranchiseRequest,
    ) -> RepoResult<Option<Franchise>>;
    /// Fails with `Conflict` while stores still reference the franchise.
    async fn delete_franchise(&self, id: Uuid) -> RepoResult<bool>;

    // --- Stores ---
    async fn create_store(&self, req: &CreateStoreRequest) -> RepoResult<Store>;
    async fn get_store(&self, id: Uuid) -> RepoResult<Option<Store>>;
    async fn list_stores(&self, filter: StoreFilter) -> RepoResult<Vec<Store>>;
    async fn update_store(&self, id: Uuid, req: &UpdateStoreRequest) -> RepoResult<Option<Store>>;

    // --- Addresses (customer-owned) ---
    async fn list_addresses(&self, customer_id: Uuid) -> RepoResult<Vec<Address>>;
    async fn get_address(&self, customer_id: Uuid, id: Uuid) -> RepoResult<Option<Address>>;
    /// The new address becomes the default when requested or when it is the customer's
    /// first; any previous default is cleared in the same atomic unit.
    async fn create_address(&self, customer_id: Uuid, req: &AddressRequest) -> RepoResult<Address>;
    async fn update_address(
        &self,
        customer_id: Uuid,
        id: Uuid,
        req: &UpdateAddressRequest,
    ) -> RepoResult<Option<Address>>;
    /// Fails with `Conflict` while orders reference the address.
    async fn delete_address(&self, customer_id: Uuid, id: Uuid) -> RepoResult<bool>;
    /// Ownership check, clear, set: one atomic unit. `NotFound` if the address is not the
    /// customer's, in which case nothing changes.
    async fn set_default_address(&self, customer_id: Uuid, id: Uuid) -> RepoResult<Address>;

    // --- Orders ---
    async fn create_order(&self, order: NewOrder) -> RepoResult<Order>;
    async fn get_order(&self, id: Uuid) -> RepoResult<Option<Order>>;
    async fn list_orders(&self, filter: OrderFilter) -> RepoResult<Vec<Order>>;
    /// Compare-and-set: only applies when the current status is still `from`.
    async fn update_order_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> RepoResult<Option<Order>>;
    /// Only applies to orders that are not delivered or cancelled.
    async fn assign_rider(&self, id: Uuid, rider_id: Uuid) -> RepoResult<Option<Order>>;

    // --- Dashboard ---
    async fn get_stats(&self) -> RepoResult<DashboardStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
