use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{OrderFilter, RepoResult, Repository, RepositoryError, StoreFilter};
use crate::models::{
    Address, AddressRequest, CreateFranchiseRequest, CreateStoreRequest, DashboardStats,
    Franchise, NewOrder, NewUser, Order, OrderStatus, StatusCount, Store, UpdateAddressRequest,
    UpdateFranchiseRequest, UpdateStoreRequest, User,
};
use crate::roles::Role;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    franchises: HashMap<Uuid, Franchise>,
    stores: HashMap<Uuid, Store>,
    addresses: HashMap<Uuid, Address>,
    orders: HashMap<Uuid, Order>,
}

/// MemoryRepository
///
/// An in-process implementation of the `Repository` trait. Every operation runs while
/// holding one mutex over all tables, which gives each call the same all-or-nothing
/// visibility a Postgres transaction gives the SQL implementation.
///
/// Used by the test suites and by local runs with `DATABASE_URL=memory`.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Listing order shared by every table: oldest first, id as tie-break.
fn sorted<T: Clone>(
    rows: impl Iterator<Item = T>,
    key: impl Fn(&T) -> (chrono::DateTime<Utc>, Uuid),
) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    rows.sort_by_key(|row| key(row));
    rows
}

#[async_trait]
impl Repository for MemoryRepository {
    // --- USERS ---

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut tables = self.tables.lock().await;
        let taken = tables
            .users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email));
        if taken {
            return Err(RepositoryError::Conflict("users_email_key".to_string()));
        }

        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            phone: user.phone,
            password_hash: user.password_hash,
            role: user.role.as_str().to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self
            .tables
            .lock()
            .await
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let tables = self.tables.lock().await;
        Ok(sorted(tables.users.values().cloned(), |u| (u.created_at, u.id)))
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.role = role.as_str().to_string();
            user.clone()
        }))
    }

    async fn set_user_active(&self, id: Uuid, is_active: bool) -> RepoResult<Option<User>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.is_active = is_active;
            user.clone()
        }))
    }

    // --- FRANCHISES ---

    async fn create_franchise(&self, req: &CreateFranchiseRequest) -> RepoResult<Franchise> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&req.owner_id) {
            return Err(RepositoryError::Conflict("franchises_owner_id_fkey".to_string()));
        }
        let franchise = Franchise {
            id: Uuid::new_v4(),
            name: req.name.clone(),
            owner_id: req.owner_id,
            is_active: true,
            created_at: Utc::now(),
        };
        tables.franchises.insert(franchise.id, franchise.clone());
        Ok(franchise)
    }

    async fn get_franchise(&self, id: Uuid) -> RepoResult<Option<Franchise>> {
        Ok(self.tables.lock().await.franchises.get(&id).cloned())
    }

    async fn list_franchises(&self) -> RepoResult<Vec<Franchise>> {
        let tables = self.tables.lock().await;
        Ok(sorted(tables.franchises.values().cloned(), |f| (f.created_at, f.id)))
    }

    async fn update_franchise(
        &self,
        id: Uuid,
        req: &UpdateFranchiseRequest,
    ) -> RepoResult<Option<Franchise>> {
        let mut tables = self.tables.lock().await;
        if let Some(owner_id) = req.owner_id {
            if !tables.users.contains_key(&owner_id) {
                return Err(RepositoryError::Conflict("franchises_owner_id_fkey".to_string()));
            }
        }
        Ok(tables.franchises.get_mut(&id).map(|franchise| {
            if let Some(name) = &req.name {
                franchise.name = name.clone();
            }
            if let Some(owner_id) = req.owner_id {
                franchise.owner_id = owner_id;
            }
            if let Some(is_active) = req.is_active {
                franchise.is_active = is_active;
            }
            franchise.clone()
        }))
    }

    async fn delete_franchise(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables.lock().await;
        if tables.stores.values().any(|store| store.franchise_id == id) {
            return Err(RepositoryError::Conflict("stores_franchise_id_fkey".to_string()));
        }
        Ok(tables.franchises.remove(&id).is_some())
    }

    // --- STORES ---

    async fn create_store(&self, req: &CreateStoreRequest) -> RepoResult<Store> {
        let mut tables = self.tables.lock().await;
        if !tables.franchises.contains_key(&req.franchise_id) {
            return Err(RepositoryError::Conflict("stores_franchise_id_fkey".to_string()));
        }
        let store = Store {
            id: Uuid::new_v4(),
            franchise_id: req.franchise_id,
            name: req.name.clone(),
            address: req.address.clone(),
            admin_id: req.admin_id,
            is_active: true,
            created_at: Utc::now(),
        };
        tables.stores.insert(store.id, store.clone());
        Ok(store)
    }

    async fn get_store(&self, id: Uuid) -> RepoResult<Option<Store>> {
        Ok(self.tables.lock().await.stores.get(&id).cloned())
    }

    async fn list_stores(&self, filter: StoreFilter) -> RepoResult<Vec<Store>> {
        let tables = self.tables.lock().await;
        let matches = |store: &&Store| match filter {
            StoreFilter::All => true,
            StoreFilter::ActiveOnly => store.is_active,
            StoreFilter::FranchiseOwner(owner_id) => tables
                .franchises
                .get(&store.franchise_id)
                .is_some_and(|franchise| franchise.owner_id == owner_id),
            StoreFilter::StoreAdmin(admin_id) => store.admin_id == Some(admin_id),
        };
        Ok(sorted(
            tables.stores.values().filter(matches).cloned(),
            |s| (s.created_at, s.id),
        ))
    }

    async fn update_store(&self, id: Uuid, req: &UpdateStoreRequest) -> RepoResult<Option<Store>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.stores.get_mut(&id).map(|store| {
            if let Some(name) = &req.name {
                store.name = name.clone();
            }
            if let Some(address) = &req.address {
                store.address = address.clone();
            }
            if let Some(admin_id) = req.admin_id {
                store.admin_id = Some(admin_id);
            }
            if let Some(is_active) = req.is_active {
                store.is_active = is_active;
            }
            store.clone()
        }))
    }

    // --- ADDRESSES ---

    async fn list_addresses(&self, customer_id: Uuid) -> RepoResult<Vec<Address>> {
        let tables = self.tables.lock().await;
        Ok(sorted(
            tables
                .addresses
                .values()
                .filter(|address| address.customer_id == customer_id)
                .cloned(),
            |a| (a.created_at, a.id),
        ))
    }

    async fn get_address(&self, customer_id: Uuid, id: Uuid) -> RepoResult<Option<Address>> {
        Ok(self
            .tables
            .lock()
            .await
            .addresses
            .get(&id)
            .filter(|address| address.customer_id == customer_id)
            .cloned())
    }

    async fn create_address(&self, customer_id: Uuid, req: &AddressRequest) -> RepoResult<Address> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&customer_id) {
            return Err(RepositoryError::NotFound);
        }

        let first = !tables
            .addresses
            .values()
            .any(|address| address.customer_id == customer_id);
        let make_default = req.is_default || first;
        if make_default {
            tables
                .addresses
                .values_mut()
                .filter(|address| address.customer_id == customer_id)
                .for_each(|address| address.is_default = false);
        }

        let address = Address {
            id: Uuid::new_v4(),
            customer_id,
            label: req.label.clone(),
            line1: req.line1.clone(),
            line2: req.line2.clone(),
            city: req.city.clone(),
            postal_code: req.postal_code.clone(),
            is_default: make_default,
            created_at: Utc::now(),
        };
        tables.addresses.insert(address.id, address.clone());
        Ok(address)
    }

    async fn update_address(
        &self,
        customer_id: Uuid,
        id: Uuid,
        req: &UpdateAddressRequest,
    ) -> RepoResult<Option<Address>> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .addresses
            .get_mut(&id)
            .filter(|address| address.customer_id == customer_id)
            .map(|address| {
                if let Some(label) = &req.label {
                    address.label = label.clone();
                }
                if let Some(line1) = &req.line1 {
                    address.line1 = line1.clone();
                }
                if let Some(line2) = &req.line2 {
                    address.line2 = (!line2.is_empty()).then(|| line2.clone());
                }
                if let Some(city) = &req.city {
                    address.city = city.clone();
                }
                if let Some(postal_code) = &req.postal_code {
                    address.postal_code = postal_code.clone();
                }
                address.clone()
            }))
    }

    async fn delete_address(&self, customer_id: Uuid, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables.lock().await;
        let owned = tables
            .addresses
            .get(&id)
            .is_some_and(|address| address.customer_id == customer_id);
        if !owned {
            return Ok(false);
        }
        if tables.orders.values().any(|order| order.address_id == id) {
            return Err(RepositoryError::Conflict("orders_address_id_fkey".to_string()));
        }
        Ok(tables.addresses.remove(&id).is_some())
    }

    async fn set_default_address(&self, customer_id: Uuid, id: Uuid) -> RepoResult<Address> {
        let mut tables = self.tables.lock().await;
        let owned = tables
            .addresses
            .get(&id)
            .is_some_and(|address| address.customer_id == customer_id);
        if !owned {
            return Err(RepositoryError::NotFound);
        }

        for address in tables.addresses.values_mut() {
            if address.customer_id == customer_id {
                address.is_default = address.id == id;
            }
        }
        tables
            .addresses
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    // --- ORDERS ---

    async fn create_order(&self, order: NewOrder) -> RepoResult<Order> {
        let mut tables = self.tables.lock().await;
        if !tables.stores.contains_key(&order.store_id) {
            return Err(RepositoryError::Conflict("orders_store_id_fkey".to_string()));
        }
        if !tables.addresses.contains_key(&order.address_id) {
            return Err(RepositoryError::Conflict("orders_address_id_fkey".to_string()));
        }
        let now = Utc::now();
        let created = Order {
            id: Uuid::new_v4(),
            customer_id: order.customer_id,
            store_id: order.store_id,
            address_id: order.address_id,
            rider_id: None,
            status: OrderStatus::Pending,
            items: order.items,
            total_cents: order.total_cents,
            notes: order.notes,
            created_at: now,
            updated_at: now,
        };
        tables.orders.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_order(&self, id: Uuid) -> RepoResult<Option<Order>> {
        Ok(self.tables.lock().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self, filter: OrderFilter) -> RepoResult<Vec<Order>> {
        let tables = self.tables.lock().await;
        let matches = |order: &&Order| match &filter {
            OrderFilter::All => true,
            OrderFilter::Customer(customer_id) => order.customer_id == *customer_id,
            OrderFilter::Rider(rider_id) => order.rider_id == Some(*rider_id),
            OrderFilter::Stores(store_ids) => store_ids.contains(&order.store_id),
        };
        let mut orders = sorted(
            tables.orders.values().filter(matches).cloned(),
            |o| (o.created_at, o.id),
        );
        // Newest first, like the SQL implementation.
        orders.reverse();
        Ok(orders)
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> RepoResult<Option<Order>> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .orders
            .get_mut(&id)
            .filter(|order| order.status == from)
            .map(|order| {
                order.status = to;
                order.updated_at = Utc::now();
                order.clone()
            }))
    }

    async fn assign_rider(&self, id: Uuid, rider_id: Uuid) -> RepoResult<Option<Order>> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .orders
            .get_mut(&id)
            .filter(|order| !order.status.is_terminal())
            .map(|order| {
                order.rider_id = Some(rider_id);
                order.updated_at = Utc::now();
                order.clone()
            }))
    }

    // --- DASHBOARD ---

    async fn get_stats(&self) -> RepoResult<DashboardStats> {
        let tables = self.tables.lock().await;
        let orders_by_status = OrderStatus::ALL
            .into_iter()
            .map(|status| StatusCount {
                status,
                count: tables.orders.values().filter(|o| o.status == status).count() as i64,
            })
            .filter(|entry| entry.count > 0)
            .collect();

        Ok(DashboardStats {
            total_users: tables.users.len() as i64,
            total_franchises: tables.franchises.len() as i64,
            total_stores: tables.stores.len() as i64,
            total_orders: tables.orders.len() as i64,
            orders_by_status,
        })
    }
}
