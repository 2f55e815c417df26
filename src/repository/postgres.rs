use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};
use uuid::Uuid;

use super::{OrderFilter, RepoResult, Repository, RepositoryError, StoreFilter};
use crate::models::{
    Address, AddressRequest, CreateFranchiseRequest, CreateStoreRequest, DashboardStats,
    Franchise, NewOrder, NewUser, Order, OrderStatus, StatusCount, Store, UpdateAddressRequest,
    UpdateFranchiseRequest, UpdateStoreRequest, User,
};
use crate::roles::Role;

const USER_COLUMNS: &str = "id, email, name, phone, password_hash, role, is_active, created_at";
const FRANCHISE_COLUMNS: &str = "id, name, owner_id, is_active, created_at";
const STORE_COLUMNS: &str = "id, franchise_id, name, address, admin_id, is_active, created_at";
const ADDRESS_COLUMNS: &str =
    "id, customer_id, label, line1, line2, city, postal_code, is_default, created_at";
const ORDER_COLUMNS: &str = "id, customer_id, store_id, address_id, rider_id, status, items, \
                             total_cents, notes, created_at, updated_at";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Queries are built at runtime so the crate compiles without a live database;
/// the expected schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// lock_customer
    ///
    /// Takes a row lock on the customer's `users` row. Every default-address mutation
    /// starts with it, so concurrent changes for one customer run one after another.
    async fn lock_customer(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        customer_id: Uuid,
    ) -> RepoResult<bool> {
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(customer_id)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(locked.is_some())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    /// create_user
    ///
    /// Duplicate check and insert share one transaction; the unique index on `lower(email)`
    /// catches the race where two signups pass the check at the same time.
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut tx = self.pool.begin().await?;

        let taken: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE lower(email) = lower($1)")
                .bind(&user.email)
                .fetch_optional(&mut *tx)
                .await?;
        if taken.is_some() {
            return Err(RepositoryError::Conflict("users_email_key".to_string()));
        }

        let sql = format!(
            "INSERT INTO users (id, email, name, phone, password_hash, role, is_active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, true, NOW()) RETURNING {USER_COLUMNS}"
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.phone)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id");
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> RepoResult<Option<User>> {
        let sql = format!("UPDATE users SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_user_active(&self, id: Uuid, is_active: bool) -> RepoResult<Option<User>> {
        let sql =
            format!("UPDATE users SET is_active = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(is_active)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- FRANCHISES ---

    async fn create_franchise(&self, req: &CreateFranchiseRequest) -> RepoResult<Franchise> {
        let sql = format!(
            "INSERT INTO franchises (id, name, owner_id, is_active, created_at) \
             VALUES ($1, $2, $3, true, NOW()) RETURNING {FRANCHISE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Franchise>(&sql)
            .bind(Uuid::new_v4())
            .bind(&req.name)
            .bind(req.owner_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_franchise(&self, id: Uuid) -> RepoResult<Option<Franchise>> {
        let sql = format!("SELECT {FRANCHISE_COLUMNS} FROM franchises WHERE id = $1");
        Ok(sqlx::query_as::<_, Franchise>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_franchises(&self) -> RepoResult<Vec<Franchise>> {
        let sql = format!("SELECT {FRANCHISE_COLUMNS} FROM franchises ORDER BY created_at, id");
        Ok(sqlx::query_as::<_, Franchise>(&sql).fetch_all(&self.pool).await?)
    }

    /// update_franchise
    ///
    /// Partial update: `COALESCE` keeps every column whose field in `req` is `None`.
    async fn update_franchise(
        &self,
        id: Uuid,
        req: &UpdateFranchiseRequest,
    ) -> RepoResult<Option<Franchise>> {
        let sql = format!(
            "UPDATE franchises \
             SET name = COALESCE($2, name), \
                 owner_id = COALESCE($3, owner_id), \
                 is_active = COALESCE($4, is_active) \
             WHERE id = $1 RETURNING {FRANCHISE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Franchise>(&sql)
            .bind(id)
            .bind(&req.name)
            .bind(req.owner_id)
            .bind(req.is_active)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_franchise(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM franchises WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- STORES ---

    async fn create_store(&self, req: &CreateStoreRequest) -> RepoResult<Store> {
        let sql = format!(
            "INSERT INTO stores (id, franchise_id, name, address, admin_id, is_active, created_at) \
             VALUES ($1, $2, $3, $4, $5, true, NOW()) RETURNING {STORE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Store>(&sql)
            .bind(Uuid::new_v4())
            .bind(req.franchise_id)
            .bind(&req.name)
            .bind(&req.address)
            .bind(req.admin_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_store(&self, id: Uuid) -> RepoResult<Option<Store>> {
        let sql = format!("SELECT {STORE_COLUMNS} FROM stores WHERE id = $1");
        Ok(sqlx::query_as::<_, Store>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// list_stores
    ///
    /// Uses QueryBuilder so the filter is appended with bound parameters only.
    async fn list_stores(&self, filter: StoreFilter) -> RepoResult<Vec<Store>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT s.id, s.franchise_id, s.name, s.address, s.admin_id, s.is_active, s.created_at \
             FROM stores s",
        );
        match filter {
            StoreFilter::All => {}
            StoreFilter::ActiveOnly => {
                builder.push(" WHERE s.is_active = true");
            }
            StoreFilter::FranchiseOwner(owner_id) => {
                builder.push(" JOIN franchises f ON f.id = s.franchise_id WHERE f.owner_id = ");
                builder.push_bind(owner_id);
            }
            StoreFilter::StoreAdmin(admin_id) => {
                builder.push(" WHERE s.admin_id = ");
                builder.push_bind(admin_id);
            }
        }
        builder.push(" ORDER BY s.created_at, s.id");

        Ok(builder
            .build_query_as::<Store>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_store(&self, id: Uuid, req: &UpdateStoreRequest) -> RepoResult<Option<Store>> {
        let sql = format!(
            "UPDATE stores \
             SET name = COALESCE($2, name), \
                 address = COALESCE($3, address), \
                 admin_id = COALESCE($4, admin_id), \
                 is_active = COALESCE($5, is_active) \
             WHERE id = $1 RETURNING {STORE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Store>(&sql)
            .bind(id)
            .bind(&req.name)
            .bind(&req.address)
            .bind(req.admin_id)
            .bind(req.is_active)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- ADDRESSES ---

    async fn list_addresses(&self, customer_id: Uuid) -> RepoResult<Vec<Address>> {
        let sql = format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE customer_id = $1 \
             ORDER BY created_at, id"
        );
        Ok(sqlx::query_as::<_, Address>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_address(&self, customer_id: Uuid, id: Uuid) -> RepoResult<Option<Address>> {
        let sql =
            format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1 AND customer_id = $2");
        Ok(sqlx::query_as::<_, Address>(&sql)
            .bind(id)
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_address(&self, customer_id: Uuid, req: &AddressRequest) -> RepoResult<Address> {
        let mut tx = self.pool.begin().await?;
        if !Self::lock_customer(&mut tx, customer_id).await? {
            return Err(RepositoryError::NotFound);
        }

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM addresses WHERE customer_id = $1")
                .bind(customer_id)
                .fetch_one(&mut *tx)
                .await?;
        let make_default = req.is_default || existing == 0;

        if make_default {
            sqlx::query(
                "UPDATE addresses SET is_default = false WHERE customer_id = $1 AND is_default",
            )
            .bind(customer_id)
            .execute(&mut *tx)
            .await?;
        }

        let sql = format!(
            "INSERT INTO addresses \
             (id, customer_id, label, line1, line2, city, postal_code, is_default, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW()) RETURNING {ADDRESS_COLUMNS}"
        );
        let address = sqlx::query_as::<_, Address>(&sql)
            .bind(Uuid::new_v4())
            .bind(customer_id)
            .bind(&req.label)
            .bind(&req.line1)
            .bind(&req.line2)
            .bind(&req.city)
            .bind(&req.postal_code)
            .bind(make_default)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(address)
    }

    async fn update_address(
        &self,
        customer_id: Uuid,
        id: Uuid,
        req: &UpdateAddressRequest,
    ) -> RepoResult<Option<Address>> {
        let sql = format!(
            "UPDATE addresses \
             SET label = COALESCE($3, label), \
                 line1 = COALESCE($4, line1), \
                 line2 = CASE WHEN $5::text IS NULL THEN line2 ELSE NULLIF($5, '') END, \
                 city = COALESCE($6, city), \
                 postal_code = COALESCE($7, postal_code) \
             WHERE id = $1 AND customer_id = $2 RETURNING {ADDRESS_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Address>(&sql)
            .bind(id)
            .bind(customer_id)
            .bind(&req.label)
            .bind(&req.line1)
            .bind(&req.line2)
            .bind(&req.city)
            .bind(&req.postal_code)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_address(&self, customer_id: Uuid, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND customer_id = $2")
            .bind(id)
            .bind(customer_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// set_default_address
    ///
    /// Lock, verify ownership, clear, set: all inside one transaction. Dropping the
    /// transaction on the NotFound path rolls it back, leaving every row untouched.
    async fn set_default_address(&self, customer_id: Uuid, id: Uuid) -> RepoResult<Address> {
        let mut tx = self.pool.begin().await?;
        if !Self::lock_customer(&mut tx, customer_id).await? {
            return Err(RepositoryError::NotFound);
        }

        let owned: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM addresses WHERE id = $1 AND customer_id = $2")
                .bind(id)
                .bind(customer_id)
                .fetch_optional(&mut *tx)
                .await?;
        if owned.is_none() {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("UPDATE addresses SET is_default = false WHERE customer_id = $1 AND is_default")
            .bind(customer_id)
            .execute(&mut *tx)
            .await?;

        let sql = format!(
            "UPDATE addresses SET is_default = true WHERE id = $1 RETURNING {ADDRESS_COLUMNS}"
        );
        let address = sqlx::query_as::<_, Address>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await.map_err(|e| {
            tracing::error!("set_default_address commit failed: {:?}", e);
            RepositoryError::from(e)
        })?;
        Ok(address)
    }

    // --- ORDERS ---

    async fn create_order(&self, order: NewOrder) -> RepoResult<Order> {
        let sql = format!(
            "INSERT INTO orders \
             (id, customer_id, store_id, address_id, rider_id, status, items, total_cents, notes, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, NULL, $5, $6, $7, $8, NOW(), NOW()) RETURNING {ORDER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Order>(&sql)
            .bind(Uuid::new_v4())
            .bind(order.customer_id)
            .bind(order.store_id)
            .bind(order.address_id)
            .bind(OrderStatus::Pending)
            .bind(Json(&order.items))
            .bind(order.total_cents)
            .bind(&order.notes)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_order(&self, id: Uuid) -> RepoResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        Ok(sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_orders(&self, filter: OrderFilter) -> RepoResult<Vec<Order>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        match filter {
            OrderFilter::All => {}
            OrderFilter::Customer(customer_id) => {
                builder.push(" WHERE customer_id = ");
                builder.push_bind(customer_id);
            }
            OrderFilter::Rider(rider_id) => {
                builder.push(" WHERE rider_id = ");
                builder.push_bind(rider_id);
            }
            OrderFilter::Stores(store_ids) => {
                builder.push(" WHERE store_id = ANY(");
                builder.push_bind(store_ids);
                builder.push(")");
            }
        }
        builder.push(" ORDER BY created_at DESC, id");

        Ok(builder
            .build_query_as::<Order>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> RepoResult<Option<Order>> {
        let sql = format!(
            "UPDATE orders SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $2 RETURNING {ORDER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn assign_rider(&self, id: Uuid, rider_id: Uuid) -> RepoResult<Option<Order>> {
        let sql = format!(
            "UPDATE orders SET rider_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status NOT IN ('DELIVERED', 'CANCELLED') \
             RETURNING {ORDER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(rider_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- DASHBOARD ---

    /// get_stats
    ///
    /// Compiles every dashboard counter in one call.
    async fn get_stats(&self) -> RepoResult<DashboardStats> {
        let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        let total_franchises: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM franchises")
            .fetch_one(&self.pool)
            .await?;
        let total_stores: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stores")
            .fetch_one(&self.pool)
            .await?;
        let total_orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        let orders_by_status = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM orders GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_users,
            total_franchises,
            total_stores,
            total_orders,
            orders_by_status,
        })
    }
}
