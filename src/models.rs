use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::roles::Role;

// --- Core Records (Mapped to Database) ---

/// User
///
/// The account row from the `users` table. Carries the password digest, so it is never
/// serialized directly; handlers answer with [`UserProfile`] instead.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub password_hash: String,
    // Stored as text; parsed into `Role` at the authorization boundary.
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// Franchise
///
/// A franchise groups stores and is owned by one FRANCHISE_ADMIN user.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Franchise {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Store
///
/// A physical store inside a franchise, optionally run by one STORE_ADMIN user.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Store {
    pub id: Uuid,
    pub franchise_id: Uuid,
    pub name: String,
    pub address: String,
    pub admin_id: Option<Uuid>,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Address
///
/// A customer's pickup/delivery address. At most one per customer has `is_default` set.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Address {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub label: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub is_default: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Catalog ---

/// ServiceKind
///
/// The laundry services a customer can order, each priced per unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ServiceKind {
    WashAndFold,
    WashAndIron,
    DryClean,
    Ironing,
    Bedding,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 5] = [
        ServiceKind::WashAndFold,
        ServiceKind::WashAndIron,
        ServiceKind::DryClean,
        ServiceKind::Ironing,
        ServiceKind::Bedding,
    ];

    pub fn unit_price_cents(self) -> i64 {
        match self {
            ServiceKind::WashAndFold => 500,
            ServiceKind::WashAndIron => 800,
            ServiceKind::DryClean => 1200,
            ServiceKind::Ironing => 300,
            ServiceKind::Bedding => 1500,
        }
    }
}

/// One catalog entry as shown to clients (GET /services).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ServiceOffering {
    pub service: ServiceKind,
    pub unit_price_cents: i64,
}

// --- Orders ---

pub const MAX_ITEM_QUANTITY: u32 = 100;

/// OrderStatus
///
/// Lifecycle of a laundry order. Stored as the Postgres enum `order_status`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    PickedUp,
    Processing,
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::PickedUp,
        OrderStatus::Processing,
        OrderStatus::Ready,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Statuses a rider is allowed to set on an assigned order.
    pub const RIDER_SETTABLE: [OrderStatus; 3] = [
        OrderStatus::PickedUp,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::PickedUp => "PICKED_UP",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Ready => "READY",
            OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Valid edges of the lifecycle. Orders move forward one step at a time, and can
    /// only be cancelled before pickup.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, PickedUp)
                | (PickedUp, Processing)
                | (Processing, Ready)
                | (Ready, OutForDelivery)
                | (OutForDelivery, Delivered)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct OrderItem {
    pub service: ServiceKind,
    pub quantity: u32,
}

/// Order
///
/// A customer's laundry order placed at one store. Items are stored as JSONB.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub store_id: Uuid,
    pub address_id: Uuid,
    pub rider_id: Option<Uuid>,
    pub status: OrderStatus,
    #[sqlx(json)]
    pub items: Vec<OrderItem>,
    pub total_cents: i64,
    pub notes: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a new order; the total is computed by the handler.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: Uuid,
    pub store_id: Uuid,
    pub address_id: Uuid,
    pub items: Vec<OrderItem>,
    pub total_cents: i64,
    pub notes: Option<String>,
}

/// Sum of unit prices times quantities.
pub fn order_total_cents(items: &[OrderItem]) -> i64 {
    items
        .iter()
        .map(|item| item.service.unit_price_cents() * i64::from(item.quantity))
        .sum()
}

// --- Request Payloads (Input Schemas) ---

/// Public signup (POST /auth/signup). New accounts are always CUSTOMER.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    /// Same token as the `session` cookie, for clients that prefer a Bearer header.
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddressRequest {
    pub label: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Partial update; the default flag is only changed through the dedicated endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateAddressRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line1: Option<String>,
    /// An empty string clears the line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateOrderRequest {
    pub store_id: Uuid,
    pub address_id: Uuid,
    pub items: Vec<OrderItem>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AssignRiderRequest {
    pub rider_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateFranchiseRequest {
    pub name: String,
    pub owner_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateFranchiseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateStoreRequest {
    pub franchise_id: Uuid,
    pub name: String,
    pub address: String,
    pub admin_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateStoreRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateUserRoleRequest {
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateUserActiveRequest {
    pub is_active: bool,
}

// --- Dashboard & Profile Schemas (Output) ---

/// UserProfile
///
/// The public view of an account. `role` is the raw stored value so that a row with an
/// unrecognized role is still reported faithfully to super admins.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: String,
    pub is_active: bool,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            phone: user.phone,
            role: user.role,
            is_active: user.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// DashboardStats
///
/// Output schema for the super admin dashboard (GET /admin/super/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_franchises: i64,
    pub total_stores: i64,
    pub total_orders: i64,
    pub orders_by_status: Vec<StatusCount>,
}

/// WalletSummary
///
/// Wallet and loyalty are stubs: there is no payment integration, so the balance is always
/// zero and points are derived from delivered orders.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct WalletSummary {
    pub balance_cents: i64,
    pub loyalty_points: i64,
}

/// One loyalty point per whole currency unit spent on delivered orders.
pub fn loyalty_points(orders: &[Order]) -> i64 {
    orders
        .iter()
        .filter(|order| order.status == OrderStatus::Delivered)
        .map(|order| order.total_cents)
        .sum::<i64>()
        / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_moves_forward_one_step() {
        use OrderStatus::*;
        let happy_path = [Pending, Confirmed, PickedUp, Processing, Ready, OutForDelivery, Delivered];
        for pair in happy_path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
            assert!(!pair[1].can_transition_to(pair[0]), "{:?} -> {:?}", pair[1], pair[0]);
        }
        assert!(!Pending.can_transition_to(Processing));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn cancellation_only_before_pickup() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        for status in [PickedUp, Processing, Ready, OutForDelivery, Delivered, Cancelled] {
            assert!(!status.can_transition_to(Cancelled), "{status:?}");
        }
    }

    #[test]
    fn terminal_statuses_have_no_exits() {
        for from in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            assert!(from.is_terminal());
            assert!(OrderStatus::ALL.iter().all(|to| !from.can_transition_to(*to)));
        }
    }

    #[test]
    fn totals_use_catalog_prices() {
        let items = vec![
            OrderItem { service: ServiceKind::WashAndFold, quantity: 3 },
            OrderItem { service: ServiceKind::DryClean, quantity: 1 },
        ];
        assert_eq!(order_total_cents(&items), 3 * 500 + 1200);
    }

    #[test]
    fn order_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"OUT_FOR_DELIVERY\"");
    }
}
