// storefront/src/models/mod.rs

//! Data structures representing database rows.

pub mod affiliate;
pub mod employee;
pub mod notification;
pub mod order;
pub mod order_item;
pub mod push_subscription;
pub mod store;
pub mod status_config;

pub use affiliate::{AffiliateEarning, EarningStatus, NewAffiliateEarning, StoreAffiliate};
pub use employee::{PermissionSet, StoreEmployee};
pub use notification::{NewNotification, NotificationKind, OutboxEntry};
pub use order::{DeliveryType, Order, OrderSnapshot, OrderStatus};
pub use order_item::{ItemAddon, OrderItem};
pub use push_subscription::{NewPushSubscription, PushSubscription};
pub use status_config::OrderStatusConfig;
pub use store::Store;
