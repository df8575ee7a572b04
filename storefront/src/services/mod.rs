// storefront/src/services/mod.rs

pub mod authorization;
pub mod commission;
pub mod message_template;
pub mod notification_dispatcher;
pub mod phone;
pub mod status_normalizer;
pub mod web_push;
pub mod whatsapp;
