// storefront/src/lib.rs

//! Order status service for a multi-tenant delivery storefront.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod realtime;
pub mod repository;
pub mod services;
pub mod state;
pub mod web;
