#![warn(clippy::all, missing_docs)]

//! Core domain logic for the Tienda storefront.
//!
//! This crate hosts the catalog and cart models, the cart engine,
//! persistence of the cart slot, the checkout client and the
//! [`Storefront`] session that owns all mutable state. Front ends
//! drive the session and render what it exposes.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod models;
pub mod notice;
pub mod save;
pub mod store;

#[cfg(test)]
mod test_support;

pub use cart::{Cart, CartChange, CartTotals, IVA_RATE};
pub use catalog::{Catalog, CatalogLoader, CatalogSource, ListingView, SortMode, ALL_CATEGORIES};
pub use checkout::{CheckoutGateway, CheckoutPayload, HttpCheckout, InMemoryCheckout};
pub use crate::config::AppConfig;
pub use error::{Result, StoreError};
pub use models::{CartLine, Product, ProductId};
pub use notice::{Notice, NoticeLevel};
pub use save::CartSlot;
pub use store::Storefront;
