//! Shared domain models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product identifier as published in the catalog.
pub type ProductId = u64;

/// Share of the list price a customer pays for an offer (20% off).
const OFFER_FACTOR: Decimal = Decimal::from_parts(8, 0, 0, false, 1);

/// A purchasable item as published in the catalog document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier.
    pub id: ProductId,
    /// Display name.
    pub nombre: String,
    /// List price.
    pub precio: Decimal,
    /// Image URL.
    #[serde(default)]
    pub imagen: String,
    /// Category tag used by the listing filter.
    pub categoria: String,
    /// Whether the product is shown in the offers listing.
    #[serde(default)]
    pub oferta: bool,
}

impl Product {
    /// Discounted price shown for offers. Never stored.
    pub fn offer_price(&self) -> Decimal {
        self.precio * OFFER_FACTOR
    }
}

/// One product's entry in the cart.
///
/// Carries a snapshot of the product fields taken when the line was created, so
/// later catalog reloads never change what is already in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product id; unique within a cart.
    pub id: ProductId,
    /// Product name when the line was created.
    pub nombre: String,
    /// Unit price when the line was created.
    pub precio: Decimal,
    /// Image URL.
    #[serde(default)]
    pub imagen: String,
    /// Product category.
    #[serde(default)]
    pub categoria: String,
    /// Offer flag when the line was created.
    #[serde(default)]
    pub oferta: bool,
    /// Units of the product in the cart, always at least one.
    pub cantidad: u32,
}

impl CartLine {
    /// Start a new line holding a single unit of `product`.
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: product.id,
            nombre: product.nombre.clone(),
            precio: product.precio,
            imagen: product.imagen.clone(),
            categoria: product.categoria.clone(),
            oferta: product.oferta,
            cantidad: 1,
        }
    }

    /// Price of the whole line.
    pub fn line_total(&self) -> Decimal {
        self.precio * Decimal::from(self.cantidad)
    }
}
