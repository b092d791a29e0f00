//! Product catalog and listing views.

pub mod loader;

use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::models::{Product, ProductId};

pub use loader::{CatalogLoader, CatalogSource};

/// Category value that selects the whole catalog.
pub const ALL_CATEGORIES: &str = "todos";

/// Ordered, read-only list of products loaded for the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Wrap products in the order they were published.
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Every product in catalog order.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether no products are loaded.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Product with the given id.
    pub fn find(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|product| product.id == id)
    }

    /// Products flagged as offers, in catalog order.
    pub fn offers(&self) -> Vec<Product> {
        self.products
            .iter()
            .filter(|product| product.oferta)
            .cloned()
            .collect()
    }

    /// Distinct categories in the order they first appear.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        for product in &self.products {
            if !categories.iter().any(|known| known == &product.categoria) {
                categories.push(product.categoria.clone());
            }
        }
        categories
    }

    /// Products whose category matches exactly, or everything for [`ALL_CATEGORIES`].
    pub fn filter_by_category(&self, category: &str) -> Vec<Product> {
        if category == ALL_CATEGORIES {
            return self.products.clone();
        }
        self.products
            .iter()
            .filter(|product| product.categoria == category)
            .cloned()
            .collect()
    }

    /// Copy of the catalog ordered by `mode`. Ties keep catalog order.
    pub fn sort_by(&self, mode: SortMode) -> Vec<Product> {
        let mut sorted = self.products.clone();
        match mode {
            SortMode::Nombre => sorted.sort_by(|a, b| compare_names(&a.nombre, &b.nombre)),
            SortMode::PrecioAsc => sorted.sort_by(|a, b| a.precio.cmp(&b.precio)),
            SortMode::PrecioDesc => sorted.sort_by(|a, b| b.precio.cmp(&a.precio)),
            SortMode::Catalog => {}
        }
        sorted
    }

    /// Products for the given listing view.
    pub fn view(&self, view: &ListingView) -> Vec<Product> {
        match view {
            ListingView::Category(category) => self.filter_by_category(category),
            ListingView::Sorted(mode) => self.sort_by(*mode),
        }
    }
}

/// Listing order selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Unrecognised selector; keeps catalog order.
    #[default]
    Catalog,
    /// Alphabetical by name.
    Nombre,
    /// Cheapest first.
    PrecioAsc,
    /// Most expensive first.
    PrecioDesc,
}

impl SortMode {
    /// Selector name as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Catalog => "catalogo",
            Self::Nombre => "nombre",
            Self::PrecioAsc => "precio-asc",
            Self::PrecioDesc => "precio-desc",
        }
    }

    /// Next selector in the cycle used by the UI.
    pub fn next(self) -> Self {
        match self {
            Self::Catalog => Self::Nombre,
            Self::Nombre => Self::PrecioAsc,
            Self::PrecioAsc => Self::PrecioDesc,
            Self::PrecioDesc => Self::Catalog,
        }
    }
}

impl FromStr for SortMode {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "nombre" => Self::Nombre,
            "precio-asc" => Self::PrecioAsc,
            "precio-desc" => Self::PrecioDesc,
            _ => Self::Catalog,
        })
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the product listing currently shows. Filtering and sorting replace
/// each other: the last one applied wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingView {
    /// Products of one category, or all of them for [`ALL_CATEGORIES`].
    Category(String),
    /// The whole catalog in the given order.
    Sorted(SortMode),
}

impl Default for ListingView {
    fn default() -> Self {
        Self::Category(ALL_CATEGORIES.to_string())
    }
}

impl fmt::Display for ListingView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Category(category) => write!(f, "categoría: {category}"),
            Self::Sorted(mode) => write!(f, "orden: {mode}"),
        }
    }
}

/// Name ordering that ignores case and accents first, falling back to the raw
/// text so the comparison stays total.
fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

fn collation_key(value: &str) -> String {
    value
        .chars()
        .flat_map(char::to_lowercase)
        .map(|ch| match ch {
            'á' | 'à' | 'â' | 'ä' | 'ã' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn product(id: ProductId, nombre: &str, cents: i64, categoria: &str) -> Product {
        Product {
            id,
            nombre: nombre.to_string(),
            precio: Decimal::new(cents, 2),
            imagen: String::new(),
            categoria: categoria.to_string(),
            oferta: id % 2 == 0,
        }
    }

    fn sample() -> Catalog {
        Catalog::new(vec![
            product(1, "zapatillas", 4999, "ropa"),
            product(2, "Árbol", 1500, "hogar"),
            product(3, "camiseta", 1500, "ropa"),
        ])
    }

    fn ids(products: &[Product]) -> Vec<ProductId> {
        products.iter().map(|product| product.id).collect()
    }

    #[test]
    fn todos_returns_whole_catalog_in_order() {
        let catalog = sample();
        assert_eq!(ids(&catalog.filter_by_category(ALL_CATEGORIES)), vec![1, 2, 3]);
    }

    #[test]
    fn category_filter_is_exact() {
        let catalog = sample();
        assert_eq!(ids(&catalog.filter_by_category("ropa")), vec![1, 3]);
        assert!(catalog.filter_by_category("Ropa").is_empty());
        assert!(catalog.filter_by_category("rop").is_empty());
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn sorts_by_name_ignoring_accents_and_case() {
        let catalog = sample();
        assert_eq!(ids(&catalog.sort_by(SortMode::Nombre)), vec![2, 3, 1]);
    }

    #[test]
    fn price_sorts_are_stable() {
        let catalog = sample();
        assert_eq!(ids(&catalog.sort_by(SortMode::PrecioAsc)), vec![2, 3, 1]);
        assert_eq!(ids(&catalog.sort_by(SortMode::PrecioDesc)), vec![1, 2, 3]);
    }

    #[test]
    fn unknown_sort_mode_keeps_catalog_order() {
        let catalog = sample();
        let mode: SortMode = "relevancia".parse().unwrap_or_default();
        assert_eq!(mode, SortMode::Catalog);
        assert_eq!(ids(&catalog.sort_by(mode)), vec![1, 2, 3]);
    }

    #[test]
    fn categories_and_offers() {
        let catalog = sample();
        assert_eq!(catalog.categories(), vec!["ropa".to_string(), "hogar".to_string()]);
        assert_eq!(ids(&catalog.offers()), vec![2]);
    }
}
