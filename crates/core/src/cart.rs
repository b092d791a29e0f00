//! Cart state transitions and derived totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{CartLine, Product, ProductId};

/// Fixed IVA rate applied to the subtotal (21%).
pub const IVA_RATE: Decimal = Decimal::from_parts(21, 0, 0, false, 2);

/// Outcome of a cart mutation, carrying the name of the affected product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    /// A new line was appended.
    Added {
        /// Product name.
        nombre: String,
    },
    /// An existing line gained one unit.
    Incremented {
        /// Product name.
        nombre: String,
        /// Units after the change.
        cantidad: u32,
    },
    /// An existing line lost one unit.
    Decremented {
        /// Product name.
        nombre: String,
        /// Units left in the line.
        cantidad: u32,
    },
    /// The last unit was removed together with its line.
    Removed {
        /// Product name.
        nombre: String,
    },
}

impl CartChange {
    /// Name of the product the change applies to.
    pub fn nombre(&self) -> &str {
        match self {
            Self::Added { nombre }
            | Self::Incremented { nombre, .. }
            | Self::Decremented { nombre, .. }
            | Self::Removed { nombre } => nombre,
        }
    }
}

/// Derived cart figures. Computed on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartTotals {
    /// Sum of `precio * cantidad` over all lines.
    pub subtotal: Decimal,
    /// `subtotal * IVA_RATE`.
    pub iva: Decimal,
    /// `subtotal + iva`.
    pub total: Decimal,
    /// Units across all lines.
    pub item_count: u64,
}

/// Ordered cart lines keyed by product id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from previously persisted lines.
    ///
    /// Lines with a zero quantity are dropped and duplicate ids are merged into
    /// the first occurrence so the one-line-per-product rule holds.
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.cantidad == 0 {
                continue;
            }
            match cart.lines.iter_mut().find(|existing| existing.id == line.id) {
                Some(existing) => existing.cantidad = existing.cantidad.saturating_add(line.cantidad),
                None => cart.lines.push(line),
            }
        }
        cart
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of lines (distinct products), not units.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Line for `id`, if the product is in the cart.
    pub fn line(&self, id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == id)
    }

    /// Add one unit of `product`, appending a snapshot line if none exists yet.
    pub fn add(&mut self, product: &Product) -> CartChange {
        if let Some(line) = self.lines.iter_mut().find(|line| line.id == product.id) {
            line.cantidad = line.cantidad.saturating_add(1);
            return CartChange::Incremented {
                nombre: line.nombre.clone(),
                cantidad: line.cantidad,
            };
        }
        self.lines.push(CartLine::from_product(product));
        CartChange::Added {
            nombre: product.nombre.clone(),
        }
    }

    /// Remove one unit of `id`. Returns `None` when the cart holds no such line.
    pub fn remove(&mut self, id: ProductId) -> Option<CartChange> {
        let index = self.lines.iter().position(|line| line.id == id)?;
        let line = &mut self.lines[index];
        if line.cantidad > 1 {
            line.cantidad -= 1;
            return Some(CartChange::Decremented {
                nombre: line.nombre.clone(),
                cantidad: line.cantidad,
            });
        }
        let removed = self.lines.remove(index);
        Some(CartChange::Removed {
            nombre: removed.nombre,
        })
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Subtotal, IVA, total and unit count for the current lines.
    pub fn totals(&self) -> CartTotals {
        let subtotal: Decimal = self.lines.iter().map(CartLine::line_total).sum();
        let iva = subtotal * IVA_RATE;
        CartTotals {
            subtotal,
            iva,
            total: subtotal + iva,
            item_count: self.lines.iter().map(|line| u64::from(line.cantidad)).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn product(id: ProductId, nombre: &str, cents: i64) -> Product {
        Product {
            id,
            nombre: nombre.to_string(),
            precio: Decimal::new(cents, 2),
            imagen: format!("{id}.jpg"),
            categoria: "x".to_string(),
            oferta: false,
        }
    }

    #[test]
    fn adding_twice_keeps_a_single_line() {
        let mut cart = Cart::new();
        let a = product(1, "A", 1000);
        assert_eq!(cart.add(&a), CartChange::Added { nombre: "A".into() });
        assert_eq!(
            cart.add(&a),
            CartChange::Incremented {
                nombre: "A".into(),
                cantidad: 2
            }
        );
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].cantidad, 2);
    }

    #[test]
    fn removing_last_unit_drops_the_line() {
        let mut cart = Cart::new();
        cart.add(&product(1, "A", 1000));
        cart.add(&product(2, "B", 500));
        assert_eq!(cart.len(), 2);

        assert_eq!(cart.remove(1), Some(CartChange::Removed { nombre: "A".into() }));
        assert_eq!(cart.len(), 1);
        assert!(cart.line(1).is_none());
        assert_eq!(cart.remove(1), None);
    }

    #[test]
    fn add_add_remove_scenario_totals() {
        let mut cart = Cart::new();
        let a = product(1, "A", 1000);
        cart.add(&a);
        cart.add(&a);
        cart.remove(1);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].cantidad, 1);
        let totals = cart.totals();
        assert_eq!(totals.subtotal, Decimal::new(1000, 2));
        assert_eq!(totals.iva, Decimal::new(210, 2));
        assert_eq!(totals.total, Decimal::new(1210, 2));
        assert_eq!(totals.item_count, 1);
    }

    #[test]
    fn item_count_tracks_net_operations() {
        let catalog = [product(1, "A", 199), product(2, "B", 250), product(3, "C", 1)];
        // (product index, is_add)
        let ops = [
            (0, true),
            (1, true),
            (0, true),
            (2, false),
            (1, false),
            (1, false),
            (2, true),
            (0, false),
            (2, true),
            (0, true),
        ];

        let mut cart = Cart::new();
        let mut expected: HashMap<ProductId, u64> = HashMap::new();
        for (index, is_add) in ops {
            let item = &catalog[index];
            if is_add {
                cart.add(item);
                *expected.entry(item.id).or_default() += 1;
            } else if cart.remove(item.id).is_some() {
                *expected.entry(item.id).or_default() -= 1;
            }
            let net: u64 = expected.values().sum();
            assert_eq!(cart.totals().item_count, net);
        }

        for line in cart.lines() {
            assert!(line.cantidad >= 1);
            assert_eq!(u64::from(line.cantidad), expected[&line.id]);
        }
    }

    #[test]
    fn total_is_subtotal_plus_iva() {
        let mut cart = Cart::new();
        cart.add(&product(1, "A", 333));
        cart.add(&product(2, "B", 1999));
        cart.add(&product(2, "B", 1999));
        let totals = cart.totals();
        assert_eq!(totals.total, totals.subtotal + totals.subtotal * IVA_RATE);
        assert_eq!(totals.total.round_dp(2), Decimal::new(5241, 2));
    }

    #[test]
    fn from_lines_merges_duplicates_and_drops_empty() {
        let mut first = CartLine::from_product(&product(1, "A", 100));
        first.cantidad = 2;
        let mut empty = CartLine::from_product(&product(2, "B", 100));
        empty.cantidad = 0;
        let dup = CartLine::from_product(&product(1, "A", 100));

        let cart = Cart::from_lines(vec![first, empty, dup]);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].cantidad, 3);
    }
}
