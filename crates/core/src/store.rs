//! Storefront session: the single owner of catalog and cart state.

use tracing::{debug, info, warn};

use crate::{
    cart::{Cart, CartTotals},
    catalog::{Catalog, ListingView, SortMode},
    checkout::{CheckoutGateway, CheckoutPayload},
    error::Result,
    models::{Product, ProductId},
    notice::Notice,
    save::CartSlot,
};

const EMPTY_CART_NOTICE: &str = "El carrito está vacío";
const CHECKOUT_OK_NOTICE: &str = "Compra realizada con éxito";
const CHECKOUT_FAILED_NOTICE: &str =
    "Error al procesar la compra. Por favor, intenta de nuevo más tarde.";
const CATALOG_FAILED_NOTICE: &str =
    "Error al cargar los productos. Por favor, intenta de nuevo más tarde.";
const PERSIST_FAILED_NOTICE: &str = "No se pudo guardar el carrito.";

/// Catalog, cart and listing state for one storefront session.
///
/// Every cart mutation is written to the persisted slot before the call
/// returns. Operations that need to tell the user something return a
/// [`Notice`]; no-ops return `None`.
#[derive(Debug)]
pub struct Storefront {
    catalog: Catalog,
    cart: Cart,
    slot: CartSlot,
    view: ListingView,
    checkout_pending: bool,
}

impl Storefront {
    /// Empty session backed by `slot`. Call [`Storefront::restore`] to rehydrate the cart.
    pub fn new(slot: CartSlot) -> Self {
        Self {
            catalog: Catalog::default(),
            cart: Cart::new(),
            slot,
            view: ListingView::default(),
            checkout_pending: false,
        }
    }

    /// Session with the persisted cart already restored.
    pub fn open(slot: CartSlot) -> Self {
        let mut store = Self::new(slot);
        store.restore();
        store
    }

    /// Currently installed catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Current cart.
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Slot the cart is persisted to.
    pub fn slot(&self) -> &CartSlot {
        &self.slot
    }

    /// Listing view applied last.
    pub fn view(&self) -> &ListingView {
        &self.view
    }

    /// Whether a checkout has begun and not finished yet.
    pub fn checkout_pending(&self) -> bool {
        self.checkout_pending
    }

    /// Replace the cart with whatever the persisted slot holds.
    pub fn restore(&mut self) {
        self.cart = self.slot.restore();
        info!(lines = self.cart.len(), "Cart restored");
    }

    /// Drop all session state and return to the freshly constructed shape.
    /// The persisted slot is left untouched.
    pub fn reset(&mut self) {
        self.catalog = Catalog::default();
        self.cart = Cart::new();
        self.view = ListingView::default();
        self.checkout_pending = false;
    }

    /// Install a freshly loaded catalog, replacing the previous one wholesale.
    pub fn set_catalog(&mut self, catalog: Catalog) {
        info!(products = catalog.len(), "Catalog installed");
        self.catalog = catalog;
    }

    /// Apply the outcome of a catalog load. Failures keep the current catalog.
    pub fn apply_catalog_result(&mut self, result: Result<Catalog>) -> Option<Notice> {
        match result {
            Ok(catalog) => {
                self.set_catalog(catalog);
                None
            }
            Err(err) => {
                warn!(%err, "Keeping previous catalog");
                Some(Notice::error(CATALOG_FAILED_NOTICE))
            }
        }
    }

    /// Add one unit of `id`. Unknown ids are ignored.
    pub fn add_item(&mut self, id: ProductId) -> Option<Notice> {
        let product = self.catalog.find(id)?.clone();
        let change = self.cart.add(&product);
        debug!(id, ?change, "Cart add");
        let notice = Notice::success(format!("{} añadido al carrito", change.nombre()));
        Some(self.persist_then(notice))
    }

    /// Remove one unit of `id`. Ids not in the cart are ignored.
    pub fn remove_item(&mut self, id: ProductId) -> Option<Notice> {
        let change = self.cart.remove(id)?;
        debug!(id, ?change, "Cart remove");
        let notice = Notice::info(format!("{} eliminado del carrito", change.nombre()));
        Some(self.persist_then(notice))
    }

    /// Totals for the current cart.
    pub fn totals(&self) -> CartTotals {
        self.cart.totals()
    }

    /// Write the cart to the persisted slot.
    pub fn persist(&self) -> Result<()> {
        self.slot.persist(&self.cart).map_err(|err| {
            warn!(path = %self.slot.path().display(), %err, "Failed to persist cart");
            err
        })
    }

    /// Persist, then return `notice`, turned into an error notice if the write failed.
    fn persist_then(&self, notice: Notice) -> Notice {
        match self.persist() {
            Ok(()) => notice,
            Err(_) => Notice::error(format!("{}. {PERSIST_FAILED_NOTICE}", notice.message)),
        }
    }

    /// Show one category (or [`crate::catalog::ALL_CATEGORIES`]). Replaces any sort.
    pub fn filter_by_category(&mut self, category: impl Into<String>) -> Vec<Product> {
        self.view = ListingView::Category(category.into());
        self.listing()
    }

    /// Order the whole catalog. Replaces any category filter.
    pub fn sort_by(&mut self, mode: SortMode) -> Vec<Product> {
        self.view = ListingView::Sorted(mode);
        self.listing()
    }

    /// Products for the current listing view.
    pub fn listing(&self) -> Vec<Product> {
        self.catalog.view(&self.view)
    }

    /// Products flagged as offers, in catalog order.
    pub fn offers(&self) -> Vec<Product> {
        self.catalog.offers()
    }

    /// First half of a checkout: snapshot the cart for submission.
    ///
    /// Returns `Err(notice)` when there is nothing to submit or a checkout is
    /// already running; no request must be sent in that case.
    pub fn begin_checkout(&mut self) -> std::result::Result<CheckoutPayload, Notice> {
        if self.cart.is_empty() {
            return Err(Notice::info(EMPTY_CART_NOTICE));
        }
        if self.checkout_pending {
            return Err(Notice::info("La compra ya se está procesando"));
        }
        let payload = CheckoutPayload::from_lines(self.cart.lines()).map_err(|err| {
            warn!(%err, "Failed to build checkout payload");
            Notice::error(CHECKOUT_FAILED_NOTICE)
        })?;
        self.checkout_pending = true;
        Ok(payload)
    }

    /// Second half of a checkout: clear the cart on success, keep it otherwise.
    pub fn finish_checkout(&mut self, result: Result<()>) -> Notice {
        self.checkout_pending = false;
        match result {
            Ok(()) => {
                info!(lines = self.cart.len(), "Checkout completed");
                self.cart.clear();
                self.persist_then(Notice::success(CHECKOUT_OK_NOTICE))
            }
            Err(err) => {
                warn!(%err, "Checkout failed; cart kept");
                Notice::error(CHECKOUT_FAILED_NOTICE)
            }
        }
    }

    /// Run a full checkout through `gateway`.
    pub async fn checkout<G>(&mut self, gateway: &G) -> Notice
    where
        G: CheckoutGateway + ?Sized,
    {
        let payload = match self.begin_checkout() {
            Ok(payload) => payload,
            Err(notice) => return notice,
        };
        let result = gateway.submit(&payload).await;
        self.finish_checkout(result)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::{
        catalog::ALL_CATEGORIES, checkout::InMemoryCheckout, error::StoreError,
        notice::NoticeLevel,
    };

    fn product(id: ProductId, nombre: &str, cents: i64, categoria: &str) -> Product {
        Product {
            id,
            nombre: nombre.to_string(),
            precio: Decimal::new(cents, 2),
            imagen: format!("img/{id}.jpg"),
            categoria: categoria.to_string(),
            oferta: false,
        }
    }

    fn store_with(products: Vec<Product>) -> anyhow::Result<(TempDir, Storefront)> {
        let dir = tempdir()?;
        let mut store = Storefront::open(CartSlot::new(dir.path()));
        store.set_catalog(Catalog::new(products));
        Ok((dir, store))
    }

    #[test]
    fn scenario_add_add_remove() -> anyhow::Result<()> {
        let (_dir, mut store) = store_with(vec![product(1, "A", 1000, "x")])?;
        store.add_item(1);
        store.add_item(1);
        let notice = store.remove_item(1).expect("line exists");
        assert_eq!(notice.message, "A eliminado del carrito");

        assert_eq!(store.cart().len(), 1);
        assert_eq!(store.cart().lines()[0].cantidad, 1);
        let totals = store.totals();
        assert_eq!(totals.subtotal.round_dp(2), Decimal::new(1000, 2));
        assert_eq!(totals.iva.round_dp(2), Decimal::new(210, 2));
        assert_eq!(totals.total.round_dp(2), Decimal::new(1210, 2));
        Ok(())
    }

    #[test]
    fn unknown_ids_are_ignored() -> anyhow::Result<()> {
        let (_dir, mut store) = store_with(vec![product(1, "A", 1000, "x")])?;
        assert!(store.add_item(99).is_none());
        assert!(store.remove_item(1).is_none());
        assert!(store.cart().is_empty());
        assert!(!store.slot().path().exists());
        Ok(())
    }

    #[test]
    fn cart_line_is_a_snapshot() -> anyhow::Result<()> {
        let (_dir, mut store) = store_with(vec![product(1, "A", 1000, "x")])?;
        store.add_item(1);
        store.set_catalog(Catalog::new(vec![product(1, "A v2", 2000, "x")]));

        let line = &store.cart().lines()[0];
        assert_eq!(line.nombre, "A");
        assert_eq!(line.precio, Decimal::new(1000, 2));
        store.add_item(1);
        assert_eq!(store.cart().lines()[0].cantidad, 2);
        Ok(())
    }

    #[test]
    fn every_mutation_is_persisted() -> anyhow::Result<()> {
        let (dir, mut store) = store_with(vec![
            product(1, "A", 1000, "x"),
            product(2, "B", 250, "y"),
        ])?;
        store.add_item(2);
        store.add_item(1);
        store.add_item(2);
        store.remove_item(1);

        let reopened = Storefront::open(CartSlot::new(dir.path()));
        assert_eq!(reopened.cart(), store.cart());
        assert_eq!(reopened.totals().item_count, 2);
        Ok(())
    }

    #[test]
    fn unwritable_slot_turns_confirmation_into_error() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory")?;
        let mut store = Storefront::open(CartSlot::new(&blocker));
        store.set_catalog(Catalog::new(vec![product(1, "A", 1000, "x")]));

        let notice = store.add_item(1).expect("known id");
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.message.starts_with("A añadido al carrito"));
        assert!(notice.message.ends_with(PERSIST_FAILED_NOTICE));
        assert_eq!(store.cart().len(), 1);
        assert!(store.persist().is_err());
        Ok(())
    }

    #[test]
    fn filter_and_sort_replace_each_other() -> anyhow::Result<()> {
        let (_dir, mut store) = store_with(vec![
            product(1, "c", 300, "x"),
            product(2, "a", 100, "y"),
            product(3, "b", 200, "x"),
        ])?;

        let filtered = store.filter_by_category("x");
        assert_eq!(filtered.len(), 2);

        let sorted = store.sort_by(SortMode::PrecioAsc);
        let ids: Vec<ProductId> = sorted.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(store.view(), &ListingView::Sorted(SortMode::PrecioAsc));

        let all = store.filter_by_category(ALL_CATEGORIES);
        let ids: Vec<ProductId> = all.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn failed_catalog_load_keeps_previous_catalog() -> anyhow::Result<()> {
        let (_dir, mut store) = store_with(vec![product(1, "A", 1000, "x")])?;
        let notice = store
            .apply_catalog_result(Err(StoreError::CatalogLoad {
                source_name: "productos.json".to_string(),
                reason: "boom".to_string(),
            }))
            .expect("failure notice");
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(store.catalog().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn checkout_on_empty_cart_sends_nothing() -> anyhow::Result<()> {
        let (_dir, mut store) = store_with(vec![product(1, "A", 1000, "x")])?;
        let gateway = InMemoryCheckout::new();

        let notice = store.checkout(&gateway).await;
        assert_eq!(notice.message, EMPTY_CART_NOTICE);
        assert_eq!(gateway.submission_count(), 0);
        assert!(store.cart().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn successful_checkout_clears_and_persists() -> anyhow::Result<()> {
        let (dir, mut store) = store_with(vec![product(1, "A", 1000, "x")])?;
        store.add_item(1);
        store.add_item(1);
        let gateway = InMemoryCheckout::new();

        let notice = store.checkout(&gateway).await;
        assert_eq!(notice.level, NoticeLevel::Success);
        assert!(store.cart().is_empty());

        let submitted = gateway.submissions();
        assert_eq!(submitted.len(), 1);
        let lines = submitted[0].lines()?;
        assert_eq!(lines[0].cantidad, 2);

        let reopened = Storefront::open(CartSlot::new(dir.path()));
        assert!(reopened.cart().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn failed_checkout_keeps_cart() -> anyhow::Result<()> {
        let (_dir, mut store) = store_with(vec![product(1, "A", 1000, "x")])?;
        store.add_item(1);
        let gateway = InMemoryCheckout::new();
        gateway.fail_with("500 Internal Server Error");

        let notice = store.checkout(&gateway).await;
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(store.cart().len(), 1);
        assert!(!store.checkout_pending());
        Ok(())
    }

    #[test]
    fn only_one_checkout_in_flight() -> anyhow::Result<()> {
        let (_dir, mut store) = store_with(vec![product(1, "A", 1000, "x")])?;
        store.add_item(1);
        assert!(store.begin_checkout().is_ok());
        assert!(store.begin_checkout().is_err());
        store.finish_checkout(Ok(()));
        assert!(store.cart().is_empty());
        Ok(())
    }

    #[test]
    fn reset_clears_session_but_not_slot() -> anyhow::Result<()> {
        let (_dir, mut store) = store_with(vec![product(1, "A", 1000, "x")])?;
        store.add_item(1);
        store.reset();
        assert!(store.cart().is_empty());
        assert!(store.catalog().is_empty());

        store.restore();
        assert_eq!(store.cart().len(), 1);
        Ok(())
    }
}
