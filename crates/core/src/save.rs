//! Persisted cart slot.

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::{
    cart::Cart,
    error::{Result, StoreError},
    models::CartLine,
};

/// Directory under the user's data dir holding the slot.
pub const DEFAULT_DATA_DIR: &str = "tienda";

/// Name of the single persisted entry.
pub const CART_SLOT: &str = "carrito";

/// Single key-value slot holding the JSON-serialised cart lines.
#[derive(Debug, Clone)]
pub struct CartSlot {
    path: PathBuf,
}

impl CartSlot {
    /// Slot stored as `<root>/carrito.json`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            path: root.as_ref().join(format!("{CART_SLOT}.json")),
        }
    }

    /// Default location under the user's data directory.
    pub fn default_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_DATA_DIR)
    }

    /// File backing the slot.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the slot with the given cart.
    ///
    /// Writes go through a temporary file in the same directory and are renamed
    /// into place, so readers never observe a half-written slot.
    pub fn persist(&self, cart: &Cart) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let serialised =
            serde_json::to_vec(cart.lines()).map_err(|err| StoreError::Io(err.into()))?;
        let mut staged = NamedTempFile::new_in(parent)?;
        staged.write_all(&serialised)?;
        staged.flush()?;
        staged
            .persist(&self.path)
            .map_err(|err| StoreError::Io(err.error))?;
        debug!(path = %self.path.display(), lines = cart.len(), "Cart persisted");
        Ok(())
    }

    /// Read the slot, distinguishing an absent slot (`Ok(None)`) from a corrupt one.
    pub fn load(&self) -> Result<Option<Cart>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        let lines: Vec<CartLine> =
            serde_json::from_str(&content).map_err(StoreError::MalformedPersistedState)?;
        Ok(Some(Cart::from_lines(lines)))
    }

    /// Rehydrate the cart at startup. Anything unreadable counts as "no saved cart".
    pub fn restore(&self) -> Cart {
        match self.load() {
            Ok(Some(cart)) => cart,
            Ok(None) => Cart::new(),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "Ignoring unreadable persisted cart");
                Cart::new()
            }
        }
    }
}
