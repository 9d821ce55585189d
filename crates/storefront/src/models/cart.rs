//! Cart domain types.

use enf_core::CartId;
use enf_core::cart::{Cart, CartLine};
use enf_core::types::{Price, PriceError};

/// A cart line joined with what the cart page displays.
#[derive(Debug, Clone)]
pub struct CartItemDetail {
    /// The line itself, priced at the product's current price.
    pub line: CartLine,
    pub product_name: String,
    pub product_slug: String,
    pub size_name: String,
    pub main_image: Option<String>,
}

/// The current contents of a session cart.
#[derive(Debug, Clone, Default)]
pub struct CartContents {
    /// Stored cart id; `None` for a session without a cart yet.
    pub id: Option<CartId>,
    pub items: Vec<CartItemDetail>,
}

impl CartContents {
    /// The cart aggregate over these lines.
    #[must_use]
    pub fn aggregate(&self) -> Cart {
        let lines = self.items.iter().map(|item| item.line.clone()).collect();
        self.id
            .map_or_else(Cart::empty, |id| Cart::new(id, lines))
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of line quantities.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.line.quantity))
            .sum()
    }

    /// Sum of line totals at current prices.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::TooLarge` when the total does not fit a price.
    pub fn subtotal(&self) -> Result<Price, PriceError> {
        self.items
            .iter()
            .try_fold(Price::ZERO, |total, item| {
                total.checked_add(item.line.total_price()?)
            })
    }
}
