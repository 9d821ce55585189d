//! The cart aggregate.
//!
//! A [`Cart`] holds the materialized lines of one session's cart. Every
//! mutating operation updates the in-memory lines and returns the
//! [`LineChange`] the storage layer has to persist; lines are identified for
//! persistence by their [`LineKey`], which is unique per cart.

use serde::{Deserialize, Serialize};

use crate::types::{CartId, CartItemId, Price, PriceError, ProductId, ProductSizeId};

/// Largest quantity a single line may hold (the column is a 32-bit integer).
pub const MAX_LINE_QUANTITY: u32 = 2_147_483_647;

/// Errors from cart operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Adding zero items is meaningless.
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    /// The merged quantity does not fit a line.
    #[error("quantity cannot exceed {max}")]
    QuantityOverflow {
        /// Largest allowed quantity.
        max: u32,
    },
}

/// Identity of a cart line within its cart: one line per (product, size).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    /// Product on the line.
    pub product_id: ProductId,
    /// Size variant (product/size pair) on the line.
    pub product_size_id: ProductSizeId,
}

impl LineKey {
    /// Build a key.
    #[must_use]
    pub const fn new(product_id: ProductId, product_size_id: ProductSizeId) -> Self {
        Self {
            product_id,
            product_size_id,
        }
    }
}

/// One cart line with the product's current unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Stored row id; `None` until the line has been persisted.
    pub id: Option<CartItemId>,
    /// Product and size.
    pub key: LineKey,
    /// Always at least 1.
    pub quantity: u32,
    /// Live unit price of the product (not a snapshot).
    pub unit_price: Price,
}

impl CartLine {
    /// Quantity times the current unit price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::TooLarge` when the line total does not fit a price.
    pub fn total_price(&self) -> Result<Price, PriceError> {
        self.unit_price.line_total(self.quantity)
    }
}

/// A change to persist after a cart operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineChange {
    /// A new line was created.
    Inserted {
        /// Line identity.
        key: LineKey,
        /// Initial quantity.
        quantity: u32,
    },
    /// An existing line now holds `quantity`.
    QuantitySet {
        /// Line identity.
        key: LineKey,
        /// New quantity.
        quantity: u32,
    },
    /// A line was deleted.
    Removed {
        /// Line identity.
        key: LineKey,
    },
    /// Every line was deleted.
    Cleared,
}

/// The lines of one cart.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cart {
    id: Option<CartId>,
    lines: Vec<CartLine>,
}

impl Cart {
    /// Wrap lines loaded for a stored cart.
    #[must_use]
    pub const fn new(id: CartId, lines: Vec<CartLine>) -> Self {
        Self {
            id: Some(id),
            lines,
        }
    }

    /// An empty cart that has not been stored.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            id: None,
            lines: Vec::new(),
        }
    }

    /// Stored cart id, if any.
    #[must_use]
    pub const fn id(&self) -> Option<CartId> {
        self.id
    }

    /// Current lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find the line for a product/size pair.
    #[must_use]
    pub fn line(&self, key: LineKey) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.key == key)
    }

    /// Find a line by its stored id.
    #[must_use]
    pub fn item(&self, item_id: CartItemId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == Some(item_id))
    }

    /// Add `quantity` of a product/size to the cart.
    ///
    /// If a line for the pair already exists its quantity is increased by
    /// `quantity` (merge-add); otherwise a new line is created with
    /// `unit_price` as the product's current price.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ZeroQuantity` for a zero quantity and
    /// `CartError::QuantityOverflow` if the merged quantity is too large.
    pub fn add_product(
        &mut self,
        key: LineKey,
        unit_price: Price,
        quantity: u32,
    ) -> Result<(&CartLine, LineChange), CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        let overflow = CartError::QuantityOverflow {
            max: MAX_LINE_QUANTITY,
        };

        if let Some(index) = self.lines.iter().position(|line| line.key == key) {
            let line = self.lines.get_mut(index).ok_or(CartError::ZeroQuantity)?;
            let merged = line
                .quantity
                .checked_add(quantity)
                .filter(|q| *q <= MAX_LINE_QUANTITY)
                .ok_or(overflow)?;
            line.quantity = merged;
            // Keep the live price current in case it changed since loading
            line.unit_price = unit_price;
            let change = LineChange::QuantitySet {
                key,
                quantity: merged,
            };
            return Ok((line, change));
        }

        if quantity > MAX_LINE_QUANTITY {
            return Err(overflow);
        }

        self.lines.push(CartLine {
            id: None,
            key,
            quantity,
            unit_price,
        });
        let change = LineChange::Inserted { key, quantity };
        let line = self.lines.last().ok_or(CartError::ZeroQuantity)?;
        Ok((line, change))
    }

    /// Remove a line by id.
    ///
    /// Returns `None` when no line with that id belongs to this cart.
    pub fn remove_item(&mut self, item_id: CartItemId) -> Option<LineChange> {
        let index = self.lines.iter().position(|line| line.id == Some(item_id))?;
        let line = self.lines.remove(index);
        Some(LineChange::Removed { key: line.key })
    }

    /// Set a line's quantity; zero or negative removes the line instead.
    ///
    /// Returns `None` when no line with that id belongs to this cart.
    pub fn update_item_quantity(
        &mut self,
        item_id: CartItemId,
        quantity: i64,
    ) -> Option<LineChange> {
        if quantity <= 0 {
            return self.remove_item(item_id);
        }

        let line = self.lines.iter_mut().find(|line| line.id == Some(item_id))?;
        let quantity = u32::try_from(quantity)
            .unwrap_or(MAX_LINE_QUANTITY)
            .min(MAX_LINE_QUANTITY);
        line.quantity = quantity;
        Some(LineChange::QuantitySet {
            key: line.key,
            quantity,
        })
    }

    /// Delete every line.
    pub fn clear(&mut self) -> LineChange {
        self.lines.clear();
        LineChange::Cleared
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of quantity times current unit price over all lines.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::TooLarge` when a line or the sum does not fit a
    /// price.
    pub fn subtotal(&self) -> Result<Price, PriceError> {
        self.lines
            .iter()
            .try_fold(Price::ZERO, |total, line| total.checked_add(line.total_price()?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn key(product: i64, size: i64) -> LineKey {
        LineKey::new(ProductId::new(product), ProductSizeId::new(size))
    }

    fn price(amount: rust_decimal::Decimal) -> Price {
        Price::new(amount).unwrap()
    }

    fn stored_cart() -> Cart {
        Cart::new(
            CartId::new(1),
            vec![
                CartLine {
                    id: Some(CartItemId::new(10)),
                    key: key(1, 100),
                    quantity: 2,
                    unit_price: price(dec!(1500.00)),
                },
                CartLine {
                    id: Some(CartItemId::new(11)),
                    key: key(2, 200),
                    quantity: 1,
                    unit_price: price(dec!(990.50)),
                },
            ],
        )
    }

    #[test]
    fn test_add_same_pair_twice_merges_quantities() {
        let mut cart = Cart::empty();
        let (_, first) = cart.add_product(key(1, 100), price(dec!(10)), 2).unwrap();
        assert_eq!(
            first,
            LineChange::Inserted {
                key: key(1, 100),
                quantity: 2
            }
        );

        let (line, second) = cart.add_product(key(1, 100), price(dec!(10)), 3).unwrap();
        assert_eq!(line.quantity, 5);
        assert_eq!(
            second,
            LineChange::QuantitySet {
                key: key(1, 100),
                quantity: 5
            }
        );
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_add_defaults_to_new_line_per_size() {
        let mut cart = Cart::empty();
        cart.add_product(key(1, 100), price(dec!(10)), 1).unwrap();
        cart.add_product(key(1, 101), price(dec!(10)), 1).unwrap();
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.total_items(), 2);
    }

    #[test]
    fn test_add_zero_is_rejected() {
        let mut cart = Cart::empty();
        assert_eq!(
            cart.add_product(key(1, 1), Price::ZERO, 0).unwrap_err(),
            CartError::ZeroQuantity
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_overflow_is_rejected() {
        let mut cart = Cart::empty();
        cart.add_product(key(1, 1), Price::ZERO, MAX_LINE_QUANTITY)
            .unwrap();
        let err = cart.add_product(key(1, 1), Price::ZERO, 1).unwrap_err();
        assert!(matches!(err, CartError::QuantityOverflow { .. }));
        assert_eq!(cart.line(key(1, 1)).unwrap().quantity, MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_remove_item_reports_found() {
        let mut cart = stored_cart();
        assert_eq!(
            cart.remove_item(CartItemId::new(10)),
            Some(LineChange::Removed { key: key(1, 100) })
        );
        assert_eq!(cart.remove_item(CartItemId::new(10)), None);
        assert_eq!(cart.remove_item(CartItemId::new(999)), None);
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_update_positive_sets_quantity() {
        let mut cart = stored_cart();
        let change = cart.update_item_quantity(CartItemId::new(11), 4);
        assert_eq!(
            change,
            Some(LineChange::QuantitySet {
                key: key(2, 200),
                quantity: 4
            })
        );
        assert_eq!(cart.item(CartItemId::new(11)).unwrap().quantity, 4);
    }

    #[test]
    fn test_update_to_zero_removes_line() {
        let mut cart = stored_cart();
        let change = cart.update_item_quantity(CartItemId::new(10), 0);
        assert_eq!(change, Some(LineChange::Removed { key: key(1, 100) }));
        assert!(cart.item(CartItemId::new(10)).is_none());
        assert_eq!(cart.update_item_quantity(CartItemId::new(10), 3), None);
    }

    #[test]
    fn test_update_negative_removes_line() {
        let mut cart = stored_cart();
        assert!(matches!(
            cart.update_item_quantity(CartItemId::new(11), -2),
            Some(LineChange::Removed { .. })
        ));
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_update_missing_line_is_not_found() {
        let mut cart = stored_cart();
        assert_eq!(cart.update_item_quantity(CartItemId::new(42), 1), None);
        assert_eq!(cart.update_item_quantity(CartItemId::new(42), 0), None);
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut cart = stored_cart();
        assert_eq!(cart.clear(), LineChange::Cleared);
        assert!(cart.is_empty());
        assert_eq!(cart.total_items(), 0);
        assert_eq!(cart.subtotal().unwrap(), Price::ZERO);
    }

    #[test]
    fn test_totals() {
        let cart = stored_cart();
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.subtotal().unwrap().amount(), dec!(3990.50));
    }

    #[test]
    fn test_subtotal_reports_overflowing_total() {
        let mut cart = Cart::empty();
        cart.add_product(key(1, 100), price(dec!(5000.00)), 30_000)
            .unwrap();
        assert!(matches!(
            cart.subtotal(),
            Err(PriceError::TooLarge { .. })
        ));
        assert_eq!(cart.total_items(), 30_000);
    }

    #[test]
    fn test_subtotal_follows_live_price() {
        let mut cart = stored_cart();
        let before = cart.subtotal().unwrap();

        // Reloading after a product price change yields new unit prices
        let mut lines = cart.lines().to_vec();
        if let Some(first) = lines.first_mut() {
            first.unit_price = price(dec!(1000.00));
        }
        cart = Cart::new(CartId::new(1), lines);

        assert_eq!(before.amount(), dec!(3990.50));
        assert_eq!(cart.subtotal().unwrap().amount(), dec!(2990.50));
    }
}
