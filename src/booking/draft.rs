//! Draft assembly and validation.

use crate::catalog::CatalogItemRef;
use crate::error::ClientError;

/// A validated selection ready for submission.
///
/// Construction is the only validation point: a draft always holds at least
/// one item, every unit price is finite and non-negative, and `total_price`
/// is exactly the sum of the unit prices. The fields are private so no later
/// step can break that.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingDraft {
    items: Vec<CatalogItemRef>,
    total_price: f64,
}

impl BookingDraft {
    /// Validate a selection and compute its total. Pure; no I/O.
    ///
    /// The total is the client's own figure. The server recomputes it on
    /// submission and its result wins.
    pub fn build(items: Vec<CatalogItemRef>) -> Result<Self, ClientError> {
        if items.is_empty() {
            return Err(ClientError::Validation(
                "A booking needs at least one item".to_string(),
            ));
        }
        for item in &items {
            if !item.unit_price.is_finite() || item.unit_price < 0.0 {
                return Err(ClientError::Validation(format!(
                    "{} {} has an invalid price",
                    item.kind.label(),
                    item.id
                )));
            }
        }

        let total_price = items.iter().map(|item| item.unit_price).sum();
        Ok(Self { items, total_price })
    }

    pub fn items(&self) -> &[CatalogItemRef] {
        &self.items
    }

    pub fn total_price(&self) -> f64 {
        self.total_price
    }
}
