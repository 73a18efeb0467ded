//! Booking records, wire shapes, and the submit/lifecycle services.

pub mod aggregator;
pub mod draft;
pub mod lifecycle;

pub use aggregator::BookingAggregator;
pub use draft::BookingDraft;
pub use lifecycle::BookingLifecycle;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{de_price, CatalogRecord, ItemKind};
use crate::session::UserProfile;

/// Lifecycle states of a booking.
///
/// The server moves `pending` to `confirmed`; the client may only request
/// `pending` to `cancelled`. Both `confirmed` and `cancelled` are terminal
/// from this side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    /// Only pending bookings accept a cancel request.
    pub fn can_cancel(&self) -> bool {
        matches!(self, BookingStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booking as the server returns it: items grouped per kind, plus the
/// authoritative total.
#[derive(Debug, Clone, Deserialize)]
pub struct Booking {
    pub id: i64,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub hotel: Vec<CatalogRecord>,
    #[serde(default)]
    pub flight: Vec<CatalogRecord>,
    #[serde(default)]
    pub match_ticket: Vec<CatalogRecord>,
    #[serde(default)]
    pub activity: Vec<CatalogRecord>,
    pub status: BookingStatus,
    #[serde(deserialize_with = "de_price")]
    pub total_price: f64,
    pub booking_date: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Items of one kind.
    pub fn items(&self, kind: ItemKind) -> &[CatalogRecord] {
        match kind {
            ItemKind::Hotel => &self.hotel,
            ItemKind::Flight => &self.flight,
            ItemKind::MatchTicket => &self.match_ticket,
            ItemKind::Activity => &self.activity,
        }
    }

    /// Total number of items across all kinds.
    pub fn item_count(&self) -> usize {
        ItemKind::ALL.iter().map(|kind| self.items(*kind).len()).sum()
    }

    /// Short description of the contents, e.g. "2 hotels, 1 flight".
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        for kind in ItemKind::ALL {
            let count = self.items(kind).len();
            if count == 1 {
                parts.push(format!("1 {}", kind.label()));
            } else if count > 1 {
                parts.push(format!("{count} {}", kind.plural()));
            }
        }
        if parts.is_empty() {
            "empty".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Body of `POST /api/bookings/`: one id list per kind present, plus the
/// client-computed total. Absent kinds are omitted from the JSON entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct CreateBookingRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hotel_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flight_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub match_ticket_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub activity_ids: Vec<i64>,
    pub total_price: f64,
}

impl CreateBookingRequest {
    pub(crate) fn from_draft(draft: &BookingDraft) -> Self {
        let mut request = Self {
            total_price: draft.total_price(),
            ..Self::default()
        };
        for item in draft.items() {
            match item.kind {
                ItemKind::Hotel => request.hotel_ids.push(item.id),
                ItemKind::Flight => request.flight_ids.push(item.id),
                ItemKind::MatchTicket => request.match_ticket_ids.push(item.id),
                ItemKind::Activity => request.activity_ids.push(item.id),
            }
        }
        request
    }
}

/// Count of operations currently on the wire, shared with callers that want
/// to disable a trigger until its request settles. Dropping the guard settles
/// the operation; nothing here deduplicates concurrent calls.
#[derive(Debug, Clone, Default)]
pub(crate) struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    pub(crate) fn begin(&self) -> InFlightGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(Arc::clone(&self.0))
    }

    pub(crate) fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub(crate) struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
