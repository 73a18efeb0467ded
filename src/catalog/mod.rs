//! Read-only views of the four bookable catalogs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::ClientError;
use crate::gateway::Gateway;

/// The four kinds of bookable items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Hotel,
    Flight,
    Activity,
    MatchTicket,
}

impl ItemKind {
    pub const ALL: [ItemKind; 4] = [
        ItemKind::Hotel,
        ItemKind::Flight,
        ItemKind::Activity,
        ItemKind::MatchTicket,
    ];

    /// Wire name, as used in booking records.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Hotel => "hotel",
            ItemKind::Flight => "flight",
            ItemKind::Activity => "activity",
            ItemKind::MatchTicket => "match_ticket",
        }
    }

    /// Human singular, for messages.
    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::Hotel => "hotel",
            ItemKind::Flight => "flight",
            ItemKind::Activity => "activity",
            ItemKind::MatchTicket => "match ticket",
        }
    }

    /// Human plural, for messages and tables.
    pub fn plural(&self) -> &'static str {
        match self {
            ItemKind::Hotel => "hotels",
            ItemKind::Flight => "flights",
            ItemKind::Activity => "activities",
            ItemKind::MatchTicket => "match tickets",
        }
    }

    /// API collection for this kind.
    pub fn collection_path(&self) -> &'static str {
        match self {
            ItemKind::Hotel => "/api/hotels/",
            ItemKind::Flight => "/api/flights/",
            ItemKind::Activity => "/api/activities/",
            ItemKind::MatchTicket => "/api/match-tickets/",
        }
    }

    /// API path of one item.
    pub fn item_path(&self, id: i64) -> String {
        format!("{}{}/", self.collection_path(), id)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hotel" | "hotels" => Ok(ItemKind::Hotel),
            "flight" | "flights" => Ok(ItemKind::Flight),
            "activity" | "activities" => Ok(ItemKind::Activity),
            "match-ticket" | "match-tickets" | "match_ticket" | "match_tickets" | "ticket"
            | "tickets" => Ok(ItemKind::MatchTicket),
            other => Err(format!(
                "unknown catalog '{other}' (expected hotels, flights, activities, or match-tickets)"
            )),
        }
    }
}

/// One selected catalog item, priced at selection time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogItemRef {
    pub kind: ItemKind,
    pub id: i64,
    pub unit_price: f64,
}

/// A row from any of the four catalogs.
///
/// The catalogs have different shapes (hotels carry `price_per_night`, the
/// rest carry `price`), so this view keeps only the fields the client renders
/// and books with, all optional, and ignores the rest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogRecord {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub match_name: Option<String>,
    #[serde(default)]
    pub airline: Option<String>,
    #[serde(default)]
    pub flight_number: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub departure_city: Option<String>,
    #[serde(default)]
    pub arrival_city: Option<String>,
    #[serde(default)]
    pub stadium: Option<String>,
    #[serde(default, deserialize_with = "de_price_opt")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "de_price_opt")]
    pub price_per_night: Option<f64>,
    #[serde(default)]
    pub available_rooms: Option<i64>,
    #[serde(default)]
    pub available_seats: Option<i64>,
    #[serde(default)]
    pub available_tickets: Option<i64>,
    #[serde(default)]
    pub available_spots: Option<i64>,
}

impl CatalogRecord {
    /// Unit price for aggregation, whichever field this catalog uses.
    pub fn unit_price(&self) -> Option<f64> {
        self.price.or(self.price_per_night)
    }

    /// Remaining availability, whichever field this catalog uses.
    pub fn available(&self) -> Option<i64> {
        self.available_rooms
            .or(self.available_seats)
            .or(self.available_tickets)
            .or(self.available_spots)
    }

    /// Selection reference for a booking draft. `None` when the record
    /// carries no price.
    pub fn to_ref(&self, kind: ItemKind) -> Option<CatalogItemRef> {
        Some(CatalogItemRef {
            kind,
            id: self.id,
            unit_price: self.unit_price()?,
        })
    }

    /// One-line description for tables.
    pub fn display_name(&self) -> String {
        let mut label = self
            .name
            .clone()
            .or_else(|| self.match_name.clone())
            .or_else(|| match (&self.airline, &self.flight_number) {
                (Some(airline), Some(number)) => Some(format!("{airline} {number}")),
                (Some(airline), None) => Some(airline.clone()),
                (None, Some(number)) => Some(number.clone()),
                (None, None) => None,
            })
            .unwrap_or_else(|| format!("item #{}", self.id));

        let place = self
            .city
            .clone()
            .or_else(|| self.stadium.clone())
            .or_else(|| match (&self.departure_city, &self.arrival_city) {
                (Some(from), Some(to)) => Some(format!("{from} - {to}")),
                _ => None,
            });
        if let Some(place) = place {
            label.push_str(&format!(" ({place})"));
        }
        label
    }
}

/// Catalog read API. These endpoints are served anonymously.
#[derive(Clone)]
pub struct Catalog {
    gateway: Gateway,
}

impl Catalog {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn list(&self, kind: ItemKind) -> Result<Vec<CatalogRecord>, ClientError> {
        self.gateway.get(kind.collection_path()).await.map_err(|e| {
            ClientError::from_gateway(
                e,
                &format!("Failed to load {}. Please try again later.", kind.plural()),
            )
        })
    }

    pub async fn get(&self, kind: ItemKind, id: i64) -> Result<CatalogRecord, ClientError> {
        self.gateway.get(&kind.item_path(id)).await.map_err(|e| {
            ClientError::from_gateway(e, &format!("Failed to load {} {id}", kind.label()))
        })
    }
}

/// DRF serializes decimals as strings; accept both forms.
pub(crate) fn de_price_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => price_from_value(&value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid price: {value}"))),
    }
}

/// As [`de_price_opt`], for fields the API always sends.
pub(crate) fn de_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    price_from_value(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid price: {value}")))
}

fn price_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
