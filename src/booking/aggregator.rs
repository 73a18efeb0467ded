//! Booking submission.

use tracing::{debug, info};

use crate::booking::{Booking, BookingDraft, CreateBookingRequest, InFlight};
use crate::error::ClientError;
use crate::gateway::Gateway;
use crate::session::SessionHandle;

/// Turns validated drafts into server bookings.
pub struct BookingAggregator {
    gateway: Gateway,
    session: SessionHandle,
    in_flight: InFlight,
}

impl BookingAggregator {
    pub fn new(gateway: Gateway, session: SessionHandle) -> Self {
        Self {
            gateway,
            session,
            in_flight: InFlight::default(),
        }
    }

    /// Number of submissions currently on the wire. Callers use this to
    /// disable their trigger while a submission is pending; concurrent
    /// submits are not deduplicated here.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count()
    }

    /// Submit a draft.
    ///
    /// Requires a live session; without one the call fails before anything
    /// reaches the wire. The returned booking is the server's view, and its
    /// recomputed total supersedes the draft's client-side figure.
    pub async fn submit(&self, draft: &BookingDraft) -> Result<Booking, ClientError> {
        if self.session.current().is_none() {
            return Err(ClientError::AuthRequired);
        }

        let request = CreateBookingRequest::from_draft(draft);
        debug!(
            items = draft.items().len(),
            total = draft.total_price(),
            "Submitting booking"
        );

        let _guard = self.in_flight.begin();
        let booking: Booking = self
            .gateway
            .post("/api/bookings/", &request)
            .await
            .map_err(|e| ClientError::from_gateway(e, "Failed to create booking"))?;

        info!(
            booking_id = booking.id,
            status = %booking.status,
            total = booking.total_price,
            "Booking created"
        );
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogItemRef, ItemKind};
    use crate::session::claims::encode_unsigned;
    use crate::session::{Session, TokenPair};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn signed_in_handle() -> (SessionHandle, String) {
        let access = encode_unsigned(&json!({ "user_id": 1, "username": "amina" }));
        let handle = SessionHandle::new();
        handle.install(
            Session::from_pair(TokenPair {
                access: access.clone(),
                refresh: "r1".to_string(),
            })
            .unwrap(),
        );
        (handle, access)
    }

    fn aggregator(base_url: &str, handle: SessionHandle) -> BookingAggregator {
        let gateway = Gateway::new(base_url, Duration::from_secs(5), handle.clone()).unwrap();
        BookingAggregator::new(gateway, handle)
    }

    fn draft() -> BookingDraft {
        BookingDraft::build(vec![
            CatalogItemRef {
                kind: ItemKind::Hotel,
                id: 3,
                unit_price: 1450.0,
            },
            CatalogItemRef {
                kind: ItemKind::MatchTicket,
                id: 7,
                unit_price: 850.0,
            },
        ])
        .unwrap()
    }

    fn pending_booking(total: &str) -> serde_json::Value {
        json!({
            "id": 42,
            "hotel": [{ "id": 3, "name": "Atlas Palace", "price_per_night": "1450.00" }],
            "flight": [],
            "match_ticket": [{ "id": 7, "match_name": "Morocco vs Spain", "price": "850.00" }],
            "activity": [],
            "status": "pending",
            "total_price": total,
            "booking_date": "2026-08-01T10:15:00Z"
        })
    }

    #[tokio::test]
    async fn submit_without_a_session_never_touches_the_wire() {
        let server = MockServer::start().await;
        let aggregator = aggregator(&server.uri(), SessionHandle::new());

        let err = aggregator.submit(&draft()).await.unwrap_err();
        assert!(matches!(err, ClientError::AuthRequired));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_posts_grouped_ids_and_returns_the_server_total() {
        let server = MockServer::start().await;
        let (handle, access) = signed_in_handle();

        Mock::given(method("POST"))
            .and(path("/api/bookings/"))
            .and(header("Authorization", format!("Bearer {access}").as_str()))
            .and(body_json(json!({
                "hotel_ids": [3],
                "match_ticket_ids": [7],
                "total_price": 2300.0
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(pending_booking("2450.00")))
            .expect(1)
            .mount(&server)
            .await;

        let booking = aggregator(&server.uri(), handle)
            .submit(&draft())
            .await
            .unwrap();

        assert_eq!(booking.id, 42);
        // The server recomputed a different total; its figure wins.
        assert_eq!(booking.total_price, 2450.0);
    }

    #[tokio::test]
    async fn submit_surfaces_server_validation_detail() {
        let server = MockServer::start().await;
        let (handle, _) = signed_in_handle();

        Mock::given(method("POST"))
            .and(path("/api/bookings/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "non_field_errors": ["Total price mismatch"]
            })))
            .mount(&server)
            .await;

        let err = aggregator(&server.uri(), handle)
            .submit(&draft())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(err.to_string(), "Total price mismatch");
    }

    #[tokio::test]
    async fn submit_maps_5xx_to_a_server_error() {
        let server = MockServer::start().await;
        let (handle, _) = signed_in_handle();

        Mock::given(method("POST"))
            .and(path("/api/bookings/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = aggregator(&server.uri(), handle)
            .submit(&draft())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Server(_)));
        assert_eq!(err.to_string(), "Failed to create booking");
    }

    #[tokio::test]
    async fn submit_is_visible_as_in_flight_until_it_settles() {
        let server = MockServer::start().await;
        let (handle, _) = signed_in_handle();

        Mock::given(method("POST"))
            .and(path("/api/bookings/"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(pending_booking("2300.00"))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let aggregator = Arc::new(aggregator(&server.uri(), handle));
        assert_eq!(aggregator.in_flight(), 0);

        let task = {
            let aggregator = Arc::clone(&aggregator);
            let draft = draft();
            tokio::spawn(async move { aggregator.submit(&draft).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(aggregator.in_flight(), 1);

        task.await.unwrap().unwrap();
        assert_eq!(aggregator.in_flight(), 0);
    }
}
