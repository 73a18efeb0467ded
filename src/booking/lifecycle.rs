//! Booking lifecycle: list, inspect, cancel.

use tracing::{debug, info};

use crate::booking::{Booking, InFlight};
use crate::error::ClientError;
use crate::gateway::{Gateway, GatewayError};
use crate::session::SessionHandle;

/// Operations over bookings that already exist on the server.
pub struct BookingLifecycle {
    gateway: Gateway,
    session: SessionHandle,
    in_flight: InFlight,
}

impl BookingLifecycle {
    pub fn new(gateway: Gateway, session: SessionHandle) -> Self {
        Self {
            gateway,
            session,
            in_flight: InFlight::default(),
        }
    }

    /// Number of cancel operations currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count()
    }

    /// Bookings owned by the current user; the server scopes the list.
    pub async fn list(&self) -> Result<Vec<Booking>, ClientError> {
        if self.session.current().is_none() {
            return Err(ClientError::AuthRequired);
        }
        self.gateway.get("/api/bookings/").await.map_err(|e| {
            ClientError::from_gateway(e, "Failed to fetch bookings. Please try again later.")
        })
    }

    /// One booking by id.
    pub async fn get(&self, id: i64) -> Result<Booking, ClientError> {
        if self.session.current().is_none() {
            return Err(ClientError::AuthRequired);
        }
        self.gateway
            .get(&format!("/api/bookings/{id}/"))
            .await
            .map_err(|e| match e {
                GatewayError::Status {
                    status: 404,
                    detail,
                } => ClientError::NotFound(
                    detail.unwrap_or_else(|| "Booking not found.".to_string()),
                ),
                other => ClientError::from_gateway(other, "Failed to fetch booking"),
            })
    }

    /// Cancel a pending booking.
    ///
    /// Read-then-act: the booking is fetched first, and a non-pending status
    /// fails the call before any mutation is sent. The server may still move
    /// the booking between the read and the PATCH; its 400 on the PATCH is
    /// the same rejection, reported the same way.
    ///
    /// Returns the updated record when the server echoes one, or `None` when
    /// it answers `204 No Content` and drops the booking from the list.
    pub async fn cancel(&self, id: i64) -> Result<Option<Booking>, ClientError> {
        if self.session.current().is_none() {
            return Err(ClientError::AuthRequired);
        }
        let _guard = self.in_flight.begin();

        let current = self.get(id).await?;
        if !current.status.can_cancel() {
            debug!(booking_id = id, status = %current.status, "Refusing to cancel a non-pending booking");
            return Err(ClientError::InvalidTransition(format!(
                "Only pending bookings can be cancelled. This booking is {}.",
                current.status
            )));
        }

        let body = serde_json::json!({ "status": "cancelled" });
        let updated: Option<Booking> = self
            .gateway
            .patch(&format!("/api/bookings/{id}/"), &body)
            .await
            .map_err(|e| match e {
                GatewayError::Status {
                    status: 404,
                    detail,
                } => ClientError::NotFound(
                    detail.unwrap_or_else(|| "Booking not found.".to_string()),
                ),
                GatewayError::Status {
                    status: 403,
                    detail,
                } => ClientError::Forbidden(detail.unwrap_or_else(|| {
                    "You do not have permission to cancel this booking.".to_string()
                })),
                GatewayError::Status {
                    status: 400,
                    detail,
                } => ClientError::InvalidTransition(
                    detail.unwrap_or_else(|| "Only pending bookings can be cancelled.".to_string()),
                ),
                other => ClientError::from_gateway(other, "Failed to cancel booking"),
            })?;

        info!(booking_id = id, removed = updated.is_none(), "Booking cancelled");
        Ok(updated)
    }
}
