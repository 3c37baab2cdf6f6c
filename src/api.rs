//! HTTP-style request dispatch over [`BookingService`].
//!
//! Transport is left to the caller: the binary feeds JSON lines, a web server
//! would feed request bodies. Every outcome is an [`ApiResponse`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::collaborators::{Catalog, EmptyCatalog};
use crate::error::Error;
use crate::lifecycle::mapping::action_from_api_name;
use crate::service::{BookingRequest, BookingService, HotelModification};
use crate::store::{BookingStore, InMemoryBookingStore};
use crate::types::{Money, Rating, ServiceType};

/// POST actions that are not lifecycle transitions.
const NON_TRANSITION_ACTIONS: &[&str] = &["book", "track"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetQuery {
    #[serde(default)]
    pub booking_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub service: Option<ServiceType>,
    /// Remaining query parameters, passed to the catalog.
    #[serde(flatten)]
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "action",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum PostRequest {
    Book(BookingRequest),
    Cancel {
        booking_id: String,
        #[serde(default)]
        reason: String,
    },
    Reschedule {
        booking_id: String,
        new_schedule: DateTime<Utc>,
        #[serde(default)]
        new_fare: Option<Money>,
    },
    Modify {
        booking_id: String,
        #[serde(default)]
        new_schedule: Option<DateTime<Utc>>,
        #[serde(default)]
        guests: Option<u32>,
        #[serde(default)]
        nights: Option<u32>,
    },
    Rate {
        booking_id: String,
        rating: Rating,
    },
    Track {
        order_id: String,
    },
    #[serde(rename = "web-checkin")]
    WebCheckIn {
        booking_id: String,
    },
    SeatSelect {
        booking_id: String,
        seat: String,
    },
    Complete {
        booking_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: impl Serialize) -> Result<Self, Error> {
        Ok(Self {
            status: 200,
            body: serde_json::to_value(body)?,
        })
    }

    fn created(body: impl Serialize) -> Result<Self, Error> {
        Ok(Self {
            status: 201,
            body: serde_json::to_value(body)?,
        })
    }

    fn from_error(err: &Error) -> Self {
        Self {
            status: err.status_code(),
            body: json!({
                "error": err.kind(),
                "message": err.to_string(),
            }),
        }
    }
}

pub struct BookingApi<S: BookingStore = InMemoryBookingStore> {
    service: Arc<BookingService<S>>,
    catalog: Arc<dyn Catalog>,
}

impl<S: BookingStore> BookingApi<S> {
    pub fn new(service: Arc<BookingService<S>>) -> Self {
        Self {
            service,
            catalog: Arc::new(EmptyCatalog),
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn service(&self) -> &BookingService<S> {
        &self.service
    }

    pub fn handle_get(&self, query: &GetQuery) -> ApiResponse {
        self.respond(self.dispatch_get(query))
    }

    /// Parses `body` as a JSON action request and runs it.
    pub fn handle_post(&self, body: &str) -> ApiResponse {
        let result = serde_json::from_str::<Value>(body)
            .map_err(Error::from)
            .and_then(|value| self.dispatch_post(value));
        self.respond(result)
    }

    fn respond(&self, result: Result<ApiResponse, Error>) -> ApiResponse {
        result.unwrap_or_else(|err| {
            match &err {
                Error::Upstream { .. } | Error::Config { .. } => {
                    tracing::error!(error = %err, "request failed");
                }
                _ => tracing::debug!(error = %err, kind = err.kind(), "request rejected"),
            }
            ApiResponse::from_error(&err)
        })
    }

    fn dispatch_get(&self, query: &GetQuery) -> Result<ApiResponse, Error> {
        if let Some(id) = query.booking_id.as_deref() {
            return ApiResponse::ok(self.service.get(id)?);
        }
        if let Some(owner) = query.user_id.as_deref() {
            let bookings = self.service.list_by_owner(owner)?;
            return ApiResponse::ok(json!({ "bookings": bookings }));
        }
        match query.action.as_deref() {
            Some("search") => ApiResponse::ok(json!({
                "results": self.catalog.search(query.service, &query.params),
            })),
            Some(other) => Err(Error::validation(format!("unknown action {other:?}"))),
            None => Err(Error::validation("bookingId, userId or action=search is required")),
        }
    }

    fn dispatch_post(&self, body: Value) -> Result<ApiResponse, Error> {
        let action = body
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::validation("action is required"))?;
        if !NON_TRANSITION_ACTIONS.contains(&action) && action_from_api_name(action).is_none() {
            return Err(Error::validation(format!("unknown action {action:?}")));
        }

        let request: PostRequest = serde_json::from_value(body)?;
        tracing::debug!(?request, "dispatching");
        match request {
            PostRequest::Book(request) => ApiResponse::created(self.service.book(request)?),
            PostRequest::Cancel { booking_id, reason } => {
                ApiResponse::ok(self.service.cancel(&booking_id, &reason)?)
            }
            PostRequest::Reschedule {
                booking_id,
                new_schedule,
                new_fare,
            } => ApiResponse::ok(self.service.reschedule(&booking_id, new_schedule, new_fare)?),
            PostRequest::Modify {
                booking_id,
                new_schedule,
                guests,
                nights,
            } => ApiResponse::ok(self.service.modify(
                &booking_id,
                &HotelModification {
                    new_schedule,
                    guests,
                    nights,
                },
            )?),
            PostRequest::Rate { booking_id, rating } => {
                ApiResponse::ok(self.service.rate(&booking_id, rating)?)
            }
            PostRequest::Track { order_id } => ApiResponse::ok(self.service.track(&order_id)?),
            PostRequest::WebCheckIn { booking_id } => {
                ApiResponse::ok(self.service.check_in(&booking_id)?)
            }
            PostRequest::SeatSelect { booking_id, seat } => {
                ApiResponse::ok(self.service.select_seat(&booking_id, &seat)?)
            }
            PostRequest::Complete { booking_id } => {
                ApiResponse::ok(self.service.complete(&booking_id)?)
            }
        }
    }
}
