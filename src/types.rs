use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Sub};

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;
use crate::lifecycle::progress::OrderProgress;

/// Currency amount in minor units (paise, cents).
///
/// JSON carries major units as a decimal number (or a decimal string). Input is
/// rounded half-up on its decimal digits to two places, so `1.005` is `1.01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub const fn from_major(major: i64) -> Self {
        Self(major * 100)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn min(self, other: Money) -> Money {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Money) -> Money {
        Money(self.0.max(other.0))
    }

    pub fn saturating_sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Parses a major-unit decimal such as `"4851.25"` or `"-0.125"`.
    pub fn from_decimal_str(text: &str) -> Option<Self> {
        let text = text.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && fraction.is_empty() {
            return None;
        }
        if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }
        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let mut places = fraction.bytes().map(|b| i64::from(b - b'0'));
        let cents = places.next().unwrap_or(0) * 10 + places.next().unwrap_or(0);
        let round_up = places.next().is_some_and(|digit| digit >= 5);
        let minor = whole
            .checked_mul(100)?
            .checked_add(cents)?
            .checked_add(i64::from(round_up))?;
        Some(Self(if negative { -minor } else { minor }))
    }

    // `f64`'s Display is the shortest string that round-trips, so rounding its
    // digits rounds the decimal the client wrote.
    fn from_major_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Self::from_decimal_str(&value.to_string())
    }

    fn from_major_int(value: i64) -> Option<Self> {
        value.checked_mul(100).map(Self)
    }

    fn as_major_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

/// Saturating. Sums that must report overflow go through [`Money::checked_add`].
impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_major_f64())
    }
}

struct MoneyVisitor;

impl Visitor<'_> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an amount in major units")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Money, E> {
        Money::from_major_int(value)
            .ok_or_else(|| E::custom(format!("amount out of range: {value}")))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Money, E> {
        i64::try_from(value)
            .ok()
            .and_then(Money::from_major_int)
            .ok_or_else(|| E::custom(format!("amount out of range: {value}")))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Money, E> {
        Money::from_major_f64(value).ok_or_else(|| E::custom(format!("invalid amount: {value}")))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Money, E> {
        Money::from_decimal_str(value)
            .ok_or_else(|| E::custom(format!("invalid amount: {value:?}")))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ServiceType {
    Flight,
    Hotel,
    FoodOrder,
    LocalService,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    /// Transit state of a reschedule; never stored.
    Rescheduled,
    /// Transit state of a hotel modification; never stored.
    Modified,
    CheckedIn,
    Preparing,
    OutForDelivery,
    Delivered,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed | Self::Delivered)
    }
}

/// Price breakdown. Build through [`Pricing::new`] so `total` always matches
/// its components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub base: Money,
    pub taxes: Money,
    pub fees: Money,
    pub discount: Money,
    pub total: Money,
}

impl Pricing {
    pub fn new(base: Money, taxes: Money, fees: Money, discount: Money) -> Result<Self, Error> {
        for (name, amount) in [
            ("base", base),
            ("taxes", taxes),
            ("fees", fees),
            ("discount", discount),
        ] {
            if amount.is_negative() {
                return Err(Error::validation(format!("{name} must not be negative")));
            }
        }
        let gross = base
            .checked_add(taxes)
            .and_then(|sum| sum.checked_add(fees))
            .ok_or_else(|| Error::validation("price components overflow"))?;
        if discount > gross {
            return Err(Error::validation(format!(
                "discount {discount} exceeds gross amount {gross}"
            )));
        }
        Ok(Self {
            base,
            taxes,
            fees,
            discount,
            total: gross - discount,
        })
    }

    /// Same breakdown with a new base fare.
    pub fn with_base(&self, base: Money) -> Result<Self, Error> {
        Self::new(base, self.taxes, self.fees, self.discount)
    }

    pub fn is_consistent(&self) -> bool {
        let expected = self
            .base
            .checked_add(self.taxes)
            .and_then(|sum| sum.checked_add(self.fees))
            .and_then(|gross| gross.checked_sub(self.discount));
        expected == Some(self.total) && !self.total.is_negative()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub fee_charged: Money,
    pub refund_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub overall: u8,
    #[serde(default)]
    pub categories: BTreeMap<String, u8>,
    #[serde(default)]
    pub feedback: String,
}

impl Rating {
    pub fn validate(&self) -> Result<(), Error> {
        if !(1..=5).contains(&self.overall) {
            return Err(Error::validation(format!(
                "overall rating {} outside 1-5",
                self.overall
            )));
        }
        if let Some((name, score)) = self
            .categories
            .iter()
            .find(|(_, score)| !(1..=5).contains(*score))
        {
            return Err(Error::validation(format!(
                "rating for {name} is {score}, expected 1-5"
            )));
        }
        Ok(())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangeKind {
    Rescheduled,
    Modified,
}

/// Audit entry for a soft transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    pub at: DateTime<Utc>,
    pub fee: Money,
    pub previous_schedule: DateTime<Utc>,
    pub new_schedule: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightDetails {
    pub airline: String,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub passengers: u32,
    #[serde(default)]
    pub seat: Option<String>,
    /// Assigned at booking time.
    #[serde(default)]
    pub pnr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelDetails {
    pub hotel_name: String,
    pub room_type: String,
    pub guests: u32,
    pub nights: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodOrderDetails {
    pub restaurant: String,
    pub items: Vec<FoodItem>,
    pub delivery_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalServiceDetails {
    pub provider: String,
    pub service_name: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceDetails {
    Flight(FlightDetails),
    Hotel(HotelDetails),
    FoodOrder(FoodOrderDetails),
    LocalService(LocalServiceDetails),
}

impl ServiceDetails {
    pub fn service_type(&self) -> ServiceType {
        match self {
            Self::Flight(_) => ServiceType::Flight,
            Self::Hotel(_) => ServiceType::Hotel,
            Self::FoodOrder(_) => ServiceType::FoodOrder,
            Self::LocalService(_) => ServiceType::LocalService,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub service_type: ServiceType,
    pub owner_id: String,
    /// Service start; the anchor for time-tiered cancellation.
    pub schedule: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub pricing: Pricing,
    pub status: BookingStatus,
    pub details: ServiceDetails,
    #[serde(default)]
    pub cancellation: Option<Cancellation>,
    #[serde(default)]
    pub rating: Option<Rating>,
    #[serde(default)]
    pub changes: Vec<ChangeRecord>,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub progress: Option<OrderProgress>,
}
