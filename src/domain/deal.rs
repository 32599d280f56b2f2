//! Deal domain model - an Order or Sample moving through negotiation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a deal is a bulk order or a pre-production sample.
/// The two share one negotiation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealKind {
    Order,
    Sample,
}

impl fmt::Display for DealKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DealKind::Order => write!(f, "order"),
            DealKind::Sample => write!(f, "sample"),
        }
    }
}

/// The two sides of a negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Buyer,
    Manufacturer,
}

impl Party {
    pub fn other(&self) -> Party {
        match self {
            Party::Buyer => Party::Manufacturer,
            Party::Manufacturer => Party::Buyer,
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Buyer => write!(f, "buyer"),
            Party::Manufacturer => write!(f, "manufacturer"),
        }
    }
}

/// Negotiation lifecycle states for a deal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    Pending,
    Reviewed,
    QuoteSent,
    CustomerQuoteSent,
    ManufacturerReviewingQuote,
    Confirmed,
    Rejected,
    RejectedByCustomer,
    RejectedByManufacturer,
    Cancelled,
}

impl DealStatus {
    /// Terminal states accept no further negotiation
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DealStatus::Confirmed
                | DealStatus::Rejected
                | DealStatus::RejectedByCustomer
                | DealStatus::RejectedByManufacturer
                | DealStatus::Cancelled
        )
    }

    /// Whether the deal has entered production
    pub fn in_production(&self) -> bool {
        matches!(self, DealStatus::Confirmed)
    }

    /// Returns the database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::Pending => "pending",
            DealStatus::Reviewed => "reviewed",
            DealStatus::QuoteSent => "quote_sent",
            DealStatus::CustomerQuoteSent => "customer_quote_sent",
            DealStatus::ManufacturerReviewingQuote => "manufacturer_reviewing_quote",
            DealStatus::Confirmed => "confirmed",
            DealStatus::Rejected => "rejected",
            DealStatus::RejectedByCustomer => "rejected_by_customer",
            DealStatus::RejectedByManufacturer => "rejected_by_manufacturer",
            DealStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DealStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DealStatus::Pending),
            "reviewed" => Ok(DealStatus::Reviewed),
            "quote_sent" => Ok(DealStatus::QuoteSent),
            "customer_quote_sent" => Ok(DealStatus::CustomerQuoteSent),
            "manufacturer_reviewing_quote" => Ok(DealStatus::ManufacturerReviewingQuote),
            "confirmed" => Ok(DealStatus::Confirmed),
            "rejected" => Ok(DealStatus::Rejected),
            "rejected_by_customer" => Ok(DealStatus::RejectedByCustomer),
            "rejected_by_manufacturer" => Ok(DealStatus::RejectedByManufacturer),
            "cancelled" => Ok(DealStatus::Cancelled),
            _ => Err(format!("Unknown deal status: {}", s)),
        }
    }
}

/// A price / lead-time proposal made by one side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub unit_price: f64,
    pub days: i32,
    pub note: Option<String>,
    pub offered_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(unit_price: f64, days: i32, note: Option<String>) -> Self {
        Self {
            unit_price,
            days,
            note,
            offered_at: Utc::now(),
        }
    }
}

/// An Order or Sample in negotiation.
///
/// Ids for deals, actors and companies are assigned by the upstream record
/// store; the core never mints them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: i64,
    pub kind: DealKind,
    /// Human-readable reference number, unique per deal
    pub reference: String,
    pub buyer_id: i64,
    pub manufacturer_id: i64,
    pub company_id: i64,
    pub quantity: i64,
    pub unit_price: Option<f64>,
    pub total_price: Option<f64>,
    pub currency: String,
    pub target_days: Option<i32>,
    pub note: Option<String>,
    pub status: DealStatus,
    pub previous_status: Option<DealStatus>,
    pub status_changed_at: Option<DateTime<Utc>>,
    pub manufacturer_quote: Option<Quote>,
    pub buyer_quote: Option<Quote>,
    /// Side that holds the current open offer
    pub last_offer_by: Option<Party>,
    pub negotiation_rounds: u32,
    pub rejection_reason: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    pub fn new(request: CreateDealRequest) -> Self {
        let now = Utc::now();
        Self {
            id: request.id,
            kind: request.kind,
            reference: request.reference,
            buyer_id: request.buyer_id,
            manufacturer_id: request.manufacturer_id,
            company_id: request.company_id,
            quantity: request.quantity,
            unit_price: None,
            total_price: None,
            currency: request.currency,
            target_days: request.target_days,
            note: request.note,
            status: DealStatus::Pending,
            previous_status: None,
            status_changed_at: None,
            manufacturer_quote: None,
            buyer_quote: None,
            last_offer_by: None,
            negotiation_rounds: 0,
            rejection_reason: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Which side of the negotiation an actor sits on, if any
    pub fn party_of(&self, actor_id: i64) -> Option<Party> {
        if actor_id == self.buyer_id {
            Some(Party::Buyer)
        } else if actor_id == self.manufacturer_id {
            Some(Party::Manufacturer)
        } else {
            None
        }
    }

    /// The current open offer, owned by `last_offer_by`
    pub fn open_offer(&self) -> Option<&Quote> {
        match self.last_offer_by? {
            Party::Buyer => self.buyer_quote.as_ref(),
            Party::Manufacturer => self.manufacturer_quote.as_ref(),
        }
    }

    /// Record a fresh proposal from one side, replacing its previous one
    pub fn record_offer(&mut self, party: Party, quote: Quote) {
        match party {
            Party::Buyer => self.buyer_quote = Some(quote),
            Party::Manufacturer => self.manufacturer_quote = Some(quote),
        }
        self.last_offer_by = Some(party);
    }

    /// Commit an accepted quote to the deal's commercial terms.
    /// Keeps `total_price == unit_price * quantity`.
    pub fn apply_terms(&mut self, quote: &Quote) {
        self.unit_price = Some(quote.unit_price);
        self.total_price = Some(quote.unit_price * self.quantity as f64);
        self.target_days = Some(quote.days);
    }
}

/// Request to create a new deal. The id comes from the record store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDealRequest {
    pub id: i64,
    pub kind: DealKind,
    pub reference: String,
    pub buyer_id: i64,
    pub manufacturer_id: i64,
    pub company_id: i64,
    pub quantity: i64,
    pub currency: String,
    pub target_days: Option<i32>,
    pub note: Option<String>,
}
