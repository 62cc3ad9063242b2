//! Quote Model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::catalog::DEFAULT_UNIT;
use super::number::{RawNumber, lenient_rate};

/// Payment status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    #[default]
    #[serde(alias = "pendiente")]
    Pending,
    #[serde(alias = "pagada")]
    Paid,
}

impl QuoteStatus {
    pub fn toggled(self) -> Self {
        match self {
            QuoteStatus::Pending => QuoteStatus::Paid,
            QuoteStatus::Paid => QuoteStatus::Pending,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QuoteStatus::Pending => "Pending",
            QuoteStatus::Paid => "Paid",
        }
    }
}

impl std::str::FromStr for QuoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "pendiente" => Ok(QuoteStatus::Pending),
            "paid" | "pagada" => Ok(QuoteStatus::Paid),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// Line item, owned by its quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub id: String,
    #[serde(rename = "qty", default)]
    pub quantity: RawNumber,
    #[serde(default = "super::catalog::default_unit")]
    pub unit: String,
    #[serde(rename = "desc", default)]
    pub description: String,
    #[serde(rename = "price", default)]
    pub unit_price: RawNumber,
}

impl QuoteItem {
    /// Blank row added by the editor: one piece, no description, no price
    pub fn blank(id: String) -> Self {
        Self {
            id,
            quantity: RawNumber::from(1),
            unit: DEFAULT_UNIT.to_string(),
            description: String::new(),
            unit_price: RawNumber::empty(),
        }
    }
}

/// Quote / invoice record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    /// Zero-padded sequence number, fixed at first save
    pub folio: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "client")]
    pub client_name: String,
    #[serde(rename = "phone")]
    pub client_phone: String,
    #[serde(default)]
    pub items: Vec<QuoteItem>,
    #[serde(default)]
    pub status: QuoteStatus,
    #[serde(default, deserialize_with = "lenient_rate")]
    pub discount_rate: Decimal,
    #[serde(default, deserialize_with = "lenient_rate")]
    pub tax_rate: Decimal,
    /// Derived on every save; never trusted from the caller
    #[serde(default)]
    pub total: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl Quote {
    /// Title shown on the document, falling back to the generic label
    pub fn display_title(&self) -> &str {
        match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => "Service Estimate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_status_values() {
        let s: QuoteStatus = serde_json::from_str("\"pagada\"").unwrap();
        assert_eq!(s, QuoteStatus::Paid);
        let s: QuoteStatus = serde_json::from_str("\"pendiente\"").unwrap();
        assert_eq!(s, QuoteStatus::Pending);
        assert_eq!(serde_json::to_string(&QuoteStatus::Paid).unwrap(), "\"paid\"");
    }

    #[test]
    fn test_deserialize_compact_quote() {
        let json = r#"{
            "id": "q1", "folio": "0007", "date": "2024-05-01T10:00:00.000Z",
            "client": "Ana", "phone": "5512345678",
            "items": [{"id": "i1", "qty": "2", "unit": "pza", "desc": "Pipe", "price": 100}],
            "status": "pendiente", "total": 200, "taxRate": 16
        }"#;
        let quote: Quote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.client_name, "Ana");
        assert_eq!(quote.items[0].quantity.to_decimal(), Decimal::from(2));
        assert_eq!(quote.discount_rate, Decimal::ZERO);
        assert_eq!(quote.tax_rate, Decimal::from(16));
        assert_eq!(quote.display_title(), "Service Estimate");
    }

    #[test]
    fn test_toggle() {
        assert_eq!(QuoteStatus::Pending.toggled(), QuoteStatus::Paid);
        assert_eq!(QuoteStatus::Paid.toggled(), QuoteStatus::Pending);
        assert_eq!("PAID".parse::<QuoteStatus>(), Ok(QuoteStatus::Paid));
    }
}
