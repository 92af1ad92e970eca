//! Store-attributed promotion records shared by the scraper, the database
//! layer, and the API.

use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a promotion expresses its discount.
///
/// The scheme decides which price fields of a [`NormalizedOffer`] carry data
/// and which formula computes its discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingScheme {
    #[default]
    Unknown,
    #[serde(rename = "single")]
    SinglePrice,
    #[serde(rename = "multibuy")]
    MultiBuy,
    #[serde(rename = "percentage")]
    PercentageOff,
}

impl PricingScheme {
    /// Stable identifier used in the database and the JSON API.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PricingScheme::Unknown => "unknown",
            PricingScheme::SinglePrice => "single",
            PricingScheme::MultiBuy => "multibuy",
            PricingScheme::PercentageOff => "percentage",
        }
    }
}

impl std::fmt::Display for PricingScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown pricing scheme: {0}")]
pub struct UnknownPricingScheme(pub String);

impl std::str::FromStr for PricingScheme {
    type Err = UnknownPricingScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(PricingScheme::Unknown),
            "single" => Ok(PricingScheme::SinglePrice),
            "multibuy" => Ok(PricingScheme::MultiBuy),
            "percentage" => Ok(PricingScheme::PercentageOff),
            other => Err(UnknownPricingScheme(other.to_string())),
        }
    }
}

/// A structured promotion ready for persistence.
///
/// Only the fields relevant to `scheme` are non-zero:
///
/// | scheme | populated |
/// |---|---|
/// | `SinglePrice` | `sale_price` |
/// | `MultiBuy` | `sale_quantity`, `sale_price_total` |
/// | `PercentageOff` | `percent_off_value` |
/// | `Unknown` | none |
///
/// `original_price` is filled independently whenever the card advertises one.
/// `discount_percentage` is always computed from the other fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NormalizedOffer {
    pub store_name: String,
    pub product_name: String,
    pub product_url: String,
    pub scheme: PricingScheme,
    pub original_price: Decimal,
    pub sale_price: Decimal,
    pub sale_quantity: i32,
    pub sale_price_total: Decimal,
    pub discount_percentage: Decimal,
    pub percent_off_value: i32,
}

/// Category labels per product name, as assigned by a categorizer.
pub type CategoryMap = HashMap<String, BTreeSet<String>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_string_forms_round_trip() {
        for scheme in [
            PricingScheme::Unknown,
            PricingScheme::SinglePrice,
            PricingScheme::MultiBuy,
            PricingScheme::PercentageOff,
        ] {
            assert_eq!(scheme.as_str().parse::<PricingScheme>().unwrap(), scheme);
        }
    }

    #[test]
    fn scheme_rejects_unknown_string() {
        let err = "bogo".parse::<PricingScheme>().unwrap_err();
        assert_eq!(err.0, "bogo");
    }

    #[test]
    fn scheme_serializes_with_storage_names() {
        let json = serde_json::to_string(&PricingScheme::MultiBuy).unwrap();
        assert_eq!(json, "\"multibuy\"");
        let json = serde_json::to_string(&PricingScheme::PercentageOff).unwrap();
        assert_eq!(json, "\"percentage\"");
    }

    #[test]
    fn default_offer_is_unknown_with_zero_prices() {
        let offer = NormalizedOffer::default();
        assert_eq!(offer.scheme, PricingScheme::Unknown);
        assert_eq!(offer.original_price, Decimal::ZERO);
        assert_eq!(offer.sale_quantity, 0);
        assert_eq!(offer.discount_percentage, Decimal::ZERO);
    }
}
