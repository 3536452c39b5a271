use std::str::FromStr;

use num_bigint::BigInt;

use crate::classifier::SpecializedKind;
use crate::types::{EventRecord, PayloadValue};

// Amounts are kept as decimal strings and cast to NUMERIC in SQL to handle large numbers.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferRow {
    pub address: String,
    pub offer_hash: String,
    pub offer_asset_id: String,
    pub offer_amount: String,
    pub want_asset_id: String,
    pub want_amount: String,
    pub available_amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRow {
    pub address: String,
    pub offer_hash: String,
    pub filled_amount: String,
    pub offer_asset_id: String,
    pub offer_amount: String,
    pub want_asset_id: String,
    pub want_amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRow {
    pub maker_address: String,
    pub taker_address: String,
    pub asset_id: String,
    pub amount: String,
    pub hashed_secret: String,
    pub expiry_time: String,
    pub fee_asset_id: String,
    pub fee_amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecializedRow {
    Offer(OfferRow),
    Trade(TradeRow),
    Swap(SwapRow),
}

impl SpecializedRow {
    /// Re-project the event payload positionally into the row for `kind`.
    ///
    /// Returns `Ok(None)` for kinds without a derived table, `Err` with the reason when
    /// the payload is too short. Numeric columns are copied as text, see `check_amounts`.
    pub fn project(record: &EventRecord, kind: SpecializedKind) -> Result<Option<Self>, String> {
        let required = kind.required_fields();
        if kind != SpecializedKind::None && record.event_payload.len() < required {
            return Err(format!(
                "'{}' event needs {} payload fields, got {}",
                record.event_type,
                required,
                record.event_payload.len()
            ));
        }

        let p = Fields(&record.event_payload);
        let row = match kind {
            SpecializedKind::None => return Ok(None),
            SpecializedKind::Offer => SpecializedRow::Offer(OfferRow {
                address: p.text(0),
                offer_hash: p.text(1),
                offer_asset_id: p.text(2),
                offer_amount: p.text(3),
                want_asset_id: p.text(4),
                want_amount: p.text(5),
                available_amount: p.text(3),
            }),
            SpecializedKind::Trade => SpecializedRow::Trade(TradeRow {
                address: p.text(0),
                offer_hash: p.text(1),
                filled_amount: p.text(2),
                offer_asset_id: p.text(3),
                offer_amount: p.text(4),
                want_asset_id: p.text(5),
                want_amount: p.text(6),
            }),
            SpecializedKind::Swap => SpecializedRow::Swap(SwapRow {
                maker_address: p.text(0),
                taker_address: p.text(1),
                asset_id: p.text(2),
                amount: p.text(3),
                hashed_secret: p.text(4),
                expiry_time: p.text(5),
                fee_asset_id: p.text(6),
                fee_amount: p.text(7),
            }),
        };
        Ok(Some(row))
    }

    /// Check that every NUMERIC(78, 0) column holds a decimal integer.
    pub fn check_amounts(&self) -> Result<(), String> {
        let amounts: Vec<(&str, &str)> = match self {
            SpecializedRow::Offer(o) => vec![
                ("offer_amount", o.offer_amount.as_str()),
                ("want_amount", o.want_amount.as_str()),
                ("available_amount", o.available_amount.as_str()),
            ],
            SpecializedRow::Trade(t) => vec![
                ("filled_amount", t.filled_amount.as_str()),
                ("offer_amount", t.offer_amount.as_str()),
                ("want_amount", t.want_amount.as_str()),
            ],
            SpecializedRow::Swap(s) => vec![
                ("amount", s.amount.as_str()),
                ("expiry_time", s.expiry_time.as_str()),
                ("fee_amount", s.fee_amount.as_str()),
            ],
        };

        for (column, value) in amounts {
            if BigInt::from_str(value).is_err() {
                return Err(format!("{column} is not an integer: '{value}'"));
            }
        }
        Ok(())
    }

    pub fn kind(&self) -> SpecializedKind {
        match self {
            SpecializedRow::Offer(_) => SpecializedKind::Offer,
            SpecializedRow::Trade(_) => SpecializedKind::Trade,
            SpecializedRow::Swap(_) => SpecializedKind::Swap,
        }
    }
}

/// Positional access into a payload whose length was already checked.
struct Fields<'a>(&'a [PayloadValue]);

impl Fields<'_> {
    fn text(&self, pos: usize) -> String {
        self.0[pos].as_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn record(event_type: &str, payload: &[&str]) -> EventRecord {
        EventRecord {
            block_number: 100,
            transaction_hash: "abc".to_string(),
            contract_hash: "def".to_string(),
            event_time: NaiveDateTime::default(),
            event_type: event_type.to_string(),
            event_payload: payload.iter().map(|s| PayloadValue::Text(s.to_string())).collect(),
            event_index: 0,
        }
    }

    #[test]
    fn test_offer_available_amount_mirrors_offer_amount() {
        let rec = record("created", &["addr1", "hash1", "assetA", "100", "assetB", "50"]);
        let row = SpecializedRow::project(&rec, SpecializedKind::Offer).unwrap().unwrap();

        match row {
            SpecializedRow::Offer(offer) => {
                assert_eq!(offer.address, "addr1");
                assert_eq!(offer.offer_hash, "hash1");
                assert_eq!(offer.offer_asset_id, "assetA");
                assert_eq!(offer.offer_amount, "100");
                assert_eq!(offer.available_amount, "100");
                assert_eq!(offer.want_asset_id, "assetB");
                assert_eq!(offer.want_amount, "50");
            }
            other => panic!("expected offer, got {:?}", other),
        }
    }

    #[test]
    fn test_trade_positions() {
        let rec = record("filled", &["addr", "hash", "7", "assetA", "100", "assetB", "50"]);
        let row = SpecializedRow::project(&rec, SpecializedKind::Trade).unwrap().unwrap();

        assert_eq!(
            row,
            SpecializedRow::Trade(TradeRow {
                address: "addr".to_string(),
                offer_hash: "hash".to_string(),
                filled_amount: "7".to_string(),
                offer_asset_id: "assetA".to_string(),
                offer_amount: "100".to_string(),
                want_asset_id: "assetB".to_string(),
                want_amount: "50".to_string(),
            })
        );
    }

    #[test]
    fn test_swap_positions() {
        let rec = record(
            "swapCreated",
            &["maker", "taker", "asset", "10", "secret", "1700000000", "fee", "1"],
        );
        let row = SpecializedRow::project(&rec, SpecializedKind::Swap).unwrap().unwrap();

        match row {
            SpecializedRow::Swap(swap) => {
                assert_eq!(swap.maker_address, "maker");
                assert_eq!(swap.taker_address, "taker");
                assert_eq!(swap.hashed_secret, "secret");
                assert_eq!(swap.expiry_time, "1700000000");
                assert_eq!(swap.fee_amount, "1");
            }
            other => panic!("expected swap, got {:?}", other),
        }
    }

    #[test]
    fn test_short_payload_is_rejected() {
        let rec = record("created", &["addr1", "hash1", "assetA", "100", "assetB"]);
        let err = SpecializedRow::project(&rec, SpecializedKind::Offer).unwrap_err();
        assert!(err.contains("needs 6"));
    }

    #[test]
    fn test_non_numeric_amount_projects_but_fails_check() {
        let rec = record("filled", &["addr", "hash", "lots", "assetA", "100", "assetB", "50"]);
        let row = SpecializedRow::project(&rec, SpecializedKind::Trade).unwrap().unwrap();
        let err = row.check_amounts().unwrap_err();
        assert!(err.contains("filled_amount"));
    }

    #[test]
    fn test_fractional_and_boolean_amounts_fail_check() {
        let rec = record("created", &["a", "h", "x", "1.5", "y", "2"]);
        let row = SpecializedRow::project(&rec, SpecializedKind::Offer).unwrap().unwrap();
        assert!(row.check_amounts().unwrap_err().contains("offer_amount"));

        let rec = record("swapCreated", &["m", "t", "a", "10", "s", "1700000000", "fee", "true"]);
        let row = SpecializedRow::project(&rec, SpecializedKind::Swap).unwrap().unwrap();
        assert!(row.check_amounts().unwrap_err().contains("fee_amount"));
    }

    #[test]
    fn test_valid_amounts_pass_check() {
        let rec = record("created", &["a", "h", "x", "-100", "y", "123456789012345678901234567890"]);
        let row = SpecializedRow::project(&rec, SpecializedKind::Offer).unwrap().unwrap();
        assert_eq!(row.check_amounts(), Ok(()));
    }

    #[test]
    fn test_generic_only_kind_projects_nothing() {
        let rec = record("cancelled", &[]);
        assert_eq!(SpecializedRow::project(&rec, SpecializedKind::None).unwrap(), None);
    }

    #[test]
    fn test_extra_payload_fields_are_ignored() {
        let rec = record("created", &["a", "h", "x", "1", "y", "2", "extra"]);
        let row = SpecializedRow::project(&rec, SpecializedKind::Offer).unwrap().unwrap();
        assert_eq!(row.kind(), SpecializedKind::Offer);
    }
}
