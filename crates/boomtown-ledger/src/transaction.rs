//! Builder for the append-only [`TransactionRecord`] audit rows.
//!
//! Every action-layer commit and every tick credit appends exactly one
//! record per affected company. The builder validates that context
//! required by the kind is present (a hero-out must say what it unlocks,
//! a land purchase must name its tile).

use chrono::Utc;
use serde_json::Value;

use boomtown_types::{
    BuildingId, GameCompanyId, MapId, Money, TileId, TransactionId, TransactionKind,
    TransactionRecord,
};

use crate::error::LedgerError;

/// Builder for validated [`TransactionRecord`] values.
#[derive(Debug)]
pub struct TransactionBuilder {
    kind: TransactionKind,
    company: GameCompanyId,
    map_id: Option<MapId>,
    tile_id: Option<TileId>,
    building_id: Option<BuildingId>,
    amount: Money,
    details: serde_json::Map<String, Value>,
}

impl TransactionBuilder {
    /// Start building a record of `kind` for `company`.
    pub fn new(kind: TransactionKind, company: GameCompanyId) -> Self {
        Self {
            kind,
            company,
            map_id: None,
            tile_id: None,
            building_id: None,
            amount: Money::ZERO,
            details: serde_json::Map::new(),
        }
    }

    /// Set the map context.
    #[must_use]
    pub const fn map(mut self, map_id: MapId) -> Self {
        self.map_id = Some(map_id);
        self
    }

    /// Set the tile involved.
    #[must_use]
    pub const fn tile(mut self, tile_id: TileId) -> Self {
        self.tile_id = Some(tile_id);
        self
    }

    /// Set the building involved.
    #[must_use]
    pub const fn building(mut self, building_id: BuildingId) -> Self {
        self.building_id = Some(building_id);
        self
    }

    /// Set the signed amount from the company's perspective (negative for
    /// spending, positive for income).
    #[must_use]
    pub const fn amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    /// Attach one structured detail entry.
    #[must_use]
    pub fn detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_owned(), value.into());
        self
    }

    /// Validate and produce the record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingField`] when the kind requires
    /// context that was not provided.
    pub fn build(self) -> Result<TransactionRecord, LedgerError> {
        match self.kind {
            TransactionKind::LandPurchase
            | TransactionKind::LandSale => {
                if self.tile_id.is_none() {
                    return Err(LedgerError::MissingField("tile_id"));
                }
            }
            TransactionKind::Construction
            | TransactionKind::BuildingSale
            | TransactionKind::Demolition
            | TransactionKind::Takeover
            | TransactionKind::Attack
            | TransactionKind::SecurityPurchase
            | TransactionKind::SecurityRemoval
            | TransactionKind::Repair
            | TransactionKind::Extinguish
            | TransactionKind::Cleanup => {
                if self.building_id.is_none() {
                    return Err(LedgerError::MissingField("building_id"));
                }
            }
            TransactionKind::HeroOut => {
                if !self.details.contains_key("unlocks") {
                    return Err(LedgerError::MissingField("details.unlocks"));
                }
            }
            TransactionKind::LocationJoin | TransactionKind::LocationLeave => {
                if self.map_id.is_none() {
                    return Err(LedgerError::MissingField("map_id"));
                }
            }
            TransactionKind::MarketPurchase
            | TransactionKind::MarketSale
            | TransactionKind::FinePaid
            | TransactionKind::TickEarnings
            | TransactionKind::Donation
            | TransactionKind::CasinoWager
            | TransactionKind::OffshoreDeposit
            | TransactionKind::OffshoreWithdrawal => {}
        }

        Ok(TransactionRecord {
            id: TransactionId::new(),
            kind: self.kind,
            company: self.company,
            map_id: self.map_id,
            tile_id: self.tile_id,
            building_id: self.building_id,
            amount: self.amount,
            details: Value::Object(self.details),
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn land_purchase_requires_tile() {
        let company = GameCompanyId::new();
        let err = TransactionBuilder::new(TransactionKind::LandPurchase, company)
            .amount(Money::from_minor(-1_000))
            .build()
            .unwrap_err();
        assert!(matches!(err, LedgerError::MissingField("tile_id")));

        let ok = TransactionBuilder::new(TransactionKind::LandPurchase, company)
            .map(MapId::new())
            .tile(TileId::new())
            .amount(Money::from_minor(-1_000))
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn hero_out_requires_unlock_detail() {
        let company = GameCompanyId::new();
        let err = TransactionBuilder::new(TransactionKind::HeroOut, company)
            .build()
            .unwrap_err();
        assert!(matches!(err, LedgerError::MissingField("details.unlocks")));

        let record = TransactionBuilder::new(TransactionKind::HeroOut, company)
            .map(MapId::new())
            .detail("unlocks", "city")
            .build()
            .unwrap();
        assert_eq!(
            record.details.get("unlocks").and_then(Value::as_str),
            Some("city")
        );
    }

    #[test]
    fn attack_requires_building() {
        let company = GameCompanyId::new();
        let err = TransactionBuilder::new(TransactionKind::Attack, company)
            .build()
            .unwrap_err();
        assert!(matches!(err, LedgerError::MissingField("building_id")));
    }

    #[test]
    fn amount_sign_is_preserved() {
        let company = GameCompanyId::new();
        let record = TransactionBuilder::new(TransactionKind::TickEarnings, company)
            .map(MapId::new())
            .amount(Money::from_minor(270))
            .build()
            .unwrap();
        assert_eq!(record.amount, Money::from_minor(270));
    }
}
