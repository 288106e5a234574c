use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::entities::product;
use crate::errors::{ServiceError, ShortageReport, StockShortage};
use crate::services::stock;

/// The three stock document kinds. The reference code is the middle
/// segment of a document reference, e.g. the "IN" in "WH/IN/0001".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Receipt,
    Delivery,
    Transfer,
}

impl DocumentKind {
    pub fn reference_code(&self) -> &'static str {
        match self {
            DocumentKind::Receipt => "IN",
            DocumentKind::Delivery => "OUT",
            DocumentKind::Transfer => "TR",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Receipt => "receipt",
            DocumentKind::Delivery => "delivery",
            DocumentKind::Transfer => "transfer",
        }
    }
}

/// Document lifecycle states. Monotonic: a document only ever moves
/// forward, and Done is terminal. Waiting exists for deliveries only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum DocumentStatus {
    Draft,
    Waiting,
    Ready,
    Done,
}

impl DocumentStatus {
    pub fn parse(value: &str) -> Result<Self, ServiceError> {
        value
            .parse()
            .map_err(|_| ServiceError::InternalError(format!("unknown document status: {value}")))
    }

    fn rank(&self) -> u8 {
        match self {
            DocumentStatus::Draft => 0,
            DocumentStatus::Waiting => 1,
            DocumentStatus::Ready => 2,
            DocumentStatus::Done => 3,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Done)
    }

    /// Whether an explicit status update may move a `kind` document from
    /// `self` to `next`. Done is never reachable this way; it is only set
    /// by validation.
    pub fn can_advance_to(&self, next: DocumentStatus, kind: DocumentKind) -> bool {
        if next == DocumentStatus::Done || self.is_terminal() {
            return false;
        }
        if next == DocumentStatus::Waiting && kind != DocumentKind::Delivery {
            return false;
        }
        next.rank() > self.rank()
    }
}

/// Ledger entry categories, stored as strings on `stock_ledger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum TransactionType {
    Receipt,
    Delivery,
    Transfer,
    Adjustment,
}

/// Common listing filters shared by the three document kinds.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilters {
    pub status: Option<DocumentStatus>,
    pub warehouse_id: Option<Uuid>,
    pub search: Option<String>,
    pub page: u64,
    pub per_page: u64,
}

/// One requested line of a stock document, before persistence.
#[derive(Debug, Clone)]
pub struct ItemInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_cost: Option<Decimal>,
}

/// Rejects empty documents and non-positive quantities.
pub fn validate_items(items: &[ItemInput]) -> Result<(), ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::ValidationError(
            "document must contain at least one item".to_string(),
        ));
    }
    for item in items {
        if item.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "quantity for product {} must be positive",
                item.product_id
            )));
        }
        if let Some(cost) = item.unit_cost {
            if cost < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "unit cost for product {} must not be negative",
                    item.product_id
                )));
            }
        }
    }
    Ok(())
}

/// Sums duplicate product lines so the availability check sees total
/// demand per product, not per line.
pub fn aggregate_demand(items: &[ItemInput]) -> Vec<(Uuid, Decimal)> {
    let mut totals: BTreeMap<Uuid, Decimal> = BTreeMap::new();
    for item in items {
        *totals.entry(item.product_id).or_insert(Decimal::ZERO) += item.quantity;
    }
    totals.into_iter().collect()
}

/// Checks that every demanded product has enough on hand at `location_id`.
/// Collects ALL short items before failing so the caller gets one complete
/// report instead of discovering shortages one request at a time.
pub async fn check_availability<C: ConnectionTrait>(
    conn: &C,
    location_id: Uuid,
    demand: &[(Uuid, Decimal)],
) -> Result<(), ServiceError> {
    let mut shortages = Vec::new();

    for (product_id, requested) in demand {
        let available = stock::on_hand(conn, *product_id, location_id).await?;
        if available < *requested {
            shortages.push((*product_id, *requested, available));
        }
    }

    if shortages.is_empty() {
        return Ok(());
    }

    let ids: Vec<Uuid> = shortages.iter().map(|(id, _, _)| *id).collect();
    let names: BTreeMap<Uuid, String> = product::Entity::find()
        .filter(product::Column::Id.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();

    let report = shortages
        .into_iter()
        .map(|(product_id, requested, available)| StockShortage {
            product_id,
            product_name: names
                .get(&product_id)
                .cloned()
                .unwrap_or_else(|| product_id.to_string()),
            requested_quantity: requested,
            available_quantity: available,
        })
        .collect();

    Err(ServiceError::InsufficientStock(ShortageReport(report)))
}

/// Verifies every product referenced by the items exists.
pub async fn ensure_products_exist<C: ConnectionTrait>(
    conn: &C,
    items: &[ItemInput],
) -> Result<(), ServiceError> {
    let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    let found: Vec<Uuid> = product::Entity::find()
        .filter(product::Column::Id.is_in(ids.clone()))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    for id in ids {
        if !found.contains(&id) {
            return Err(ServiceError::NotFound(format!("Product {} not found", id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(product_id: Uuid, quantity: Decimal) -> ItemInput {
        ItemInput {
            product_id,
            quantity,
            unit_cost: None,
        }
    }

    #[test]
    fn statuses_round_trip_through_strings() {
        for status in [
            DocumentStatus::Draft,
            DocumentStatus::Waiting,
            DocumentStatus::Ready,
            DocumentStatus::Done,
        ] {
            assert_eq!(DocumentStatus::parse(&status.to_string()).unwrap(), status);
        }
        assert!(DocumentStatus::parse("Cancelled").is_err());
    }

    #[test]
    fn forward_moves_are_allowed_backward_moves_are_not() {
        use DocumentKind::*;
        use DocumentStatus::*;

        assert!(Draft.can_advance_to(Ready, Receipt));
        assert!(Draft.can_advance_to(Waiting, Delivery));
        assert!(Waiting.can_advance_to(Ready, Delivery));
        assert!(Draft.can_advance_to(Ready, Delivery));

        assert!(!Ready.can_advance_to(Draft, Receipt));
        assert!(!Ready.can_advance_to(Waiting, Delivery));
        assert!(!Waiting.can_advance_to(Draft, Delivery));
    }

    #[test]
    fn waiting_is_delivery_only() {
        use DocumentKind::*;
        use DocumentStatus::*;

        assert!(!Draft.can_advance_to(Waiting, Receipt));
        assert!(!Draft.can_advance_to(Waiting, Transfer));
    }

    #[test]
    fn done_is_terminal_and_unreachable_by_status_update() {
        use DocumentKind::*;
        use DocumentStatus::*;

        assert!(!Draft.can_advance_to(Done, Receipt));
        assert!(!Ready.can_advance_to(Done, Delivery));
        assert!(!Done.can_advance_to(Ready, Transfer));
        assert!(Done.is_terminal());
    }

    #[test]
    fn reference_codes_match_document_kinds() {
        assert_eq!(DocumentKind::Receipt.reference_code(), "IN");
        assert_eq!(DocumentKind::Delivery.reference_code(), "OUT");
        assert_eq!(DocumentKind::Transfer.reference_code(), "TR");
    }

    #[test]
    fn empty_documents_are_rejected() {
        assert!(matches!(
            validate_items(&[]),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let id = Uuid::new_v4();
        assert!(validate_items(&[item(id, dec!(0))]).is_err());
        assert!(validate_items(&[item(id, dec!(-3))]).is_err());
        assert!(validate_items(&[item(id, dec!(0.5))]).is_ok());
    }

    #[test]
    fn negative_unit_cost_is_rejected() {
        let bad = ItemInput {
            product_id: Uuid::new_v4(),
            quantity: dec!(1),
            unit_cost: Some(dec!(-1)),
        };
        assert!(validate_items(&[bad]).is_err());
    }

    #[test]
    fn demand_is_aggregated_per_product() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let demand = aggregate_demand(&[item(a, dec!(2)), item(b, dec!(1)), item(a, dec!(3))]);

        let total_a = demand.iter().find(|(id, _)| *id == a).map(|(_, q)| *q);
        let total_b = demand.iter().find(|(id, _)| *id == b).map(|(_, q)| *q);
        assert_eq!(total_a, Some(dec!(5)));
        assert_eq!(total_b, Some(dec!(1)));
        assert_eq!(demand.len(), 2);
    }
}
