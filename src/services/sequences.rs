use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseTransaction, DbBackend, DbErr, EntityTrait,
    QuerySelect, Set,
};

use crate::entities::document_sequence;
use crate::errors::ServiceError;
use crate::services::documents::DocumentKind;

/// Allocates the next document reference for `kind` in the warehouse with
/// `warehouse_code`, formatted `"{code}/{IN|OUT|TR}/{0001}"`.
///
/// Runs inside the document-creation transaction: the counter row is
/// upserted, locked (FOR UPDATE on Postgres; SQLite serializes writers on
/// its own), read and incremented, so two concurrent creations can never
/// mint the same reference. The sequence is dense unless a creation rolls
/// back after allocation, which leaves a gap, never a duplicate.
pub async fn next_reference(
    txn: &DatabaseTransaction,
    kind: DocumentKind,
    warehouse_code: &str,
) -> Result<String, ServiceError> {
    let prefix = format!("{}/{}", warehouse_code, kind.reference_code());

    let seed = document_sequence::ActiveModel {
        prefix: Set(prefix.clone()),
        next_value: Set(1),
    };
    let insert = document_sequence::Entity::insert(seed)
        .on_conflict(
            OnConflict::column(document_sequence::Column::Prefix)
                .do_nothing()
                .to_owned(),
        )
        .exec(txn)
        .await;
    match insert {
        Ok(_) | Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e.into()),
    }

    let mut query = document_sequence::Entity::find_by_id(prefix.clone());
    if txn.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }
    let row = query.one(txn).await?.ok_or_else(|| {
        ServiceError::InternalError(format!("sequence row missing for prefix {}", prefix))
    })?;

    let value = row.next_value;
    let mut counter: document_sequence::ActiveModel = row.into();
    counter.next_value = Set(value + 1);
    counter.update(txn).await?;

    Ok(format_reference(&prefix, value))
}

fn format_reference(prefix: &str, value: i64) -> String {
    format!("{}/{:04}", prefix, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_are_zero_padded_to_four_digits() {
        assert_eq!(format_reference("WH/IN", 1), "WH/IN/0001");
        assert_eq!(format_reference("WH/OUT", 42), "WH/OUT/0042");
        assert_eq!(format_reference("WH2/TR", 1234), "WH2/TR/1234");
    }

    #[test]
    fn counters_past_four_digits_keep_growing() {
        assert_eq!(format_reference("WH/IN", 10001), "WH/IN/10001");
    }
}
