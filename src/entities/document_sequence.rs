use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Counter row backing reference allocation. One row per prefix
/// (e.g. "WH/IN"); the row is locked and incremented inside the document
/// creation transaction so concurrent creations cannot mint the same
/// reference.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document_sequences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub prefix: String,
    pub next_value: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
