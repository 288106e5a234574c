use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{location, warehouse};
use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct CreateWarehouseInput {
    pub name: String,
    pub short_code: String,
    pub address: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateWarehouseInput {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateLocationInput {
    pub name: String,
    pub short_code: String,
    pub warehouse_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateLocationInput {
    pub name: Option<String>,
    pub short_code: Option<String>,
}

/// Service for warehouses and the locations inside them.
///
/// A warehouse's short code is immutable once created: it is baked into
/// every document reference minted for that warehouse.
#[derive(Clone)]
pub struct WarehouseService {
    db_pool: Arc<DatabaseConnection>,
}

impl WarehouseService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    pub async fn list(&self) -> Result<Vec<warehouse::Model>, ServiceError> {
        Ok(warehouse::Entity::find()
            .order_by_asc(warehouse::Column::Name)
            .all(self.db_pool.as_ref())
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<warehouse::Model, ServiceError> {
        warehouse::Entity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Warehouse {} not found", id)))
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CreateWarehouseInput,
    ) -> Result<warehouse::Model, ServiceError> {
        let conn = self.db_pool.as_ref();

        if input.short_code.trim().is_empty() || input.short_code.contains('/') {
            return Err(ServiceError::ValidationError(
                "warehouse short code must be non-empty and must not contain '/'".to_string(),
            ));
        }
        let duplicate = warehouse::Entity::find()
            .filter(warehouse::Column::ShortCode.eq(input.short_code.clone()))
            .one(conn)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Warehouse code {} is already in use",
                input.short_code
            )));
        }

        let now = Utc::now();
        let created = warehouse::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            short_code: Set(input.short_code),
            address: Set(input.address),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await?;

        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateWarehouseInput,
    ) -> Result<warehouse::Model, ServiceError> {
        let existing = self.get(id).await?;
        let mut model: warehouse::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(address) = input.address {
            model.address = Set(address);
        }
        model.updated_at = Set(Utc::now());
        Ok(model.update(self.db_pool.as_ref()).await?)
    }

    pub async fn list_locations(
        &self,
        warehouse_id: Option<Uuid>,
    ) -> Result<Vec<location::Model>, ServiceError> {
        let mut query = location::Entity::find().order_by_asc(location::Column::Name);
        if let Some(warehouse_id) = warehouse_id {
            query = query.filter(location::Column::WarehouseId.eq(warehouse_id));
        }
        Ok(query.all(self.db_pool.as_ref()).await?)
    }

    pub async fn get_location(&self, id: Uuid) -> Result<location::Model, ServiceError> {
        location::Entity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", id)))
    }

    #[instrument(skip(self, input))]
    pub async fn create_location(
        &self,
        input: CreateLocationInput,
    ) -> Result<location::Model, ServiceError> {
        self.get(input.warehouse_id).await?;

        let now = Utc::now();
        let created = location::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            short_code: Set(input.short_code),
            warehouse_id: Set(input.warehouse_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db_pool.as_ref())
        .await?;

        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update_location(
        &self,
        id: Uuid,
        input: UpdateLocationInput,
    ) -> Result<location::Model, ServiceError> {
        let existing = self.get_location(id).await?;
        let mut model: location::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(short_code) = input.short_code {
            model.short_code = Set(short_code);
        }
        model.updated_at = Set(Utc::now());
        Ok(model.update(self.db_pool.as_ref()).await?)
    }
}
