use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{product, product_category};
use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct CreateProductInput {
    pub name: String,
    pub sku: String,
    pub category_id: Option<Uuid>,
    pub unit_of_measure: String,
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category_id: Option<Option<Uuid>>,
    pub unit_of_measure: Option<String>,
    pub unit_cost: Option<Decimal>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilters {
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Clone)]
pub struct ProductRow {
    pub product: product::Model,
    pub category_name: Option<String>,
}

/// Catalog service: products and their categories.
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    pub async fn list(
        &self,
        filters: ProductFilters,
    ) -> Result<(Vec<ProductRow>, u64), ServiceError> {
        let per_page = filters.per_page.clamp(1, 200);
        let page = filters.page.max(1);

        let mut query = product::Entity::find().order_by_asc(product::Column::Name);
        if let Some(search) = &filters.search {
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.contains(search))
                    .add(product::Column::Sku.contains(search)),
            );
        }
        if let Some(category_id) = filters.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }

        let paginator = query.paginate(self.db_pool.as_ref(), per_page);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page - 1).await?;

        let category_ids: Vec<Uuid> = products.iter().filter_map(|p| p.category_id).collect();
        let categories: BTreeMap<Uuid, String> = product_category::Entity::find()
            .filter(product_category::Column::Id.is_in(category_ids))
            .all(self.db_pool.as_ref())
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        let rows = products
            .into_iter()
            .map(|product| ProductRow {
                category_name: product
                    .category_id
                    .and_then(|id| categories.get(&id).cloned()),
                product,
            })
            .collect();

        Ok((rows, total))
    }

    pub async fn get(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CreateProductInput) -> Result<product::Model, ServiceError> {
        let conn = self.db_pool.as_ref();

        let duplicate = product::Entity::find()
            .filter(product::Column::Sku.eq(input.sku.clone()))
            .one(conn)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "SKU {} is already in use",
                input.sku
            )));
        }
        if let Some(category_id) = input.category_id {
            product_category::Entity::find_by_id(category_id)
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Category {} not found", category_id))
                })?;
        }

        let now = Utc::now();
        let created = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            sku: Set(input.sku),
            category_id: Set(input.category_id),
            unit_of_measure: Set(input.unit_of_measure),
            unit_cost: Set(input.unit_cost),
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
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        let conn = self.db_pool.as_ref();
        let existing = self.get(id).await?;

        if let Some(sku) = &input.sku {
            if *sku != existing.sku {
                let duplicate = product::Entity::find()
                    .filter(product::Column::Sku.eq(sku.clone()))
                    .one(conn)
                    .await?;
                if duplicate.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "SKU {} is already in use",
                        sku
                    )));
                }
            }
        }
        if let Some(Some(category_id)) = input.category_id {
            product_category::Entity::find_by_id(category_id)
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Category {} not found", category_id))
                })?;
        }

        let mut model: product::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(sku) = input.sku {
            model.sku = Set(sku);
        }
        if let Some(category_id) = input.category_id {
            model.category_id = Set(category_id);
        }
        if let Some(unit_of_measure) = input.unit_of_measure {
            model.unit_of_measure = Set(unit_of_measure);
        }
        if let Some(unit_cost) = input.unit_cost {
            model.unit_cost = Set(unit_cost);
        }
        model.updated_at = Set(Utc::now());

        Ok(model.update(conn).await?)
    }

    pub async fn list_categories(&self) -> Result<Vec<product_category::Model>, ServiceError> {
        Ok(product_category::Entity::find()
            .order_by_asc(product_category::Column::Name)
            .all(self.db_pool.as_ref())
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        name: String,
        description: Option<String>,
    ) -> Result<product_category::Model, ServiceError> {
        let conn = self.db_pool.as_ref();
        let duplicate = product_category::Entity::find()
            .filter(product_category::Column::Name.eq(name.clone()))
            .one(conn)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category {} already exists",
                name
            )));
        }

        let created = product_category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            description: Set(description),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await?;

        Ok(created)
    }
}
