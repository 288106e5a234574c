use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{product, product_category};
use crate::services::products::{
    CreateProductInput, ProductFilters, ProductRow, UpdateProductInput,
};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Matches name or SKU
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub sku: String,
    pub category_id: Option<Uuid>,
    /// e.g. "pcs", "kg", "m"
    #[validate(length(min = 1))]
    pub unit_of_measure: String,
    pub unit_cost: Decimal,
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category_id: Option<Uuid>,
    pub unit_of_measure: Option<String>,
    pub unit_cost: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub unit_of_measure: String,
    pub unit_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductView {
    fn from_model(model: product::Model, category_name: Option<String>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            sku: model.sku,
            category_id: model.category_id,
            category_name,
            unit_of_measure: model.unit_of_measure,
            unit_cost: model.unit_cost,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<ProductRow> for ProductView {
    fn from(row: ProductRow) -> Self {
        ProductView::from_model(row.product, row.category_name)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<product_category::Model> for CategoryView {
    fn from(model: product_category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            created_at: model.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductListQuery),
    responses(
        (status = 200, description = "Products listed", body = ApiResponse<PaginatedResponse<ProductView>>)
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> ApiResult<PaginatedResponse<ProductView>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let (rows, total) = state
        .services
        .products
        .list(ProductFilters {
            search: query.search,
            category_id: query.category_id,
            page,
            per_page: limit,
        })
        .await?;

    let items: Vec<ProductView> = rows.into_iter().map(ProductView::from).collect();
    let total_pages = (total + limit - 1) / limit;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product fetched", body = ApiResponse<ProductView>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ProductView> {
    let model = state.services.products.get(id).await?;
    Ok(Json(ApiResponse::success(ProductView::from_model(
        model, None,
    ))))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Product created", body = ApiResponse<ProductView>),
        (status = 409, description = "SKU already in use", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> ApiResult<ProductView> {
    payload.validate()?;
    let created = state
        .services
        .products
        .create(CreateProductInput {
            name: payload.name,
            sku: payload.sku,
            category_id: payload.category_id,
            unit_of_measure: payload.unit_of_measure,
            unit_cost: payload.unit_cost,
        })
        .await?;
    Ok(Json(ApiResponse::success(ProductView::from_model(
        created, None,
    ))))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductView>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> ApiResult<ProductView> {
    let updated = state
        .services
        .products
        .update(
            id,
            UpdateProductInput {
                name: payload.name,
                sku: payload.sku,
                category_id: payload.category_id.map(Some),
                unit_of_measure: payload.unit_of_measure,
                unit_cost: payload.unit_cost,
            },
        )
        .await?;
    Ok(Json(ApiResponse::success(ProductView::from_model(
        updated, None,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/product-categories",
    responses(
        (status = 200, description = "Categories listed", body = ApiResponse<Vec<CategoryView>>)
    ),
    tag = "products"
)]
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<CategoryView>> {
    let categories = state.services.products.list_categories().await?;
    Ok(Json(ApiResponse::success(
        categories.into_iter().map(CategoryView::from).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/product-categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Category created", body = ApiResponse<CategoryView>),
        (status = 409, description = "Category name already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> ApiResult<CategoryView> {
    payload.validate()?;
    let created = state
        .services
        .products
        .create_category(payload.name, payload.description)
        .await?;
    Ok(Json(ApiResponse::success(created.into())))
}
