use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_catalog_tables::Migration),
            Box::new(m20240101_000002_create_warehouse_tables::Migration),
            Box::new(m20240101_000003_create_receipts_tables::Migration),
            Box::new(m20240101_000004_create_deliveries_tables::Migration),
            Box::new(m20240101_000005_create_transfers_tables::Migration),
            Box::new(m20240101_000006_create_stock_ledger_table::Migration),
            Box::new(m20240101_000007_create_sequencing_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductCategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductCategories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductCategories::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ProductCategories::Description).string().null())
                        .col(
                            ColumnDef::new(ProductCategories::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null().unique_key())
                        .col(ColumnDef::new(Products::CategoryId).uuid().null())
                        .col(ColumnDef::new(Products::UnitOfMeasure).string().not_null())
                        .col(
                            ColumnDef::new(Products::UnitCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category_id")
                        .table(Products::Table)
                        .col(Products::CategoryId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductCategories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ProductCategories {
        Table,
        Id,
        Name,
        Description,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        Name,
        Sku,
        CategoryId,
        UnitOfMeasure,
        UnitCost,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_warehouse_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_warehouse_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Warehouses::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Warehouses::Name).string().not_null())
                        .col(
                            ColumnDef::new(Warehouses::ShortCode)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Warehouses::Address).string().not_null())
                        .col(ColumnDef::new(Warehouses::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Warehouses::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Locations::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Locations::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Locations::Name).string().not_null())
                        .col(ColumnDef::new(Locations::ShortCode).string().not_null())
                        .col(ColumnDef::new(Locations::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(Locations::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Locations::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_locations_warehouse_id")
                        .table(Locations::Table)
                        .col(Locations::WarehouseId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Locations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Warehouses {
        Table,
        Id,
        Name,
        ShortCode,
        Address,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Locations {
        Table,
        Id,
        Name,
        ShortCode,
        WarehouseId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_receipts_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_receipts_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Receipts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Receipts::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Receipts::Reference)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Receipts::ReceiveFrom).string().not_null())
                        .col(ColumnDef::new(Receipts::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(Receipts::LocationId).uuid().not_null())
                        .col(ColumnDef::new(Receipts::ScheduleDate).timestamp().not_null())
                        .col(ColumnDef::new(Receipts::Status).string().not_null())
                        .col(ColumnDef::new(Receipts::Responsible).uuid().not_null())
                        .col(ColumnDef::new(Receipts::ValidatedAt).timestamp().null())
                        .col(ColumnDef::new(Receipts::ValidatedBy).uuid().null())
                        .col(ColumnDef::new(Receipts::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Receipts::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_receipts_status")
                        .table(Receipts::Table)
                        .col(Receipts::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ReceiptItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReceiptItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReceiptItems::ReceiptId).uuid().not_null())
                        .col(ColumnDef::new(ReceiptItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ReceiptItems::Quantity).decimal().not_null())
                        .col(ColumnDef::new(ReceiptItems::UnitCost).decimal().null())
                        .col(ColumnDef::new(ReceiptItems::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_receipt_items_receipt_id")
                        .table(ReceiptItems::Table)
                        .col(ReceiptItems::ReceiptId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ReceiptItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Receipts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Receipts {
        Table,
        Id,
        Reference,
        ReceiveFrom,
        WarehouseId,
        LocationId,
        ScheduleDate,
        Status,
        Responsible,
        ValidatedAt,
        ValidatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum ReceiptItems {
        Table,
        Id,
        ReceiptId,
        ProductId,
        Quantity,
        UnitCost,
        CreatedAt,
    }
}

mod m20240101_000004_create_deliveries_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_deliveries_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Deliveries::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Deliveries::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Deliveries::Reference)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Deliveries::DeliveryAddress).string().not_null())
                        .col(ColumnDef::new(Deliveries::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(Deliveries::LocationId).uuid().not_null())
                        .col(
                            ColumnDef::new(Deliveries::ScheduleDate)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Deliveries::OperationType).string().null())
                        .col(ColumnDef::new(Deliveries::Status).string().not_null())
                        .col(ColumnDef::new(Deliveries::Responsible).uuid().not_null())
                        .col(ColumnDef::new(Deliveries::ValidatedAt).timestamp().null())
                        .col(ColumnDef::new(Deliveries::ValidatedBy).uuid().null())
                        .col(ColumnDef::new(Deliveries::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Deliveries::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_deliveries_status")
                        .table(Deliveries::Table)
                        .col(Deliveries::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DeliveryItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeliveryItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryItems::DeliveryId).uuid().not_null())
                        .col(ColumnDef::new(DeliveryItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(DeliveryItems::Quantity).decimal().not_null())
                        .col(
                            ColumnDef::new(DeliveryItems::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_delivery_items_delivery_id")
                        .table(DeliveryItems::Table)
                        .col(DeliveryItems::DeliveryId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DeliveryItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Deliveries::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Deliveries {
        Table,
        Id,
        Reference,
        DeliveryAddress,
        WarehouseId,
        LocationId,
        ScheduleDate,
        OperationType,
        Status,
        Responsible,
        ValidatedAt,
        ValidatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum DeliveryItems {
        Table,
        Id,
        DeliveryId,
        ProductId,
        Quantity,
        CreatedAt,
    }
}

mod m20240101_000005_create_transfers_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_transfers_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Transfers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Transfers::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Transfers::Reference)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Transfers::FromWarehouseId).uuid().not_null())
                        .col(ColumnDef::new(Transfers::FromLocationId).uuid().not_null())
                        .col(ColumnDef::new(Transfers::ToWarehouseId).uuid().not_null())
                        .col(ColumnDef::new(Transfers::ToLocationId).uuid().not_null())
                        .col(ColumnDef::new(Transfers::ScheduleDate).timestamp().not_null())
                        .col(ColumnDef::new(Transfers::Status).string().not_null())
                        .col(ColumnDef::new(Transfers::Responsible).uuid().not_null())
                        .col(ColumnDef::new(Transfers::ValidatedAt).timestamp().null())
                        .col(ColumnDef::new(Transfers::ValidatedBy).uuid().null())
                        .col(ColumnDef::new(Transfers::Notes).string().null())
                        .col(ColumnDef::new(Transfers::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Transfers::UpdatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfers_status")
                        .table(Transfers::Table)
                        .col(Transfers::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TransferItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransferItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransferItems::TransferId).uuid().not_null())
                        .col(ColumnDef::new(TransferItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(TransferItems::Quantity).decimal().not_null())
                        .col(
                            ColumnDef::new(TransferItems::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfer_items_transfer_id")
                        .table(TransferItems::Table)
                        .col(TransferItems::TransferId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TransferItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Transfers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Transfers {
        Table,
        Id,
        Reference,
        FromWarehouseId,
        FromLocationId,
        ToWarehouseId,
        ToLocationId,
        ScheduleDate,
        Status,
        Responsible,
        ValidatedAt,
        ValidatedBy,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum TransferItems {
        Table,
        Id,
        TransferId,
        ProductId,
        Quantity,
        CreatedAt,
    }
}

mod m20240101_000006_create_stock_ledger_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_stock_ledger_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Append-only; rows are never updated or deleted.
            manager
                .create_table(
                    Table::create()
                        .table(StockLedger::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockLedger::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockLedger::ProductId).uuid().not_null())
                        .col(ColumnDef::new(StockLedger::WarehouseId).uuid().not_null())
                        .col(ColumnDef::new(StockLedger::LocationId).uuid().not_null())
                        .col(ColumnDef::new(StockLedger::Quantity).decimal().not_null())
                        .col(
                            ColumnDef::new(StockLedger::TransactionType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockLedger::Reference).string().not_null())
                        .col(ColumnDef::new(StockLedger::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            // On-hand is a SUM over (product_id, location_id); this index
            // carries every summation and movement-history query.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_ledger_product_location")
                        .table(StockLedger::Table)
                        .col(StockLedger::ProductId)
                        .col(StockLedger::LocationId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_ledger_reference")
                        .table(StockLedger::Table)
                        .col(StockLedger::Reference)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_ledger_created_at")
                        .table(StockLedger::Table)
                        .col(StockLedger::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockLedger::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum StockLedger {
        Table,
        Id,
        ProductId,
        WarehouseId,
        LocationId,
        Quantity,
        TransactionType,
        Reference,
        CreatedAt,
    }
}

mod m20240101_000007_create_sequencing_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000007_create_sequencing_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // One counter row per reference prefix, e.g. "WH/IN".
            manager
                .create_table(
                    Table::create()
                        .table(DocumentSequences::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DocumentSequences::Prefix)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DocumentSequences::NextValue)
                                .big_integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            // Anchor rows taken FOR UPDATE to serialize outbound stock
            // writes per (product, location) on Postgres.
            manager
                .create_table(
                    Table::create()
                        .table(StockLocks::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(StockLocks::ProductId).uuid().not_null())
                        .col(ColumnDef::new(StockLocks::LocationId).uuid().not_null())
                        .primary_key(
                            Index::create()
                                .col(StockLocks::ProductId)
                                .col(StockLocks::LocationId),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockLocks::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DocumentSequences::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum DocumentSequences {
        Table,
        Prefix,
        NextValue,
    }

    #[derive(DeriveIden)]
    pub(super) enum StockLocks {
        Table,
        ProductId,
        LocationId,
    }
}
