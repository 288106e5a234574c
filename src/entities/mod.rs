pub mod delivery;
pub mod delivery_item;
pub mod document_sequence;
pub mod location;
pub mod product;
pub mod product_category;
pub mod receipt;
pub mod receipt_item;
pub mod stock_ledger;
pub mod stock_lock;
pub mod transfer;
pub mod transfer_item;
pub mod warehouse;
