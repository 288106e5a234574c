pub mod dashboard;
pub mod deliveries;
pub mod documents;
pub mod products;
pub mod receipts;
pub mod sequences;
pub mod stock;
pub mod transfers;
pub mod warehouses;
