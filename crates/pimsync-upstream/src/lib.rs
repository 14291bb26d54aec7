//! Clients for the upstream systems the catalog is reconciled against: the
//! order-management system (products, variants, prices) and the warehouse
//! (buy prices).

pub mod auth;
pub mod client;
pub mod error;
pub mod oms;
pub mod pagination;
pub mod quota;
pub mod retry;
pub mod source;
pub mod warehouse;

pub use auth::Credentials;
pub use client::{ApiClient, ClientOptions};
pub use error::UpstreamError;
pub use oms::OmsClient;
pub use pagination::{paginate, PageOptions};
pub use quota::{Pacing, QuotaState};
pub use retry::RetryPolicy;
pub use source::{BuyPriceSource, CatalogSource, VariantSnapshot, VariantSource};
pub use warehouse::{CostPriceLookup, WarehouseClient};
