// Adapters layer: concrete implementations of the domain ports.

pub mod http_catalog;

pub use http_catalog::HttpProjectCatalog;
