//! nectar-catalog: declarative registry of warehouse tables.
//!
//! Each table is a [`TableSpec`] with drop/create DDL, an optional load
//! template (staging) or transform (dimension, fact), and a [`Tier`]. The
//! [`Catalog`] keeps specs in tier order and rejects transforms that read
//! an equal or higher tier.

pub mod catalog;
pub mod error;
pub mod honeypot;
pub mod spec;

pub use catalog::{Catalog, TableSelector};
pub use error::{CatalogError, CatalogResult};
pub use honeypot::honeypot_catalog;
pub use spec::{LoadTemplate, TableSpec, Tier, Transform};
