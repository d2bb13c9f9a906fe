//! Catalog: the ordered, immutable registry of table specs.
//!
//! Catalog order is tier order (staging, then dimension, then fact), stable
//! within a tier. Every phase iterates specs in this order, and `resolve`
//! never reorders to match a caller's selection.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::error::{CatalogError, CatalogResult};
use crate::spec::{TableSpec, Tier};

/// Which tables a pipeline invocation targets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TableSelector {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl TableSelector {
    /// `None` or an empty list selects every table.
    pub fn from_names<I, S>(names: Option<I>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match names {
            None => TableSelector::All,
            Some(names) => {
                let set: BTreeSet<String> = names.into_iter().map(Into::into).collect();
                if set.is_empty() {
                    TableSelector::All
                } else {
                    TableSelector::Only(set)
                }
            }
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, TableSelector::All)
    }
}

impl std::fmt::Display for TableSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableSelector::All => f.write_str("all"),
            TableSelector::Only(names) => {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                f.write_str(&names.join(","))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    tables: Vec<TableSpec>,
}

impl Catalog {
    /// Build a catalog, stable-sorting the specs into tier order.
    ///
    /// Construction does not validate; call [`Catalog::validate`] before use.
    pub fn new(mut tables: Vec<TableSpec>) -> Self {
        tables.sort_by_key(|t| t.tier);
        Self { tables }
    }

    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    pub fn tier(&self, tier: Tier) -> impl Iterator<Item = &TableSpec> {
        self.tables.iter().filter(move |t| t.tier == tier)
    }

    /// Check the catalog's structural rules and that every load statement
    /// has a source location in `sources` (keyed by logical table name).
    pub fn validate(&self, sources: &BTreeMap<String, String>) -> CatalogResult<()> {
        let mut names: HashMap<&str, Tier> = HashMap::new();
        let mut physical: HashMap<&str, &str> = HashMap::new();

        for spec in &self.tables {
            if names.insert(&spec.name, spec.tier).is_some() {
                return Err(CatalogError::DuplicateTable(spec.name.clone()));
            }
            if let Some(first) = physical.insert(&spec.physical_name, &spec.name) {
                return Err(CatalogError::DuplicatePhysicalName {
                    physical: spec.physical_name.clone(),
                    first: first.to_string(),
                    second: spec.name.clone(),
                });
            }
            match spec.tier {
                Tier::Staging if spec.transform.is_some() => {
                    return Err(misplaced(spec, "transform"));
                }
                Tier::Dimension | Tier::Fact if spec.load.is_some() => {
                    return Err(misplaced(spec, "load"));
                }
                _ => {}
            }
        }

        for spec in &self.tables {
            for read in spec.reads() {
                let read_tier = *names.get(read.as_str()).ok_or_else(|| {
                    CatalogError::UndeclaredInput {
                        table: spec.name.clone(),
                        reads: read.clone(),
                    }
                })?;
                if read_tier >= spec.tier {
                    return Err(CatalogError::InvalidDependency {
                        table: spec.name.clone(),
                        tier: spec.tier,
                        reads: read.clone(),
                        read_tier,
                    });
                }
            }
            if spec.load.is_some() && !sources.contains_key(&spec.name) {
                return Err(CatalogError::MissingSource(spec.name.clone()));
            }
        }

        debug!(tables = self.tables.len(), "catalog validated");
        Ok(())
    }

    /// Specs matching `selector`, in catalog order.
    pub fn resolve(&self, selector: &TableSelector) -> CatalogResult<Vec<&TableSpec>> {
        match selector {
            TableSelector::All => Ok(self.tables.iter().collect()),
            TableSelector::Only(names) => {
                if let Some(unknown) = names.iter().find(|n| self.get(n).is_none()) {
                    return Err(CatalogError::UnknownTable(unknown.clone()));
                }
                Ok(self
                    .tables
                    .iter()
                    .filter(|t| names.contains(&t.name))
                    .collect())
            }
        }
    }

    /// The first fact-tier table, if any.
    pub fn fact_table(&self) -> Option<&TableSpec> {
        self.tier(Tier::Fact).next()
    }
}

fn misplaced(spec: &TableSpec, kind: &'static str) -> CatalogError {
    CatalogError::MisplacedStatement {
        table: spec.name.clone(),
        tier: spec.tier,
        kind,
    }
}
