//! Table specifications: one declarative entry per warehouse table.

use std::fmt;

/// Dependency tier. A transform may only read tables at a strictly lower tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Staging,
    Dimension,
    Fact,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Staging => "staging",
            Tier::Dimension => "dimension",
            Tier::Fact => "fact",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bulk-load statement with `{table}`, `{source}`, `{role}` and `{region}`
/// placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTemplate {
    template: String,
}

impl LoadTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Substitute the placeholders. Single quotes in the values are doubled
    /// so they stay inside their string literals.
    pub fn render(&self, table: &str, source: &str, role: &str, region: &str) -> String {
        self.template
            .replace("{table}", table)
            .replace("{source}", &escape_literal(source))
            .replace("{role}", &escape_literal(role))
            .replace("{region}", &escape_literal(region))
    }
}

fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// INSERT-SELECT populating a dimension or fact table, with the logical
/// names of every table it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transform {
    pub sql: String,
    pub reads: Vec<String>,
}

/// Declaration of one warehouse table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    /// Logical name used by selectors and dependency declarations.
    pub name: String,
    /// Name of the table in the warehouse.
    pub physical_name: String,
    pub tier: Tier,
    pub drop_sql: String,
    pub create_sql: String,
    /// Staging tier only.
    pub load: Option<LoadTemplate>,
    /// Dimension and fact tiers only.
    pub transform: Option<Transform>,
}

impl TableSpec {
    fn bare(name: &str, tier: Tier, create_sql: &str) -> Self {
        Self {
            name: name.to_string(),
            physical_name: name.to_string(),
            tier,
            drop_sql: format!("DROP TABLE IF EXISTS {name};"),
            create_sql: create_sql.to_string(),
            load: None,
            transform: None,
        }
    }

    /// A staging table loaded by `load`.
    pub fn staging(name: &str, create_sql: &str, load: Option<LoadTemplate>) -> Self {
        Self {
            load,
            ..Self::bare(name, Tier::Staging, create_sql)
        }
    }

    pub fn dimension(name: &str, create_sql: &str, transform: Option<Transform>) -> Self {
        Self {
            transform,
            ..Self::bare(name, Tier::Dimension, create_sql)
        }
    }

    pub fn fact(name: &str, create_sql: &str, transform: Option<Transform>) -> Self {
        Self {
            transform,
            ..Self::bare(name, Tier::Fact, create_sql)
        }
    }

    /// Override the physical name. The drop statement follows it.
    pub fn with_physical_name(mut self, physical: &str) -> Self {
        self.physical_name = physical.to_string();
        self.drop_sql = format!("DROP TABLE IF EXISTS {physical};");
        self
    }

    /// Logical names this table's transform reads.
    pub fn reads(&self) -> &[String] {
        self.transform
            .as_ref()
            .map(|t| t.reads.as_slice())
            .unwrap_or(&[])
    }
}

/// Build a [`Transform`] from SQL and the tables it reads.
pub fn transform(sql: &str, reads: &[&str]) -> Transform {
    Transform {
        sql: sql.to_string(),
        reads: reads.iter().map(|r| r.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered() {
        assert!(Tier::Staging < Tier::Dimension);
        assert!(Tier::Dimension < Tier::Fact);
    }

    #[test]
    fn load_template_renders_all_placeholders() {
        let load = LoadTemplate::new(
            "COPY {table} FROM '{source}' credentials 'aws_iam_role={role}' region '{region}';",
        );
        assert_eq!(
            load.render("staging_ipgeo", "s3://bucket/ipgeo.csv", "arn:role", "us-west-2"),
            "COPY staging_ipgeo FROM 's3://bucket/ipgeo.csv' credentials 'aws_iam_role=arn:role' region 'us-west-2';"
        );
    }

    #[test]
    fn load_template_escapes_quotes() {
        let load = LoadTemplate::new("COPY t FROM '{source}';");
        assert_eq!(load.render("t", "it's", "r", "x"), "COPY t FROM 'it''s';");
    }

    #[test]
    fn physical_name_override_updates_drop() {
        let spec = TableSpec::staging("raw", "CREATE TABLE IF NOT EXISTS raw_v2 (id INT);", None)
            .with_physical_name("raw_v2");
        assert_eq!(spec.name, "raw");
        assert_eq!(spec.drop_sql, "DROP TABLE IF EXISTS raw_v2;");
        assert!(spec.reads().is_empty());
    }
}
