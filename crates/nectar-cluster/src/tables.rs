//! redb table definitions for the local control plane.
//!
//! Both tables use `&str` keys and `&[u8]` values (JSON-serialized records).

use redb::TableDefinition;

/// Cluster records keyed by cluster identifier.
pub const CLUSTERS: TableDefinition<&str, &[u8]> = TableDefinition::new("clusters");

/// Access-role identifiers keyed by role name.
pub const ROLES: TableDefinition<&str, &[u8]> = TableDefinition::new("roles");
