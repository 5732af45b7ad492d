use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A foreign-key style link between two warehouse tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WarehouseRelationship {
    pub from_table_name: String,
    pub from_column_name: String,
    pub target_table_name: String,
    pub target_column_name: String,
}

/// Column metadata merged from `information_schema` and the platform's field definitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableColumn {
    pub name: String,
    pub data_type: String,
    pub is_multi: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

impl TableColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_multi: false,
            display_name: None,
            samples: None,
            tooltip: None,
        }
    }

    #[must_use]
    pub const fn with_multi(mut self, is_multi: bool) -> Self {
        self.is_multi = is_multi;
        self
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    #[must_use]
    pub fn with_samples<I, S>(mut self, samples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.samples = Some(samples.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }
}

/// Everything the agent is told about one warehouse table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableInfo {
    /// Tenant schema the table lives in.
    pub org_prefix: String,
    pub table_name: String,
    pub columns: Vec<TableColumn>,
    /// Platform schema type, e.g. "Run Schema" or "Result Schema".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<WarehouseRelationship>,
}

impl TableInfo {
    pub fn new(org_prefix: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            org_prefix: org_prefix.into(),
            table_name: table_name.into(),
            columns: Vec::new(),
            schema_name: None,
            relationships: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_columns(mut self, columns: Vec<TableColumn>) -> Self {
        self.columns = columns;
        self
    }

    #[must_use]
    pub fn with_schema_name(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = Some(schema_name.into());
        self
    }

    #[must_use]
    pub fn with_relationships(mut self, relationships: Vec<WarehouseRelationship>) -> Self {
        self.relationships = relationships;
        self
    }

    /// Returns the table name qualified with its tenant schema.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.org_prefix, self.table_name)
    }

    /// Relationships that originate from this table.
    pub fn outward_relationships(&self) -> impl Iterator<Item = &WarehouseRelationship> {
        self.relationships
            .iter()
            .filter(|relationship| relationship.from_table_name == self.table_name)
    }
}

/// Snapshot of a tenant's warehouse, built once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarehouseOverview {
    table_info: BTreeMap<String, TableInfo>,
}

impl WarehouseOverview {
    pub fn new(tables: impl IntoIterator<Item = TableInfo>) -> Self {
        let table_info = tables
            .into_iter()
            .map(|table| (table.table_name.clone(), table))
            .collect();
        Self { table_info }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table_info.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table_info.is_empty()
    }

    #[must_use]
    pub fn get(&self, table_name: &str) -> Option<&TableInfo> {
        self.table_info.get(table_name)
    }

    /// Iterates tables in table-name order.
    pub fn tables(&self) -> impl Iterator<Item = &TableInfo> {
        self.table_info.values()
    }
}
