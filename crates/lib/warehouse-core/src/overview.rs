//! Assembly of the warehouse overview from raw metadata.
//!
//! The store fetches each metadata source with its own query; the joins happen
//! here, in memory, keyed by platform schema id.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;
use warehouse_store::models::{TableColumn, TableInfo, WarehouseOverview, WarehouseRelationship};
use warehouse_store::schema::{COLUMN_ID, is_excluded_column, raw_table_name, schema_system_name};

/// A column as reported by `information_schema.columns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRecord {
    pub name: String,
    pub data_type: String,
}

/// A user-defined record type from the platform's schema table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRecord {
    pub system_name: String,
    pub schema_type: Option<String>,
}

/// Display metadata for one field of a platform schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaFieldRecord {
    pub display_name: Option<String>,
    pub is_multi: bool,
    pub tooltip: Option<String>,
}

/// A field definition that points at another schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldReference {
    pub system_name: String,
    pub target_schema_id: String,
}

/// Raw warehouse metadata, one map per source query.
#[derive(Debug, Clone, Default)]
pub struct WarehouseCatalog {
    pub org_prefix: String,
    /// Non-view tables in the tenant schema.
    pub tables: Vec<String>,
    /// Table name to ordered columns.
    pub columns: HashMap<String, Vec<ColumnRecord>>,
    /// Schema id to schema. Ordered so that name lookups are deterministic.
    pub schemas: BTreeMap<String, SchemaRecord>,
    /// Schema id to field system name to field metadata.
    pub schema_fields: HashMap<String, HashMap<String, SchemaFieldRecord>>,
    /// Schema id to column name to sampled values.
    pub samples: HashMap<String, HashMap<String, Vec<String>>>,
    /// Schema id to outgoing field references.
    pub references: HashMap<String, Vec<FieldReference>>,
}

impl WarehouseCatalog {
    pub fn new(org_prefix: impl Into<String>) -> Self {
        Self {
            org_prefix: org_prefix.into(),
            ..Self::default()
        }
    }

    /// Joins the metadata into per-table descriptions.
    #[must_use]
    pub fn into_overview(self) -> WarehouseOverview {
        let mut schema_by_system_name: HashMap<&str, (&str, &SchemaRecord)> = HashMap::new();
        for (schema_id, schema) in &self.schemas {
            schema_by_system_name
                .entry(schema.system_name.as_str())
                .or_insert((schema_id.as_str(), schema));
        }

        let no_fields = HashMap::new();
        let no_samples = HashMap::new();
        let no_columns = Vec::new();

        let tables = self.tables.iter().map(|table_name| {
            let schema = schema_by_system_name
                .get(schema_system_name(table_name).as_str())
                .copied();
            let schema_id = schema.map(|(schema_id, _)| schema_id);
            let fields = schema_id
                .and_then(|id| self.schema_fields.get(id))
                .unwrap_or(&no_fields);
            let samples = schema_id
                .and_then(|id| self.samples.get(id))
                .unwrap_or(&no_samples);

            let columns = self
                .columns
                .get(table_name)
                .unwrap_or(&no_columns)
                .iter()
                .filter(|column| !is_excluded_column(&column.name))
                .map(|column| {
                    let field = fields.get(&column.name).cloned().unwrap_or_default();
                    TableColumn {
                        name: column.name.clone(),
                        data_type: column.data_type.clone(),
                        is_multi: field.is_multi,
                        display_name: field.display_name,
                        samples: samples.get(&column.name).cloned(),
                        tooltip: field.tooltip,
                    }
                })
                .collect();

            let relationships = schema_id
                .and_then(|id| self.references.get(id))
                .map(|references| self.resolve_references(table_name, references))
                .unwrap_or_default();

            TableInfo {
                org_prefix: self.org_prefix.clone(),
                table_name: table_name.clone(),
                columns,
                schema_name: schema.and_then(|(_, schema)| schema.schema_type.clone()),
                relationships,
            }
        });

        WarehouseOverview::new(tables.collect::<Vec<_>>())
    }

    fn resolve_references(
        &self,
        table_name: &str,
        references: &[FieldReference],
    ) -> Vec<WarehouseRelationship> {
        references
            .iter()
            .filter_map(|reference| {
                let Some(target) = self.schemas.get(&reference.target_schema_id) else {
                    debug!(
                        table = table_name,
                        column = %reference.system_name,
                        target_schema_id = %reference.target_schema_id,
                        "skipping relationship to schema that is not visible"
                    );
                    return None;
                };
                Some(WarehouseRelationship {
                    from_table_name: table_name.to_string(),
                    from_column_name: reference.system_name.clone(),
                    target_table_name: raw_table_name(&target.system_name),
                    target_column_name: COLUMN_ID.to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, data_type: &str) -> ColumnRecord {
        ColumnRecord {
            name: name.to_string(),
            data_type: data_type.to_string(),
        }
    }

    fn catalog() -> WarehouseCatalog {
        let mut catalog = WarehouseCatalog::new("acme");
        catalog.tables = vec![
            "assay_run$raw".to_string(),
            "sample$raw".to_string(),
            "entry$raw".to_string(),
        ];
        catalog.columns.insert(
            "assay_run$raw".to_string(),
            vec![
                column("_pkey", "bigint"),
                column("id", "character varying"),
                column("sample", "character varying"),
                column("_sync_key", "bigint"),
                column("source_id", "character varying"),
                column("acl_resource_id", "character varying"),
                column("name$", "character varying"),
                column("plate", "character varying"),
            ],
        );
        catalog.columns.insert(
            "entry$raw".to_string(),
            vec![column("id", "character varying")],
        );
        catalog.schemas.insert(
            "ts_run".to_string(),
            SchemaRecord {
                system_name: "assay_run".to_string(),
                schema_type: Some("Run Schema".to_string()),
            },
        );
        catalog.schemas.insert(
            "ts_sample".to_string(),
            SchemaRecord {
                system_name: "sample".to_string(),
                schema_type: Some("Entity Schema".to_string()),
            },
        );
        catalog.schema_fields.insert(
            "ts_run".to_string(),
            HashMap::from([(
                "sample".to_string(),
                SchemaFieldRecord {
                    display_name: Some("Input Sample".to_string()),
                    is_multi: true,
                    tooltip: Some("Sample loaded on the instrument".to_string()),
                },
            )]),
        );
        catalog.samples.insert(
            "ts_run".to_string(),
            HashMap::from([
                ("id".to_string(), vec!["run_1".to_string(), "run_2".to_string()]),
                ("name$".to_string(), vec!["Run 1".to_string()]),
            ]),
        );
        catalog.references.insert(
            "ts_run".to_string(),
            vec![
                FieldReference {
                    system_name: "sample".to_string(),
                    target_schema_id: "ts_sample".to_string(),
                },
                FieldReference {
                    system_name: "plate".to_string(),
                    target_schema_id: "ts_hidden".to_string(),
                },
            ],
        );
        catalog
    }

    #[test]
    fn bookkeeping_columns_are_excluded() {
        let overview = catalog().into_overview();
        let run = overview.get("assay_run$raw").expect("run table");
        let names: Vec<&str> = run.columns.iter().map(|column| column.name.as_str()).collect();
        assert_eq!(names, vec!["id", "sample", "name$", "plate"]);
    }

    #[test]
    fn field_metadata_and_samples_are_joined_by_schema() {
        let overview = catalog().into_overview();
        let run = overview.get("assay_run$raw").expect("run table");
        assert_eq!(run.schema_name.as_deref(), Some("Run Schema"));

        let sample = &run.columns[1];
        assert_eq!(sample.display_name.as_deref(), Some("Input Sample"));
        assert!(sample.is_multi);
        assert_eq!(sample.tooltip.as_deref(), Some("Sample loaded on the instrument"));
        assert!(sample.samples.is_none());

        let id = &run.columns[0];
        assert_eq!(id.samples.as_deref(), Some(&["run_1".to_string(), "run_2".to_string()][..]));
        assert!(!id.is_multi);
    }

    #[test]
    fn relationships_to_hidden_schemas_are_dropped() {
        let overview = catalog().into_overview();
        let run = overview.get("assay_run$raw").expect("run table");
        assert_eq!(
            run.relationships,
            vec![WarehouseRelationship {
                from_table_name: "assay_run$raw".to_string(),
                from_column_name: "sample".to_string(),
                target_table_name: "sample$raw".to_string(),
                target_column_name: "id".to_string(),
            }]
        );
    }

    #[test]
    fn tables_without_schema_still_listed() {
        let overview = catalog().into_overview();
        assert_eq!(overview.len(), 3);

        let entry = overview.get("entry$raw").expect("entry table");
        assert!(entry.schema_name.is_none());
        assert!(entry.relationships.is_empty());
        assert_eq!(entry.columns.len(), 1);

        let sample = overview.get("sample$raw").expect("sample table");
        assert!(sample.columns.is_empty());
        assert_eq!(sample.schema_name.as_deref(), Some("Entity Schema"));
    }
}
