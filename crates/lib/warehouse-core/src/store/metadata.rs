use std::collections::HashMap;

use sqlx::PgConnection;
use tracing::info;
use warehouse_store::models::WarehouseOverview;
use warehouse_store::schema::{
    COLUMN_FILE_REGISTRY_ID,
    COLUMN_ID,
    COLUMN_NAME,
    SAMPLES_PER_SCHEMA,
    TABLE_ENTITY,
    TABLE_FIELD_DEFINITION,
    TABLE_SCHEMA,
    TABLE_SCHEMA_FIELD,
    qualified_table,
};

use crate::overview::{
    ColumnRecord,
    FieldReference,
    SchemaFieldRecord,
    SchemaRecord,
    WarehouseCatalog,
};

use super::postgres::{StoreResult, WarehouseStore};

impl WarehouseStore {
    /// Reads every metadata source inside one read-only transaction.
    ///
    /// # Errors
    /// Returns `StoreError` if any metadata query fails.
    pub async fn fetch_catalog(&self) -> StoreResult<WarehouseCatalog> {
        let org = self.org_prefix();
        let mut tx = self.pool().begin().await?;

        let mut catalog = WarehouseCatalog::new(org);
        catalog.schemas = fetch_schemas(&mut tx, org).await?.into_iter().collect();
        catalog.schema_fields = fetch_schema_fields(&mut tx, org).await?;
        catalog.samples = fetch_samples(&mut tx, org).await?;
        catalog.references = fetch_references(&mut tx, org).await?;
        catalog.tables = fetch_tables(&mut tx, org).await?;
        catalog.columns = fetch_columns(&mut tx, org).await?;

        tx.rollback().await?;
        info!(
            tables = catalog.tables.len(),
            schemas = catalog.schemas.len(),
            "loaded warehouse metadata"
        );
        Ok(catalog)
    }

    /// Fetches the metadata and assembles the table overview.
    ///
    /// # Errors
    /// Returns `StoreError` if any metadata query fails.
    pub async fn load_overview(&self) -> StoreResult<WarehouseOverview> {
        Ok(self.fetch_catalog().await?.into_overview())
    }
}

async fn fetch_tables(conn: &mut PgConnection, org: &str) -> StoreResult<Vec<String>> {
    // views only repeat what the raw tables hold
    let tables = sqlx::query_scalar(
        "SELECT table_name::text FROM information_schema.tables \
         WHERE table_schema = $1 AND table_type != 'VIEW' \
         ORDER BY table_name",
    )
    .bind(org)
    .fetch_all(&mut *conn)
    .await?;
    Ok(tables)
}

async fn fetch_columns(
    conn: &mut PgConnection,
    org: &str,
) -> StoreResult<HashMap<String, Vec<ColumnRecord>>> {
    let rows: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT table_name::text, column_name::text, data_type::text \
         FROM information_schema.columns \
         WHERE table_schema = $1 \
         ORDER BY table_name, ordinal_position",
    )
    .bind(org)
    .fetch_all(&mut *conn)
    .await?;

    let mut columns: HashMap<String, Vec<ColumnRecord>> = HashMap::new();
    for (table_name, name, data_type) in rows {
        columns
            .entry(table_name)
            .or_default()
            .push(ColumnRecord { name, data_type });
    }
    Ok(columns)
}

async fn fetch_schemas(
    conn: &mut PgConnection,
    org: &str,
) -> StoreResult<Vec<(String, SchemaRecord)>> {
    let sql = format!(
        "SELECT id::text, system_name::text, schema_type::text FROM {}",
        qualified_table(org, TABLE_SCHEMA)
    );
    let rows: Vec<(String, Option<String>, Option<String>)> =
        sqlx::query_as(&sql).fetch_all(&mut *conn).await?;

    Ok(rows
        .into_iter()
        .filter_map(|(id, system_name, schema_type)| {
            system_name.map(|system_name| {
                (
                    id,
                    SchemaRecord {
                        system_name,
                        schema_type,
                    },
                )
            })
        })
        .collect())
}

async fn fetch_schema_fields(
    conn: &mut PgConnection,
    org: &str,
) -> StoreResult<HashMap<String, HashMap<String, SchemaFieldRecord>>> {
    let sql = format!(
        "SELECT schema_id::text, system_name::text, name::text, is_multi, tooltip::text FROM {}",
        qualified_table(org, TABLE_SCHEMA_FIELD)
    );
    let rows: Vec<(Option<String>, Option<String>, Option<String>, Option<bool>, Option<String>)> =
        sqlx::query_as(&sql).fetch_all(&mut *conn).await?;

    let mut fields: HashMap<String, HashMap<String, SchemaFieldRecord>> = HashMap::new();
    for (schema_id, system_name, display_name, is_multi, tooltip) in rows {
        let (Some(schema_id), Some(system_name)) = (schema_id, system_name) else {
            continue;
        };
        fields.entry(schema_id).or_default().insert(
            system_name,
            SchemaFieldRecord {
                display_name,
                is_multi: is_multi.unwrap_or(false),
                tooltip,
            },
        );
    }
    Ok(fields)
}

async fn fetch_samples(
    conn: &mut PgConnection,
    org: &str,
) -> StoreResult<HashMap<String, HashMap<String, Vec<String>>>> {
    let sql = format!(
        "WITH ranked AS ( \
             SELECT id::text AS id, name::text AS name, \
                    file_registry_id::text AS file_registry_id, schema_id::text AS schema_id, \
                    ROW_NUMBER() OVER (PARTITION BY schema_id ORDER BY created_at DESC) AS rn \
             FROM {} \
             WHERE schema_id IS NOT NULL AND file_registry_id IS NOT NULL \
         ) \
         SELECT schema_id, id, name, file_registry_id FROM ranked WHERE rn <= $1 \
         ORDER BY schema_id, rn",
        qualified_table(org, TABLE_ENTITY)
    );
    let rows: Vec<(String, String, Option<String>, Option<String>)> = sqlx::query_as(&sql)
        .bind(SAMPLES_PER_SCHEMA)
        .fetch_all(&mut *conn)
        .await?;

    let mut samples: HashMap<String, HashMap<String, Vec<String>>> = HashMap::new();
    for (schema_id, id, name, file_registry_id) in rows {
        let entry = samples.entry(schema_id).or_default();
        entry.entry(COLUMN_ID.to_string()).or_default().push(id);
        if let Some(name) = name {
            entry.entry(COLUMN_NAME.to_string()).or_default().push(name);
        }
        if let Some(file_registry_id) = file_registry_id {
            entry
                .entry(COLUMN_FILE_REGISTRY_ID.to_string())
                .or_default()
                .push(file_registry_id);
        }
    }
    Ok(samples)
}

async fn fetch_references(
    conn: &mut PgConnection,
    org: &str,
) -> StoreResult<HashMap<String, Vec<FieldReference>>> {
    let sql = format!(
        "SELECT schema_id::text, system_name::text, target_schema_id::text FROM {} \
         WHERE target_schema_id IS NOT NULL",
        qualified_table(org, TABLE_FIELD_DEFINITION)
    );
    let rows: Vec<(Option<String>, Option<String>, String)> =
        sqlx::query_as(&sql).fetch_all(&mut *conn).await?;

    let mut references: HashMap<String, Vec<FieldReference>> = HashMap::new();
    for (schema_id, system_name, target_schema_id) in rows {
        let (Some(schema_id), Some(system_name)) = (schema_id, system_name) else {
            continue;
        };
        references.entry(schema_id).or_default().push(FieldReference {
            system_name,
            target_schema_id,
        });
    }
    Ok(references)
}
