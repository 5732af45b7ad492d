pub const RAW_TABLE_SUFFIX: &str = "$raw";

pub const TABLE_SCHEMA: &str = "schema$raw";
pub const TABLE_SCHEMA_FIELD: &str = "schema_field$raw";
pub const TABLE_ENTITY: &str = "entity$raw";
pub const TABLE_FIELD_DEFINITION: &str = "field_definition$raw";

pub const COLUMN_ID: &str = "id";
pub const COLUMN_NAME: &str = "name$";
pub const COLUMN_FILE_REGISTRY_ID: &str = "file_registry_id$";

/// Rows sampled per schema type when collecting example values.
pub const SAMPLES_PER_SCHEMA: i64 = 3;

/// Bookkeeping columns that exist for internal sync and must never be queried.
pub const EXCLUDED_COLUMNS: [&str; 4] = ["_pkey", "_sync_key", "acl_resource_id", "source_id"];

#[must_use]
pub fn is_excluded_column(column_name: &str) -> bool {
    EXCLUDED_COLUMNS.contains(&column_name)
}

/// Maps a warehouse table name back to the platform schema system name.
#[must_use]
pub fn schema_system_name(table_name: &str) -> String {
    table_name.replace(RAW_TABLE_SUFFIX, "")
}

/// Maps a platform schema system name to its raw warehouse table.
#[must_use]
pub fn raw_table_name(system_name: &str) -> String {
    format!("{system_name}{RAW_TABLE_SUFFIX}")
}

/// Quotes a Postgres identifier, doubling embedded quotes.
#[must_use]
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Builds `"org"."table"` for a tenant-scoped table.
#[must_use]
pub fn qualified_table(org_prefix: &str, table_name: &str) -> String {
    format!(
        "{}.{}",
        quote_identifier(org_prefix),
        quote_identifier(table_name)
    )
}
