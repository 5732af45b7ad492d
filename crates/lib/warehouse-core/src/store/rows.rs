use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde_json::{Map, Value};
use sqlx::error::BoxDynError;
use sqlx::postgres::types::{Oid, PgInterval};
use sqlx::postgres::{PgHasArrayType, PgRow, PgTypeInfo, PgValueFormat, PgValueRef, Postgres};
use sqlx::types::{Decimal, Json, Uuid};
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};
use tracing::warn;

use super::postgres::StoreResult;

/// Query results as JSON objects, one per row, in column order.
pub type QueryRows = Vec<Map<String, Value>>;

pub(crate) fn row_to_json(row: &PgRow) -> StoreResult<Map<String, Value>> {
    let mut object = Map::with_capacity(row.len());
    for column in row.columns() {
        let value = column_value(row, column.ordinal(), column.type_info().name())?;
        object.insert(column.name().to_string(), value);
    }
    Ok(object)
}

fn column_value(row: &PgRow, index: usize, type_name: &str) -> StoreResult<Value> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name {
        "BOOL" => Value::Bool(row.try_get(index)?),
        "INT2" => Value::from(row.try_get::<i16, _>(index)?),
        "INT4" => Value::from(row.try_get::<i32, _>(index)?),
        "INT8" => Value::from(row.try_get::<i64, _>(index)?),
        "OID" => Value::from(row.try_get::<Oid, _>(index)?.0),
        "FLOAT4" => Value::from(f64::from(row.try_get::<f32, _>(index)?)),
        "FLOAT8" => Value::from(row.try_get::<f64, _>(index)?),
        // stringified so no precision is lost
        "NUMERIC" => Value::String(row.try_get::<NumericText, _>(index)?.0),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => Value::String(row.try_get(index)?),
        "JSON" | "JSONB" => row.try_get::<Value, _>(index)?,
        "UUID" => Value::String(row.try_get::<Uuid, _>(index)?.to_string()),
        "TIMESTAMPTZ" => Value::String(iso_utc_datetime(row.try_get(index)?)),
        "TIMESTAMP" => Value::String(iso_naive_datetime(row.try_get(index)?)),
        "DATE" => Value::String(row.try_get::<NaiveDate, _>(index)?.to_string()),
        "TIME" => Value::String(iso_time(row.try_get(index)?)),
        "INTERVAL" => Value::String(interval_text(&row.try_get(index)?)),
        "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => {
            Value::from(row.try_get::<Vec<String>, _>(index)?)
        }
        "INT2[]" => Value::from(row.try_get::<Vec<i16>, _>(index)?),
        "INT4[]" => Value::from(row.try_get::<Vec<i32>, _>(index)?),
        "INT8[]" => Value::from(row.try_get::<Vec<i64>, _>(index)?),
        "OID[]" => string_array(row.try_get::<Vec<Oid>, _>(index)?, |oid| oid.0.to_string()),
        "FLOAT4[]" => Value::from(
            row.try_get::<Vec<f32>, _>(index)?
                .into_iter()
                .map(f64::from)
                .collect::<Vec<_>>(),
        ),
        "FLOAT8[]" => Value::from(row.try_get::<Vec<f64>, _>(index)?),
        "BOOL[]" => Value::from(row.try_get::<Vec<bool>, _>(index)?),
        "NUMERIC[]" => string_array(row.try_get::<Vec<NumericText>, _>(index)?, |n| n.0),
        "JSON[]" | "JSONB[]" => Value::Array(
            row.try_get::<Vec<Json<Value>>, _>(index)?
                .into_iter()
                .map(|json| json.0)
                .collect(),
        ),
        "UUID[]" => string_array(row.try_get::<Vec<Uuid>, _>(index)?, |id| id.to_string()),
        "TIMESTAMPTZ[]" => string_array(row.try_get(index)?, iso_utc_datetime),
        "TIMESTAMP[]" => string_array(row.try_get(index)?, iso_naive_datetime),
        "DATE[]" => string_array(row.try_get::<Vec<NaiveDate>, _>(index)?, |d| d.to_string()),
        "TIME[]" => string_array(row.try_get(index)?, iso_time),
        "INTERVAL[]" => string_array(row.try_get::<Vec<PgInterval>, _>(index)?, |iv| {
            interval_text(&iv)
        }),
        // enums and text-like extension types are sent as their label
        _ => match row.try_get_unchecked::<String, _>(index) {
            Ok(text) => Value::String(text),
            Err(err) => {
                warn!(column = index, type_name, error = %err, "column type has no JSON mapping");
                Value::String(format!("<{type_name}>"))
            }
        },
    };
    Ok(value)
}

fn string_array<T>(values: Vec<T>, render: impl Fn(T) -> String) -> Value {
    Value::Array(values.into_iter().map(|value| Value::String(render(value))).collect())
}

/// A `numeric` rendered as exact decimal text, including the values
/// `Decimal` cannot hold (`NaN`, infinities, more than 28 significant digits).
struct NumericText(String);

impl Type<Postgres> for NumericText {
    fn type_info() -> PgTypeInfo {
        <Decimal as Type<Postgres>>::type_info()
    }
}

impl PgHasArrayType for NumericText {
    fn array_type_info() -> PgTypeInfo {
        <Decimal as PgHasArrayType>::array_type_info()
    }
}

impl<'r> Decode<'r, Postgres> for NumericText {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        if matches!(value.format(), PgValueFormat::Text) {
            return Ok(Self(value.as_str()?.to_string()));
        }
        let bytes = value.as_bytes()?;
        match <Decimal as Decode<'r, Postgres>>::decode(value) {
            Ok(decimal) => Ok(Self(decimal.to_string())),
            Err(err) => numeric_text(bytes).map(Self).ok_or(err),
        }
    }
}

/// Renders the binary `numeric` wire format: four `u16` header words
/// (digit count, weight, sign, display scale) followed by base-10000 digits.
fn numeric_text(bytes: &[u8]) -> Option<String> {
    let word = |at: usize| bytes.get(at..at + 2).map(|pair| [pair[0], pair[1]]);
    let ndigits = usize::from(u16::from_be_bytes(word(0)?));
    let weight = i32::from(i16::from_be_bytes(word(2)?));
    let sign = u16::from_be_bytes(word(4)?);
    let dscale = usize::from(u16::from_be_bytes(word(6)?));

    match sign {
        0xC000 => return Some("NaN".to_string()),
        0xD000 => return Some("Infinity".to_string()),
        0xF000 => return Some("-Infinity".to_string()),
        _ => {}
    }

    let digits = (0..ndigits)
        .map(|i| word(8 + 2 * i).map(u16::from_be_bytes))
        .collect::<Option<Vec<_>>>()?;
    let digit = |group: i32| {
        usize::try_from(group)
            .ok()
            .and_then(|group| digits.get(group).copied())
            .unwrap_or(0)
    };

    let mut text = String::new();
    if sign == 0x4000 {
        text.push('-');
    }
    if weight < 0 {
        text.push('0');
    } else {
        text.push_str(&digit(0).to_string());
        for group in 1..=weight {
            text.push_str(&format!("{:04}", digit(group)));
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut group = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", digit(group)));
            group += 1;
        }
        fraction.truncate(dscale);
        text.push('.');
        text.push_str(&fraction);
    }
    Some(text)
}

/// Formats an interval the way Postgres prints it by default, e.g.
/// `1 year 2 mons 3 days 04:05:06.5`.
fn interval_text(interval: &PgInterval) -> String {
    let mut parts = Vec::new();
    push_interval_unit(&mut parts, interval.months / 12, "year");
    push_interval_unit(&mut parts, interval.months % 12, "mon");
    push_interval_unit(&mut parts, interval.days, "day");

    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let micros = interval.microseconds.unsigned_abs();
        let seconds = micros / 1_000_000;
        let mut clock = format!(
            "{sign}{:02}:{:02}:{:02}",
            seconds / 3600,
            seconds / 60 % 60,
            seconds % 60
        );
        let fraction = micros % 1_000_000;
        if fraction != 0 {
            clock.push_str(format!(".{fraction:06}").trim_end_matches('0'));
        }
        parts.push(clock);
    }
    parts.join(" ")
}

fn push_interval_unit(parts: &mut Vec<String>, value: i32, unit: &str) {
    match value {
        0 => {}
        1 => parts.push(format!("1 {unit}")),
        _ => parts.push(format!("{value} {unit}s")),
    }
}

/// Formats a naive timestamp the way ISO-8601 consumers expect, with
/// microseconds only when present.
#[must_use]
pub fn iso_naive_datetime(value: NaiveDateTime) -> String {
    let base = value.format("%Y-%m-%dT%H:%M:%S");
    match value.nanosecond() / 1_000 {
        0 => base.to_string(),
        micros => format!("{base}.{micros:06}"),
    }
}

fn iso_utc_datetime(value: DateTime<Utc>) -> String {
    format!("{}+00:00", iso_naive_datetime(value.naive_utc()))
}

fn iso_time(value: NaiveTime) -> String {
    let base = value.format("%H:%M:%S");
    match value.nanosecond() / 1_000 {
        0 => base.to_string(),
        micros => format!("{base}.{micros:06}"),
    }
}
