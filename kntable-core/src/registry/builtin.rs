//! Built-in value factories for time types and file-system locations.
//!
//! Time values use microsecond precision; nanoseconds below that are
//! truncated on encode.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike,
};
use serde_json::{json, Value};

use super::{value_factory_id, ExtensionRegistry, ValueFactory};
use crate::error::{Error, Result};
use crate::value::StorageValue;

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;
const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_DAY: i64 = 86_400 * NANOS_PER_SECOND;

const TIME_PACKAGE: &str = "org.knime.core.data.v2.time";
const FS_LOCATION_FACTORY: &str = "org.knime.filehandling.core.data.location.FSLocationValueFactory";

/// Register all built-in factories.
pub fn register_builtin_factories(registry: &mut ExtensionRegistry) -> Result<()> {
    let module = module_path!();
    let int64_spec = json!("int64");
    let local_dt_spec = json!({"type": "struct", "inner_types": ["int64", "int64"]});

    registry.register(
        module,
        "LocalDateFactory",
        &int64_spec.to_string(),
        &traits(&time_id("LocalDateValueFactory"), 0),
        LocalDateFactory,
    )?;
    registry.register(
        module,
        "LocalTimeFactory",
        &int64_spec.to_string(),
        &traits(&time_id("LocalTimeValueFactory"), 0),
        LocalTimeFactory,
    )?;
    registry.register(
        module,
        "LocalDateTimeFactory",
        &local_dt_spec.to_string(),
        &traits(&time_id("LocalDateTimeValueFactory"), 2),
        LocalDateTimeFactory,
    )?;
    registry.register(
        module,
        "DurationFactory",
        &json!({"type": "struct", "inner_types": ["int64", "int32"]}).to_string(),
        &traits(&time_id("DurationValueFactory"), 2),
        DurationFactory,
    )?;
    registry.register(
        module,
        "ZonedDateTimeFactory",
        &json!({"type": "struct", "inner_types": ["int64", "int64", "int32", "string"]})
            .to_string(),
        &traits(&time_id("ZonedDateTimeValueFactory2"), 4),
        ZonedDateTimeFactory,
    )?;
    registry.register(
        module,
        "FsLocationFactory",
        &json!({"type": "struct", "inner_types": ["string", "string", "string"]}).to_string(),
        &traits(&value_factory_id(FS_LOCATION_FACTORY), 3),
        FsLocationFactory,
    )?;
    Ok(())
}

fn time_id(factory: &str) -> String {
    value_factory_id(&format!("{TIME_PACKAGE}.{factory}"))
}

/// Traits spec for a logical leaf (`arity == 0`) or a logical struct of
/// `arity` primitive children.
fn traits(logical_type: &str, arity: usize) -> String {
    let top = json!({ "logical_type": logical_type });
    let spec = if arity == 0 {
        json!({"type": "simple", "traits": top})
    } else {
        let inner: Vec<Value> = (0..arity)
            .map(|_| json!({"type": "simple", "traits": {}}))
            .collect();
        json!({"type": "struct", "traits": top, "inner": inner})
    };
    spec.to_string()
}

fn fields<'a>(storage: &'a StorageValue, arity: usize, what: &str) -> Result<&'a [StorageValue]> {
    match storage.as_struct() {
        Some(f) if f.len() == arity => Ok(f),
        _ => Err(Error::conversion(format!(
            "{what} expects a struct of {arity} fields, got {}",
            storage.kind_name()
        ))),
    }
}

fn long_field(fields: &[StorageValue], i: usize, what: &str) -> Result<i64> {
    fields[i]
        .as_long()
        .ok_or_else(|| Error::conversion(format!("{what}: field {i} must be int64")))
}

fn int_field(fields: &[StorageValue], i: usize, what: &str) -> Result<i32> {
    fields[i]
        .as_int()
        .ok_or_else(|| Error::conversion(format!("{what}: field {i} must be int32")))
}

fn string_field(fields: &[StorageValue], i: usize, what: &str) -> Result<Option<String>> {
    match &fields[i] {
        StorageValue::Null => Ok(None),
        StorageValue::String(s) => Ok(Some(s.clone())),
        other => Err(Error::conversion(format!(
            "{what}: field {i} must be string, got {}",
            other.kind_name()
        ))),
    }
}

fn day_of_epoch(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64 - UNIX_EPOCH_DAYS_FROM_CE
}

fn date_from_epoch_day(day: i64) -> Result<NaiveDate> {
    day.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(|d| i32::try_from(d).ok())
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| Error::conversion(format!("day of epoch {day} is out of range")))
}

fn nano_of_day(time: NaiveTime) -> i64 {
    let micros = time.nanosecond().min(999_999_999) / 1_000;
    time.num_seconds_from_midnight() as i64 * NANOS_PER_SECOND + micros as i64 * 1_000
}

fn time_from_nano_of_day(nanos: i64) -> Result<NaiveTime> {
    if !(0..NANOS_PER_DAY).contains(&nanos) {
        return Err(Error::conversion(format!("nano of day {nanos} is out of range")));
    }
    let secs = (nanos / NANOS_PER_SECOND) as u32;
    let sub_micros = ((nanos % NANOS_PER_SECOND) / 1_000) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, sub_micros * 1_000)
        .ok_or_else(|| Error::conversion(format!("nano of day {nanos} is out of range")))
}

/// `NaiveDate` as days since 1970-01-01.
pub struct LocalDateFactory;

impl ValueFactory for LocalDateFactory {
    type Value = NaiveDate;

    fn encode(&self, value: &NaiveDate) -> Result<StorageValue> {
        Ok(StorageValue::Long(day_of_epoch(*value)))
    }

    fn decode(&self, storage: &StorageValue) -> Result<NaiveDate> {
        let day = storage
            .as_long()
            .ok_or_else(|| Error::conversion("local date expects int64 storage"))?;
        date_from_epoch_day(day)
    }
}

/// `NaiveTime` as nanoseconds of day.
pub struct LocalTimeFactory;

impl ValueFactory for LocalTimeFactory {
    type Value = NaiveTime;

    fn encode(&self, value: &NaiveTime) -> Result<StorageValue> {
        Ok(StorageValue::Long(nano_of_day(*value)))
    }

    fn decode(&self, storage: &StorageValue) -> Result<NaiveTime> {
        let nanos = storage
            .as_long()
            .ok_or_else(|| Error::conversion("local time expects int64 storage"))?;
        time_from_nano_of_day(nanos)
    }
}

/// `NaiveDateTime` as (day of epoch, nano of day).
pub struct LocalDateTimeFactory;

impl LocalDateTimeFactory {
    fn encode_fields(value: &NaiveDateTime) -> Vec<StorageValue> {
        vec![
            StorageValue::Long(day_of_epoch(value.date())),
            StorageValue::Long(nano_of_day(value.time())),
        ]
    }

    fn decode_fields(fields: &[StorageValue], what: &str) -> Result<NaiveDateTime> {
        let date = date_from_epoch_day(long_field(fields, 0, what)?)?;
        let time = time_from_nano_of_day(long_field(fields, 1, what)?)?;
        Ok(date.and_time(time))
    }
}

impl ValueFactory for LocalDateTimeFactory {
    type Value = NaiveDateTime;

    fn encode(&self, value: &NaiveDateTime) -> Result<StorageValue> {
        Ok(StorageValue::Struct(Self::encode_fields(value)))
    }

    fn decode(&self, storage: &StorageValue) -> Result<NaiveDateTime> {
        Self::decode_fields(fields(storage, 2, "local date time")?, "local date time")
    }
}

/// `DateTime<FixedOffset>` as (day of epoch, nano of day, offset seconds,
/// zone id). Day and time are the local wall clock.
pub struct ZonedDateTimeFactory;

impl ValueFactory for ZonedDateTimeFactory {
    type Value = DateTime<FixedOffset>;

    fn encode(&self, value: &DateTime<FixedOffset>) -> Result<StorageValue> {
        let mut f = LocalDateTimeFactory::encode_fields(&value.naive_local());
        f.push(StorageValue::Int(value.offset().local_minus_utc()));
        f.push(StorageValue::String(value.offset().to_string()));
        Ok(StorageValue::Struct(f))
    }

    fn decode(&self, storage: &StorageValue) -> Result<DateTime<FixedOffset>> {
        const WHAT: &str = "zoned date time";
        let f = fields(storage, 4, WHAT)?;
        let local = LocalDateTimeFactory::decode_fields(&f[..2], WHAT)?;
        let offset_secs = int_field(f, 2, WHAT)?;
        let offset = FixedOffset::east_opt(offset_secs)
            .ok_or_else(|| Error::conversion(format!("invalid zone offset {offset_secs}")))?;
        local
            .checked_sub_signed(Duration::seconds(offset_secs as i64))
            .map(|utc| DateTime::from_naive_utc_and_offset(utc, offset))
            .ok_or_else(|| Error::conversion(format!("{local} {offset} is out of range")))
    }
}

/// `chrono::Duration` as (seconds, nanos) with nanos in `0..1e9`.
pub struct DurationFactory;

impl ValueFactory for DurationFactory {
    type Value = Duration;

    fn encode(&self, value: &Duration) -> Result<StorageValue> {
        let mut secs = value.num_seconds();
        let mut nanos = value.subsec_nanos();
        if nanos < 0 {
            secs -= 1;
            nanos += NANOS_PER_SECOND as i32;
        }
        Ok(StorageValue::Struct(vec![
            StorageValue::Long(secs),
            StorageValue::Int(nanos / 1_000 * 1_000),
        ]))
    }

    fn decode(&self, storage: &StorageValue) -> Result<Duration> {
        const WHAT: &str = "duration";
        let f = fields(storage, 2, WHAT)?;
        let secs = long_field(f, 0, WHAT)?;
        let nanos = int_field(f, 1, WHAT)?;
        Duration::try_seconds(secs)
            .and_then(|d| d.checked_add(&Duration::nanoseconds((nanos / 1_000 * 1_000) as i64)))
            .ok_or_else(|| Error::conversion(format!("duration of {secs}s is out of range")))
    }
}

/// A location in a file system: category (e.g. `LOCAL`), optional
/// specifier, and path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FsLocation {
    pub category: String,
    pub specifier: Option<String>,
    pub path: String,
}

impl FsLocation {
    pub fn new(
        category: impl Into<String>,
        specifier: Option<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            specifier,
            path: path.into(),
        }
    }
}

pub struct FsLocationFactory;

impl ValueFactory for FsLocationFactory {
    type Value = FsLocation;

    fn encode(&self, value: &FsLocation) -> Result<StorageValue> {
        Ok(StorageValue::Struct(vec![
            StorageValue::String(value.category.clone()),
            value.specifier.clone().into(),
            StorageValue::String(value.path.clone()),
        ]))
    }

    fn decode(&self, storage: &StorageValue) -> Result<FsLocation> {
        const WHAT: &str = "fs location";
        let f = fields(storage, 3, WHAT)?;
        let category = string_field(f, 0, WHAT)?
            .ok_or_else(|| Error::conversion("fs location without category"))?;
        let path = string_field(f, 2, WHAT)?
            .ok_or_else(|| Error::conversion("fs location without path"))?;
        Ok(FsLocation {
            category,
            specifier: string_field(f, 1, WHAT)?,
            path,
        })
    }
}
