//! Geometry columns.
//!
//! The geospatial value factories store a geometry as a struct of its WKB
//! payload and its coordinate reference system. [`GeoFactory`] hides that
//! storage behind [`GeoValue`], and [`GeoColumn`] is a logical column of
//! geometries that can be concatenated without decoding.

pub mod wkb;

use std::fmt;
use std::sync::Arc;

use arrow::array::ArrayRef;
use geo_types::Geometry;
use kntable_core::registry::{value_factory_id, Converter, ExtensionRegistry, ValueFactory};
use kntable_core::types::{blob, string, struct_, KnimeType};
use kntable_core::{Error as CoreError, StorageValue};
use tracing::debug;
use wkt::{ToWkt, TryFromWkt};

use crate::error::{BridgeError, Result};
use crate::view::{LogicalColumn, LogicalColumnBuilder};

pub use wkb::{read_wkb, write_wkb, WkbError};

/// Package shared by every geospatial value factory.
pub const GEO_FAMILY: &str = "org.knime.geospatial";

/// Value factory classes of the geospatial cell types.
pub const GEO_VALUE_FACTORIES: [&str; 7] = [
    "org.knime.geospatial.core.data.cell.GeoPointCell$ValueFactory",
    "org.knime.geospatial.core.data.cell.GeoLineCell$ValueFactory",
    "org.knime.geospatial.core.data.cell.GeoPolygonCell$ValueFactory",
    "org.knime.geospatial.core.data.cell.GeoMultiPointCell$ValueFactory",
    "org.knime.geospatial.core.data.cell.GeoMultiLineCell$ValueFactory",
    "org.knime.geospatial.core.data.cell.GeoMultiPolygonCell$ValueFactory",
    "org.knime.geospatial.core.data.cell.GeoCollectionCell$ValueFactory",
];

/// Whether a logical identifier belongs to the geospatial family.
pub fn is_geo_identifier(logical_type: &str) -> bool {
    logical_type.contains(GEO_FAMILY)
}

/// Storage of every geometry: `struct<variable_width_binary, string>`.
pub fn geo_storage_type() -> kntable_core::Result<KnimeType> {
    struct_([blob(), string()])
}

/// A geometry with its coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoValue {
    pub geometry: Geometry<f64>,
    pub crs: String,
}

impl GeoValue {
    pub fn new(geometry: impl Into<Geometry<f64>>, crs: impl Into<String>) -> Self {
        Self {
            geometry: geometry.into(),
            crs: crs.into(),
        }
    }

    /// Parse a geometry from well-known text.
    pub fn from_wkt(text: &str, crs: impl Into<String>) -> Result<Self> {
        let geometry = Geometry::<f64>::try_from_wkt_str(text)
            .map_err(|e| BridgeError::conversion(format!("invalid WKT '{text}': {e}")))?;
        Ok(Self::new(geometry, crs))
    }

    pub fn to_wkt(&self) -> String {
        self.geometry.wkt_string()
    }

    pub fn to_wkb(&self) -> Vec<u8> {
        write_wkb(&self.geometry)
    }
}

impl fmt::Display for GeoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.crs.is_empty() {
            write!(f, "{}", self.to_wkt())
        } else {
            write!(f, "{} ({})", self.to_wkt(), self.crs)
        }
    }
}

/// [`GeoValue`] as (WKB, CRS).
pub struct GeoFactory;

impl ValueFactory for GeoFactory {
    type Value = GeoValue;

    fn encode(&self, value: &GeoValue) -> kntable_core::Result<StorageValue> {
        Ok(StorageValue::Struct(vec![
            StorageValue::Blob(value.to_wkb()),
            StorageValue::String(value.crs.clone()),
        ]))
    }

    fn decode(&self, storage: &StorageValue) -> kntable_core::Result<GeoValue> {
        let (wkb, crs) = match storage.as_struct() {
            Some([wkb, crs]) => (wkb, crs),
            _ => {
                return Err(CoreError::conversion(format!(
                    "geometry expects a struct of 2 fields, got {}",
                    storage.kind_name()
                )));
            }
        };
        let wkb = wkb
            .as_bytes()
            .ok_or_else(|| CoreError::conversion("geometry payload must be a blob"))?;
        let geometry = read_wkb(wkb).map_err(|e| CoreError::conversion(e.to_string()))?;
        // A missing CRS reads as the empty string.
        let crs = crs.as_str().unwrap_or_default().to_string();
        Ok(GeoValue { geometry, crs })
    }
}

/// Register [`GeoFactory`] for every geospatial cell type.
///
/// The point factory is registered first and is the default identifier
/// for [`GeoValue`].
pub fn register_geo_factories(registry: &mut ExtensionRegistry) -> kntable_core::Result<()> {
    for class in GEO_VALUE_FACTORIES {
        registry.register_type(&value_factory_id(class), geo_storage_type()?, None, GeoFactory)?;
    }
    debug!(factories = GEO_VALUE_FACTORIES.len(), "registered geospatial value factories");
    Ok(())
}

/// A logical column of geometries.
#[derive(Debug)]
pub struct GeoColumn {
    inner: LogicalColumn<GeoValue>,
}

impl GeoColumn {
    /// View `chunks` as geometries of the geospatial type `ktype`.
    pub fn try_new(ktype: &KnimeType, chunks: Vec<ArrayRef>) -> Result<Self> {
        check_geo_type(ktype)?;
        Ok(Self {
            inner: LogicalColumn::try_new(ktype, chunks)?,
        })
    }

    /// Encode geometries into a new column.
    pub fn from_values(
        ktype: &KnimeType,
        values: &[Option<GeoValue>],
        chunk_size: usize,
    ) -> Result<Self> {
        check_geo_type(ktype)?;
        let mut builder = LogicalColumnBuilder::<GeoValue>::try_new(ktype, chunk_size)?;
        builder.extend(values.iter().map(Option::as_ref))?;
        Ok(Self {
            inner: builder.finish_column()?,
        })
    }

    /// Append the chunks of `other`.
    ///
    /// Already encoded chunks are shared, never decoded.
    pub fn concat(&self, other: &GeoColumn) -> Result<Self> {
        Ok(Self {
            inner: self.inner.concat(&other.inner)?,
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<Option<GeoValue>> {
        self.inner.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<Option<GeoValue>>> + '_ {
        self.inner.iter()
    }

    pub fn decode_all(&self) -> Result<Vec<Option<GeoValue>>> {
        self.inner.decode_all()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &ArrayRef> + '_ {
        self.inner.chunks()
    }

    pub fn num_chunks(&self) -> usize {
        self.inner.num_chunks()
    }

    pub fn as_logical_column(&self) -> &LogicalColumn<GeoValue> {
        &self.inner
    }
}

fn check_geo_type(ktype: &KnimeType) -> Result<()> {
    match ktype.as_logical() {
        Some(l) if is_geo_identifier(l.logical_type()) => Ok(()),
        _ => Err(BridgeError::conversion(format!("{ktype} is not a geometry type"))),
    }
}

/// Converter for a geospatial identifier, if registered.
pub fn geo_converter<'r>(
    registry: &'r ExtensionRegistry,
    logical_type: &str,
) -> Option<&'r Arc<Converter>> {
    registry
        .by_identifier(logical_type)
        .filter(|c| is_geo_identifier(c.logical_type()) && c.value_type().is::<GeoValue>())
}
