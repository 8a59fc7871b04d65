//! Well-known binary (WKB) for 2D geometries.
//!
//! Reads both byte orders and writes little endian. Only the seven OGC 2D
//! geometry types are supported; Z/M variants are rejected.

use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use thiserror::Error;

const BIG_ENDIAN: u8 = 0;
const LITTLE_ENDIAN: u8 = 1;

const WKB_POINT: u32 = 1;
const WKB_LINE_STRING: u32 = 2;
const WKB_POLYGON: u32 = 3;
const WKB_MULTI_POINT: u32 = 4;
const WKB_MULTI_LINE_STRING: u32 = 5;
const WKB_MULTI_POLYGON: u32 = 6;
const WKB_GEOMETRY_COLLECTION: u32 = 7;

/// Collections nested deeper than this are rejected.
const MAX_DEPTH: usize = 64;

/// Smallest encoding of a geometry: byte order, type and one count.
const MIN_GEOMETRY_SIZE: usize = 1 + 4 + 4;
const COORD_SIZE: usize = 16;

/// Errors while reading WKB.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WkbError {
    #[error("WKB truncated at byte {0}")]
    Truncated(usize),

    #[error("invalid WKB byte order {0}")]
    ByteOrder(u8),

    #[error("unsupported WKB geometry type {0}")]
    GeometryType(u32),

    #[error("WKB collections nested too deeply")]
    TooDeep,

    #[error("{0} trailing bytes after WKB geometry")]
    TrailingBytes(usize),

    #[error("expected WKB {expected} inside a multi geometry, got type {got}")]
    MemberType { expected: &'static str, got: u32 },
}

/// Parse a WKB payload into a geometry.
pub fn read_wkb(data: &[u8]) -> Result<Geometry<f64>, WkbError> {
    let mut reader = Reader {
        data,
        pos: 0,
        little_endian: true,
    };
    let geometry = reader.geometry(0)?;
    match data.len() - reader.pos {
        0 => Ok(geometry),
        n => Err(WkbError::TrailingBytes(n)),
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], WkbError> {
        let end = self.pos + N;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(WkbError::Truncated(self.pos))?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32, WkbError> {
        let bytes = self.take::<4>()?;
        Ok(if self.little_endian {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        })
    }

    fn f64(&mut self) -> Result<f64, WkbError> {
        let bytes = self.take::<8>()?;
        Ok(if self.little_endian {
            f64::from_le_bytes(bytes)
        } else {
            f64::from_be_bytes(bytes)
        })
    }

    /// A count of items that each need at least `item_size` bytes.
    fn count(&mut self, item_size: usize) -> Result<usize, WkbError> {
        let n = self.u32()? as usize;
        let remaining = self.data.len() - self.pos;
        if n.saturating_mul(item_size) > remaining {
            return Err(WkbError::Truncated(self.data.len()));
        }
        Ok(n)
    }

    fn coord(&mut self) -> Result<Coord<f64>, WkbError> {
        Ok(Coord {
            x: self.f64()?,
            y: self.f64()?,
        })
    }

    fn line_string(&mut self) -> Result<LineString<f64>, WkbError> {
        let n = self.count(COORD_SIZE)?;
        (0..n)
            .map(|_| self.coord())
            .collect::<Result<Vec<_>, _>>()
            .map(LineString::new)
    }

    fn polygon(&mut self) -> Result<Polygon<f64>, WkbError> {
        let n = self.count(4)?;
        let mut rings = (0..n)
            .map(|_| self.line_string())
            .collect::<Result<Vec<_>, _>>()?;
        if rings.is_empty() {
            return Ok(Polygon::new(LineString::new(vec![]), vec![]));
        }
        let exterior = rings.remove(0);
        Ok(Polygon::new(exterior, rings))
    }

    fn header(&mut self) -> Result<u32, WkbError> {
        let [order] = self.take::<1>()?;
        self.little_endian = match order {
            LITTLE_ENDIAN => true,
            BIG_ENDIAN => false,
            other => return Err(WkbError::ByteOrder(other)),
        };
        self.u32()
    }

    fn members<T>(
        &mut self,
        depth: usize,
        expected: &'static str,
        pick: fn(Geometry<f64>) -> Option<T>,
    ) -> Result<Vec<T>, WkbError> {
        let n = self.count(MIN_GEOMETRY_SIZE)?;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let start = self.pos;
            let geometry = self.geometry(depth + 1)?;
            let member = pick(geometry).ok_or_else(|| WkbError::MemberType {
                expected,
                got: self.type_at(start),
            })?;
            out.push(member);
        }
        Ok(out)
    }

    fn type_at(&self, start: usize) -> u32 {
        let mut probe = Reader {
            data: self.data,
            pos: start,
            little_endian: true,
        };
        probe.header().unwrap_or(0)
    }

    fn geometry(&mut self, depth: usize) -> Result<Geometry<f64>, WkbError> {
        if depth > MAX_DEPTH {
            return Err(WkbError::TooDeep);
        }
        let geometry = match self.header()? {
            WKB_POINT => Geometry::Point(Point::from(self.coord()?)),
            WKB_LINE_STRING => Geometry::LineString(self.line_string()?),
            WKB_POLYGON => Geometry::Polygon(self.polygon()?),
            WKB_MULTI_POINT => Geometry::MultiPoint(MultiPoint::new(self.members(
                depth,
                "point",
                |g| match g {
                    Geometry::Point(p) => Some(p),
                    _ => None,
                },
            )?)),
            WKB_MULTI_LINE_STRING => {
                Geometry::MultiLineString(MultiLineString::new(self.members(
                    depth,
                    "line string",
                    |g| match g {
                        Geometry::LineString(l) => Some(l),
                        _ => None,
                    },
                )?))
            }
            WKB_MULTI_POLYGON => Geometry::MultiPolygon(MultiPolygon::new(self.members(
                depth,
                "polygon",
                |g| match g {
                    Geometry::Polygon(p) => Some(p),
                    _ => None,
                },
            )?)),
            WKB_GEOMETRY_COLLECTION => {
                Geometry::GeometryCollection(GeometryCollection(self.members(depth, "geometry", Some)?))
            }
            other => return Err(WkbError::GeometryType(other)),
        };
        Ok(geometry)
    }
}

/// Encode a geometry as little-endian WKB.
///
/// `Line`, `Rect` and `Triangle` have no WKB type of their own and are
/// written as a line string or polygon.
pub fn write_wkb(geometry: &Geometry<f64>) -> Vec<u8> {
    let mut out = Vec::new();
    write_geometry(&mut out, geometry);
    out
}

fn write_header(out: &mut Vec<u8>, geometry_type: u32) {
    out.push(LITTLE_ENDIAN);
    out.extend_from_slice(&geometry_type.to_le_bytes());
}

fn write_count(out: &mut Vec<u8>, n: usize) {
    out.extend_from_slice(&(n as u32).to_le_bytes());
}

fn write_coord(out: &mut Vec<u8>, c: Coord<f64>) {
    out.extend_from_slice(&c.x.to_le_bytes());
    out.extend_from_slice(&c.y.to_le_bytes());
}

fn write_coords(out: &mut Vec<u8>, line: &LineString<f64>) {
    write_count(out, line.0.len());
    line.0.iter().for_each(|c| write_coord(out, *c));
}

fn write_polygon_body(out: &mut Vec<u8>, polygon: &Polygon<f64>) {
    if polygon.exterior().0.is_empty() && polygon.interiors().is_empty() {
        write_count(out, 0);
        return;
    }
    write_count(out, 1 + polygon.interiors().len());
    write_coords(out, polygon.exterior());
    polygon.interiors().iter().for_each(|r| write_coords(out, r));
}

fn write_geometry(out: &mut Vec<u8>, geometry: &Geometry<f64>) {
    match geometry {
        Geometry::Point(p) => {
            write_header(out, WKB_POINT);
            write_coord(out, p.0);
        }
        Geometry::Line(l) => {
            write_header(out, WKB_LINE_STRING);
            write_coords(out, &LineString::new(vec![l.start, l.end]));
        }
        Geometry::LineString(l) => {
            write_header(out, WKB_LINE_STRING);
            write_coords(out, l);
        }
        Geometry::Polygon(p) => {
            write_header(out, WKB_POLYGON);
            write_polygon_body(out, p);
        }
        Geometry::Rect(r) => write_geometry(out, &Geometry::Polygon(r.to_polygon())),
        Geometry::Triangle(t) => write_geometry(out, &Geometry::Polygon(t.to_polygon())),
        Geometry::MultiPoint(m) => {
            write_header(out, WKB_MULTI_POINT);
            write_count(out, m.0.len());
            m.0.iter()
                .for_each(|p| write_geometry(out, &Geometry::Point(*p)));
        }
        Geometry::MultiLineString(m) => {
            write_header(out, WKB_MULTI_LINE_STRING);
            write_count(out, m.0.len());
            for l in &m.0 {
                write_header(out, WKB_LINE_STRING);
                write_coords(out, l);
            }
        }
        Geometry::MultiPolygon(m) => {
            write_header(out, WKB_MULTI_POLYGON);
            write_count(out, m.0.len());
            for p in &m.0 {
                write_header(out, WKB_POLYGON);
                write_polygon_body(out, p);
            }
        }
        Geometry::GeometryCollection(c) => {
            write_header(out, WKB_GEOMETRY_COLLECTION);
            write_count(out, c.0.len());
            c.0.iter().for_each(|g| write_geometry(out, g));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{coord, line_string, point, polygon};

    fn round_trip(geometry: Geometry<f64>) {
        let bytes = write_wkb(&geometry);
        assert_eq!(read_wkb(&bytes).unwrap(), geometry);
    }

    #[test]
    fn test_point_bytes() {
        let bytes = write_wkb(&Geometry::Point(point!(x: 1.0, y: 2.0)));
        assert_eq!(bytes.len(), 21);
        assert_eq!(bytes[0], LITTLE_ENDIAN);
        assert_eq!(&bytes[1..5], &WKB_POINT.to_le_bytes());
    }

    #[test]
    fn test_big_endian_point() {
        let mut bytes = vec![BIG_ENDIAN];
        bytes.extend_from_slice(&WKB_POINT.to_be_bytes());
        bytes.extend_from_slice(&30.0f64.to_be_bytes());
        bytes.extend_from_slice(&10.0f64.to_be_bytes());
        assert_eq!(
            read_wkb(&bytes).unwrap(),
            Geometry::Point(point!(x: 30.0, y: 10.0))
        );
    }

    #[test]
    fn test_round_trips() {
        let ring = polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0)];
        round_trip(Geometry::LineString(line_string![(x: 1.0, y: 2.0), (x: 3.0, y: 4.0)]));
        round_trip(Geometry::Polygon(ring.clone()));
        round_trip(Geometry::MultiPoint(MultiPoint::new(vec![
            point!(x: 1.0, y: 1.0),
            point!(x: -2.5, y: 7.0),
        ])));
        round_trip(Geometry::MultiPolygon(MultiPolygon::new(vec![ring.clone()])));
        round_trip(Geometry::GeometryCollection(GeometryCollection(vec![
            Geometry::Point(point!(x: 0.0, y: 1.0)),
            Geometry::Polygon(ring),
            Geometry::MultiLineString(MultiLineString::new(vec![])),
        ])));
    }

    #[test]
    fn test_empty_polygon() {
        round_trip(Geometry::Polygon(Polygon::new(LineString::new(vec![]), vec![])));
    }

    #[test]
    fn test_line_is_written_as_line_string() {
        let line = geo_types::Line::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 });
        let back = read_wkb(&write_wkb(&Geometry::Line(line))).unwrap();
        assert!(matches!(back, Geometry::LineString(l) if l.0.len() == 2));
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(read_wkb(&[]), Err(WkbError::Truncated(0)));
        assert_eq!(read_wkb(&[7, 1, 0, 0, 0]), Err(WkbError::ByteOrder(7)));
        assert!(matches!(
            read_wkb(&[1, 99, 0, 0, 0]),
            Err(WkbError::GeometryType(99))
        ));
        let mut bytes = write_wkb(&Geometry::Point(point!(x: 1.0, y: 2.0)));
        bytes.push(0);
        assert_eq!(read_wkb(&bytes), Err(WkbError::TrailingBytes(1)));
    }

    #[test]
    fn test_huge_count_is_rejected() {
        let mut bytes = vec![LITTLE_ENDIAN];
        bytes.extend_from_slice(&WKB_LINE_STRING.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(read_wkb(&bytes), Err(WkbError::Truncated(_))));
    }

    #[test]
    fn test_wrong_member_type() {
        let mut bytes = vec![LITTLE_ENDIAN];
        bytes.extend_from_slice(&WKB_MULTI_POINT.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend(write_wkb(&Geometry::LineString(LineString::new(vec![]))));
        assert_eq!(
            read_wkb(&bytes),
            Err(WkbError::MemberType {
                expected: "point",
                got: WKB_LINE_STRING
            })
        );
    }
}
