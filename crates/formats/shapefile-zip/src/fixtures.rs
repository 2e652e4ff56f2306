//! Builders for zipped shapefile fixtures used in tests.

use std::error::Error;
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, PolygonRing};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// ESRI `.prj` for Web Mercator (EPSG:3857).
pub const WEB_MERCATOR_PRJ: &str = r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Mercator_Auxiliary_Sphere"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",0.0],PARAMETER["Standard_Parallel_1",0.0],PARAMETER["Auxiliary_Sphere_Type",0.0],UNIT["Meter",1.0]]"#;

/// ESRI `.prj` for WGS 84 (EPSG:4326).
pub const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

/// `.prj` shipped with the Census TIGER/Line county file (NAD83).
pub const NAD83_PRJ: &str = r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137,298.257222101]],PRIMEM["Greenwich",0],UNIT["Degree",0.017453292519943295]]"#;

/// One county record: attributes plus its rings.
#[derive(Debug, Clone)]
pub struct CountyFixture {
    /// `NAME` attribute
    pub name: String,
    /// `GEOID` attribute
    pub geoid: String,
    /// `ALAND` attribute (integral numeric)
    pub aland: f64,
    /// `SHARE` attribute (numeric with decimals)
    pub share: f64,
    /// Closed outer rings, clockwise; empty for a null shape
    pub rings: Vec<Vec<(f64, f64)>>,
    /// Holes cut into the first outer ring
    pub holes: Vec<Vec<(f64, f64)>>,
}

impl CountyFixture {
    /// A county made of one axis-aligned square.
    #[must_use]
    pub fn square(name: &str, geoid: &str, x0: f64, y0: f64, size: f64) -> Self {
        Self {
            name: name.to_string(),
            geoid: geoid.to_string(),
            aland: (size * size).round(),
            share: 0.25,
            rings: vec![clockwise_square(x0, y0, size)],
            holes: Vec::new(),
        }
    }

    /// A county record whose shape is null.
    #[must_use]
    pub fn without_shape(name: &str, geoid: &str) -> Self {
        Self {
            name: name.to_string(),
            geoid: geoid.to_string(),
            aland: 0.0,
            share: 0.0,
            rings: Vec::new(),
            holes: Vec::new(),
        }
    }

    /// Adds another outer ring, turning the county into a multipolygon.
    #[must_use]
    pub fn with_island(mut self, x0: f64, y0: f64, size: f64) -> Self {
        self.rings.push(clockwise_square(x0, y0, size));
        self
    }

    /// Cuts a square hole into the first outer ring.
    #[must_use]
    pub fn with_hole(mut self, x0: f64, y0: f64, size: f64) -> Self {
        self.holes.push(clockwise_square(x0, y0, size));
        self
    }

    /// Sets the `SHARE` attribute.
    #[must_use]
    pub fn with_share(mut self, share: f64) -> Self {
        self.share = share;
        self
    }

    /// The county shape, or `None` for a null shape.
    fn polygon(&self) -> Option<shapefile::Polygon> {
        let (first, islands) = self.rings.split_first()?;

        let mut rings = vec![PolygonRing::Outer(ring_points(first))];
        rings.extend(self.holes.iter().map(|hole| PolygonRing::Inner(ring_points(hole))));
        rings.extend(islands.iter().map(|ring| PolygonRing::Outer(ring_points(ring))));
        Some(shapefile::Polygon::with_rings(rings))
    }

    fn record(&self) -> Record {
        let mut record = Record::default();
        record.insert(
            "NAME".to_string(),
            FieldValue::Character(Some(self.name.clone())),
        );
        record.insert(
            "GEOID".to_string(),
            FieldValue::Character(Some(self.geoid.clone())),
        );
        record.insert("ALAND".to_string(), FieldValue::Numeric(Some(self.aland)));
        record.insert("SHARE".to_string(), FieldValue::Numeric(Some(self.share)));
        record
    }
}

fn ring_points(ring: &[(f64, f64)]) -> Vec<Point> {
    ring.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

/// Closed clockwise square ring starting at the lower-left corner.
#[must_use]
pub fn clockwise_square(x0: f64, y0: f64, size: f64) -> Vec<(f64, f64)> {
    vec![
        (x0, y0),
        (x0, y0 + size),
        (x0 + size, y0 + size),
        (x0 + size, y0),
        (x0, y0),
    ]
}

/// Write a zip archive with the given `(name, bytes)` members.
///
/// # Errors
///
/// Returns an error if the archive cannot be written.
pub fn write_zip(path: &Path, members: &[(&str, &[u8])]) -> Result<(), Box<dyn Error>> {
    let mut zip = ZipWriter::new(File::create(path)?);
    for (name, bytes) in members {
        zip.start_file(*name, SimpleFileOptions::default())?;
        zip.write_all(bytes)?;
    }
    zip.finish()?;
    Ok(())
}

/// Write `layer.shp/.shx/.dbf` (and `.prj` when given) for the counties and
/// zip them into `dir/layer.zip`.
///
/// # Errors
///
/// Returns an error if any of the files cannot be written.
pub fn write_county_archive(
    dir: &Path,
    layer: &str,
    counties: &[CountyFixture],
    prj: Option<&str>,
) -> Result<PathBuf, Box<dyn Error>> {
    let mut polygon_shp = Cursor::new(Vec::new());
    {
        let mut writer = shapefile::ShapeWriter::new(&mut polygon_shp);
        for polygon in counties.iter().filter_map(CountyFixture::polygon) {
            writer.write_shape(&polygon)?;
        }
    }

    let mut dbf = Cursor::new(Vec::new());
    {
        let mut writer = TableWriterBuilder::new()
            .add_character_field(FieldName::try_from("NAME")?, 100)
            .add_character_field(FieldName::try_from("GEOID")?, 5)
            .add_numeric_field(FieldName::try_from("ALAND")?, 14, 0)
            .add_numeric_field(FieldName::try_from("SHARE")?, 10, 4)
            .build_with_dest(&mut dbf);
        for county in counties {
            writer.write_record(&county.record())?;
        }
        writer.close()?;
    }

    let has_shape: Vec<bool> = counties.iter().map(|c| !c.rings.is_empty()).collect();
    let (shp, shx) = interleave_null_shapes(polygon_shp.get_ref(), &has_shape)?;

    let mut members: Vec<(String, Vec<u8>)> = vec![
        (format!("{layer}.shp"), shp),
        (format!("{layer}.shx"), shx),
        (format!("{layer}.dbf"), dbf.into_inner()),
    ];
    if let Some(prj) = prj {
        members.push((format!("{layer}.prj"), prj.as_bytes().to_vec()));
    }

    let zip_path = dir.join(format!("{layer}.zip"));
    let borrowed: Vec<(&str, &[u8])> = members
        .iter()
        .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
        .collect();
    write_zip(&zip_path, &borrowed)?;
    Ok(zip_path)
}

/// Length of the `.shp`/`.shx` file header.
const SHP_HEADER_LEN: usize = 100;

/// Length of a `.shp` record header (number and content length).
const RECORD_HEADER_LEN: usize = 8;

/// Rebuilds `.shp` and `.shx` bytes from a polygon-only `.shp`, inserting a
/// null record wherever `has_shape` is false.
///
/// The typed shapefile writer refuses to mix null and polygon records.
fn interleave_null_shapes(
    polygon_shp: &[u8],
    has_shape: &[bool],
) -> Result<(Vec<u8>, Vec<u8>), Box<dyn Error>> {
    let header = polygon_shp
        .get(..SHP_HEADER_LEN)
        .ok_or("truncated .shp header")?;
    let mut shp = header.to_vec();
    let mut shx = header.to_vec();
    let mut polygons = &polygon_shp[SHP_HEADER_LEN..];

    for (index, present) in has_shape.iter().enumerate() {
        let content = if *present {
            let length = polygons
                .get(4..RECORD_HEADER_LEN)
                .ok_or("truncated .shp record header")?;
            let length = usize::try_from(i32::from_be_bytes(<[u8; 4]>::try_from(length)?))? * 2;
            let end = RECORD_HEADER_LEN + length;
            let content = polygons
                .get(RECORD_HEADER_LEN..end)
                .ok_or("truncated .shp record")?
                .to_vec();
            polygons = &polygons[end..];
            content
        } else {
            0_i32.to_le_bytes().to_vec()
        };

        let record_number = i32::try_from(index + 1)?;
        let offset_words = i32::try_from(shp.len() / 2)?;
        let length_words = i32::try_from(content.len() / 2)?;
        shp.extend_from_slice(&record_number.to_be_bytes());
        shp.extend_from_slice(&length_words.to_be_bytes());
        shp.extend_from_slice(&content);
        shx.extend_from_slice(&offset_words.to_be_bytes());
        shx.extend_from_slice(&length_words.to_be_bytes());
    }

    for bytes in [&mut shp, &mut shx] {
        let words = i32::try_from(bytes.len() / 2)?;
        bytes[24..28].copy_from_slice(&words.to_be_bytes());
    }
    Ok((shp, shx))
}

/// Three adjacent Web Mercator squares, one of them with an island.
#[must_use]
pub fn three_mercator_counties() -> Vec<CountyFixture> {
    vec![
        CountyFixture::square("Autauga", "01001", -9_621_000.0, 3_825_000.0, 40_000.0),
        CountyFixture::square("Baldwin", "01003", -9_581_000.0, 3_825_000.0, 40_000.0)
            .with_island(-9_561_000.0, 3_780_000.0, 5_000.0),
        CountyFixture::square("Barbour", "01005", -9_541_000.0, 3_825_000.0, 40_000.0),
    ]
}
