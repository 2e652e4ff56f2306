//! Zip archive access for shapefile datasets.
//!
//! A shapefile is a group of sibling files sharing one stem (`counties.shp`,
//! `counties.dbf`, ...). Archives published by data portals often nest that
//! group inside a directory, and occasionally bundle several datasets, so
//! members are grouped by their full path without extension.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use format_shared::{SpatialFormatReadError, SpatialFormatResult};
use log::debug;
use zip::ZipArchive;

/// Archive members belonging to one shapefile dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetMembers {
    /// Dataset name: the `.shp` file name without directory or extension
    pub layer: String,
    /// Geometry member (`.shp`)
    pub shp: String,
    /// Index member (`.shx`)
    pub shx: Option<String>,
    /// Attribute member (`.dbf`)
    pub dbf: Option<String>,
    /// Projection member (`.prj`)
    pub prj: Option<String>,
    /// Code page member (`.cpg`)
    pub cpg: Option<String>,
}

/// An opened zip archive holding one or more shapefile datasets.
pub struct ShapefileArchive {
    path: PathBuf,
    archive: ZipArchive<File>,
    datasets: Vec<DatasetMembers>,
}

impl ShapefileArchive {
    /// Open an archive and index the shapefile datasets it contains.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, is not a valid zip
    /// archive, or contains no `.shp` member.
    pub fn open(path: impl AsRef<Path>) -> SpatialFormatResult<Self> {
        let path = path.as_ref().to_path_buf();
        let context = path.display().to_string();

        let file = File::open(&path).map_err(|source| SpatialFormatReadError::Io {
            source,
            context: Some(context.clone()),
        })?;
        let mut archive = ZipArchive::new(file).map_err(|err| SpatialFormatReadError::Archive {
            message: format!("Not a readable zip archive: {err}"),
            context: Some(context.clone()),
        })?;

        let mut names = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let entry = archive
                .by_index(index)
                .map_err(|err| SpatialFormatReadError::Archive {
                    message: format!("Cannot read entry {index}: {err}"),
                    context: Some(context.clone()),
                })?;
            if !entry.is_dir() {
                names.push(entry.name().to_string());
            }
        }
        debug!("Archive {context} holds {} file(s)", names.len());

        let datasets = group_members(&names);
        if datasets.is_empty() {
            return Err(SpatialFormatReadError::Archive {
                message: "No shapefile (.shp) found in archive".to_string(),
                context: Some(context),
            });
        }

        Ok(Self {
            path,
            archive,
            datasets,
        })
    }

    /// Path of the archive on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Shapefile datasets in archive order.
    #[must_use]
    pub fn datasets(&self) -> &[DatasetMembers] {
        &self.datasets
    }

    /// Find a dataset by layer name (case-insensitive).
    #[must_use]
    pub fn dataset(&self, layer: &str) -> Option<&DatasetMembers> {
        self.datasets
            .iter()
            .find(|d| d.layer.eq_ignore_ascii_case(layer))
    }

    /// Read an archive member fully into memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the member is missing or cannot be decompressed.
    pub fn read_member(&mut self, name: &str) -> SpatialFormatResult<Vec<u8>> {
        let context = format!("{}!{name}", self.path.display());
        let mut entry = self
            .archive
            .by_name(name)
            .map_err(|err| SpatialFormatReadError::Archive {
                message: format!("Cannot open member: {err}"),
                context: Some(context.clone()),
            })?;

        let mut bytes = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        entry
            .read_to_end(&mut bytes)
            .map_err(|source| SpatialFormatReadError::Io {
                source,
                context: Some(context),
            })?;
        debug!("Read {} byte(s) from member {name}", bytes.len());
        Ok(bytes)
    }

    /// Read a text member (`.prj`, `.cpg`), replacing invalid UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error if the member cannot be read.
    pub fn read_text_member(&mut self, name: &str) -> SpatialFormatResult<String> {
        let bytes = self.read_member(name)?;
        Ok(String::from_utf8_lossy(&bytes).trim().to_string())
    }
}

fn split_extension(name: &str) -> Option<(&str, String)> {
    let (stem, extension) = name.rsplit_once('.')?;
    if extension.contains('/') {
        return None;
    }
    Some((stem, extension.to_ascii_lowercase()))
}

/// Group archive entry names into shapefile datasets, ordered by the
/// position of their `.shp` member. Members are matched on the full path
/// without extension, ignoring case.
fn group_members(names: &[String]) -> Vec<DatasetMembers> {
    let mut datasets: Vec<(String, DatasetMembers)> = Vec::new();

    for name in names {
        let Some((stem, extension)) = split_extension(name) else {
            continue;
        };
        if extension == "shp" {
            let layer = stem.rsplit('/').next().unwrap_or(stem).to_string();
            datasets.push((
                stem.to_ascii_lowercase(),
                DatasetMembers {
                    layer,
                    shp: name.clone(),
                    ..DatasetMembers::default()
                },
            ));
        }
    }

    for name in names {
        let Some((stem, extension)) = split_extension(name) else {
            continue;
        };
        let stem = stem.to_ascii_lowercase();
        let Some((_, members)) = datasets.iter_mut().find(|(key, _)| *key == stem) else {
            continue;
        };
        let slot = match extension.as_str() {
            "shx" => &mut members.shx,
            "dbf" => &mut members.dbf,
            "prj" => &mut members.prj,
            "cpg" => &mut members.cpg,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(name.clone());
        }
    }

    datasets.into_iter().map(|(_, members)| members).collect()
}
