mod records;

pub use records::{DetailRecord, RiskRecord};

use geojson::{Feature, FeatureCollection, GeoJson};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Columns the risk table must carry
pub const RISK_COLUMNS: [&str; 5] = [
    "nama_kabupaten_kota",
    "tahun",
    "cluster",
    "risk_label",
    "total_kematian",
];

/// Columns the cause-of-death table must carry
pub const DETAIL_COLUMNS: [&str; 4] = [
    "nama_kabupaten_kota",
    "tahun",
    "penyebab_kematian",
    "jumlah_kematian",
];

/// Optional category column shared by both tables
pub const CATEGORY_COLUMN: &str = "jenis_kematian";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("columns {columns:?} not found in {path}")]
    MissingColumns { path: PathBuf, columns: Vec<String> },
    #[error("malformed GeoJSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: simd_json::Error,
    },
    #[error("{path} is not a GeoJSON FeatureCollection")]
    NotFeatureCollection { path: PathBuf },
}

/// Where the three input documents live
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub risk: PathBuf,
    pub detail: PathBuf,
    pub boundaries: PathBuf,
    /// Feature property holding the raw region name
    pub name_property: String,
}

/// A loaded table plus whether it carried the category column
#[derive(Debug, Clone)]
pub struct Table<T> {
    pub records: Vec<T>,
    pub has_category: bool,
}

/// Region boundary polygons as read from the GeoJSON file
#[derive(Debug, Clone)]
pub struct Boundaries {
    pub collection: FeatureCollection,
    pub name_property: String,
}

impl Boundaries {
    pub fn new(collection: FeatureCollection, name_property: impl Into<String>) -> Self {
        Self {
            collection,
            name_property: name_property.into(),
        }
    }

    /// Raw region name of a feature (empty when the property is missing)
    pub fn raw_name<'a>(&self, feature: &'a Feature) -> &'a str {
        feature
            .properties
            .as_ref()
            .and_then(|p| p.get(&self.name_property))
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }
}

/// Read-only datasets shared by every query for the life of the process
#[derive(Debug, Clone)]
pub struct DataContext {
    pub risk: Table<RiskRecord>,
    pub detail: Table<DetailRecord>,
    pub boundaries: Boundaries,
}

impl DataContext {
    /// Load all inputs. Any failure is fatal to the dashboard.
    pub fn load(paths: &DataPaths) -> Result<Self, LoadError> {
        let risk = load_table(&paths.risk, &RISK_COLUMNS)?;
        let detail = load_table(&paths.detail, &DETAIL_COLUMNS)?;
        let boundaries = load_boundaries(&paths.boundaries, &paths.name_property)?;

        info!(
            risk_rows = risk.records.len(),
            detail_rows = detail.records.len(),
            features = boundaries.collection.features.len(),
            "datasets loaded"
        );

        Ok(Self {
            risk,
            detail,
            boundaries,
        })
    }

    /// Sorted unique years present in the risk table
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.risk.records.iter().map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Sorted unique death categories, empty when the column is absent
    pub fn categories(&self) -> Vec<String> {
        if !self.risk.has_category {
            return Vec::new();
        }
        let mut categories: Vec<String> = self
            .risk
            .records
            .iter()
            .filter_map(|r| r.death_category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }
}

/// Load a CSV table after checking its header for the required columns
pub fn load_table<T: DeserializeOwned>(path: &Path, required: &[&str]) -> Result<Table<T>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let file = fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let headers = reader.headers().map_err(csv_err)?.clone();
    let missing: Vec<String> = required
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        });
    }
    let has_category = headers.iter().any(|h| h == CATEGORY_COLUMN);

    let records = reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(csv_err)?;

    debug!(path = %path.display(), rows = records.len(), has_category, "table loaded");
    Ok(Table {
        records,
        has_category,
    })
}

/// Load the boundary GeoJSON; it must be a FeatureCollection
pub fn load_boundaries(path: &Path, name_property: &str) -> Result<Boundaries, LoadError> {
    let mut bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let geojson: GeoJson = simd_json::serde::from_slice(&mut bytes).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(Boundaries::new(fc, name_property)),
        _ => Err(LoadError::NotFeatureCollection {
            path: path.to_path_buf(),
        }),
    }
}
