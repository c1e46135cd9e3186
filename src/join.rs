use crate::data::{Boundaries, RiskRecord};
use crate::region::{normalize, present, NormalizedKey};
use geojson::{FeatureCollection, JsonObject, JsonValue};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Enriched property names written onto every feature
pub const PROP_CLUSTER: &str = "cluster";
pub const PROP_RISK_LABEL: &str = "risk_label";
pub const PROP_TOTAL_DEATHS: &str = "total_deaths";
pub const PROP_DISPLAY_NAME: &str = "display_name";

/// Risk label used for features without a matching record
pub const NO_DATA_LABEL: &str = "N/A";

/// Risk values attached to a matched feature
#[derive(Debug, Clone, PartialEq)]
pub struct RiskInfo {
    pub cluster: u8,
    pub risk_label: String,
    pub total_deaths: f64,
}

/// Boundary document with risk properties merged in
#[derive(Debug, Clone)]
pub struct EnrichedBoundaries {
    pub collection: FeatureCollection,
    /// Keys that appeared more than once in the risk records (first kept)
    pub duplicates: Vec<NormalizedKey>,
    /// Number of features that found a risk record
    pub matched: usize,
}

/// Typed view of one enriched feature's properties
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRisk {
    pub cluster: Option<u8>,
    pub risk_label: String,
    pub total_deaths: f64,
    pub display_name: String,
}

impl FeatureRisk {
    /// Read back the enriched properties (missing values read as no data)
    pub fn from_properties(props: Option<&JsonObject>) -> Self {
        let get = |key: &str| props.and_then(|p| p.get(key));
        Self {
            cluster: get(PROP_CLUSTER)
                .and_then(JsonValue::as_u64)
                .and_then(|c| u8::try_from(c).ok()),
            risk_label: get(PROP_RISK_LABEL)
                .and_then(JsonValue::as_str)
                .unwrap_or(NO_DATA_LABEL)
                .to_string(),
            total_deaths: get(PROP_TOTAL_DEATHS).and_then(JsonValue::as_f64).unwrap_or(0.0),
            display_name: get(PROP_DISPLAY_NAME)
                .and_then(JsonValue::as_str)
                .unwrap_or("")
                .to_string(),
        }
    }
}

/// Build the key -> risk lookup, keeping the first record per key
pub fn risk_lookup<'a, I>(records: I) -> (HashMap<NormalizedKey, RiskInfo>, Vec<NormalizedKey>)
where
    I: IntoIterator<Item = &'a RiskRecord>,
{
    let mut lookup = HashMap::new();
    let mut duplicates = Vec::new();

    for record in records {
        match lookup.entry(normalize(&record.region_name)) {
            Entry::Vacant(slot) => {
                slot.insert(RiskInfo {
                    cluster: record.cluster,
                    risk_label: record.risk_label.clone(),
                    total_deaths: record.total_deaths,
                });
            }
            Entry::Occupied(slot) => {
                if !duplicates.contains(slot.key()) {
                    duplicates.push(slot.key().clone());
                }
            }
        }
    }

    (lookup, duplicates)
}

/// Merge filtered risk records into a copy of the boundary document.
///
/// The source document is left untouched so the join can be rerun on
/// every filter change.
pub fn enrich<'a, I>(boundaries: &Boundaries, records: I) -> EnrichedBoundaries
where
    I: IntoIterator<Item = &'a RiskRecord>,
{
    let (lookup, duplicates) = risk_lookup(records);
    for key in &duplicates {
        warn!(key = %key, "duplicate normalized region key in risk data, keeping first record");
    }

    let mut collection = boundaries.collection.clone();
    let mut matched = 0;

    for feature in &mut collection.features {
        let raw_name = boundaries.raw_name(feature).to_string();
        let info = lookup.get(&normalize(&raw_name));
        let props = feature.properties.get_or_insert_with(JsonObject::new);

        match info {
            Some(info) => {
                matched += 1;
                props.insert(PROP_CLUSTER.into(), JsonValue::from(info.cluster));
                props.insert(PROP_RISK_LABEL.into(), JsonValue::from(info.risk_label.clone()));
                props.insert(PROP_TOTAL_DEATHS.into(), JsonValue::from(info.total_deaths));
            }
            None => {
                props.insert(PROP_CLUSTER.into(), JsonValue::Null);
                props.insert(PROP_RISK_LABEL.into(), JsonValue::from(NO_DATA_LABEL));
                props.insert(PROP_TOTAL_DEATHS.into(), JsonValue::from(0.0));
            }
        }
        props.insert(
            PROP_DISPLAY_NAME.into(),
            JsonValue::from(present(&raw_name).as_str()),
        );
    }

    debug!(
        features = collection.features.len(),
        matched,
        lookup = lookup.len(),
        "boundaries enriched"
    );

    EnrichedBoundaries {
        collection,
        duplicates,
        matched,
    }
}
