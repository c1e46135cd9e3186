use crate::data::RiskRecord;
use crate::join::PROP_DISPLAY_NAME;
use crate::region::{normalize, present, DisplayName, NormalizedKey};
use geojson::JsonObject;
use std::collections::HashMap;

/// A map interaction, in whichever shape the map produced it
#[derive(Debug, Clone, PartialEq)]
pub enum MapClick {
    /// Mouse click on a feature, carrying its enriched properties
    Feature(JsonObject),
    /// Region focused from the keyboard
    Focused(DisplayName),
    /// Click that hit no feature
    Background,
}

impl MapClick {
    /// Collapse the event to the clicked display name, if any.
    /// `name_property` is the raw boundary-name property used when a
    /// feature has not been enriched.
    pub fn display_name(&self, name_property: &str) -> Option<String> {
        match self {
            MapClick::Feature(props) => props
                .get(PROP_DISPLAY_NAME)
                .or_else(|| props.get(name_property))
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            MapClick::Focused(name) => Some(name.as_str().to_string()),
            MapClick::Background => None,
        }
    }
}

/// Regions selectable under the current filter, sorted by display name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionOptions {
    entries: Vec<(NormalizedKey, DisplayName)>,
    index: HashMap<NormalizedKey, usize>,
}

impl RegionOptions {
    /// Build options from filtered risk records (unique key/display pairs)
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a RiskRecord>,
    {
        let mut entries: Vec<(NormalizedKey, DisplayName)> = records
            .into_iter()
            .map(|r| (normalize(&r.region_name), present(&r.region_name)))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        entries.dedup_by(|a, b| a.0 == b.0);

        let index = entries
            .iter()
            .enumerate()
            .map(|(i, (key, _))| (key.clone(), i))
            .collect();
        Self { entries, index }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &NormalizedKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn position(&self, key: &NormalizedKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn display(&self, key: &NormalizedKey) -> Option<&DisplayName> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    pub fn get(&self, idx: usize) -> Option<&(NormalizedKey, DisplayName)> {
        self.entries.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(NormalizedKey, DisplayName)> + '_ {
        self.entries.iter()
    }
}

/// How the selected region was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    Click,
    Dropdown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub key: NormalizedKey,
    pub source: SelectionSource,
    /// Dropdown position of the selected key
    pub position: usize,
}

/// Reconcile a map click with the dropdown choice.
///
/// A click wins only when its key is known under the current filter;
/// otherwise the dropdown index (clamped) decides. Nothing is selected
/// when there are no options.
pub fn resolve(clicked: Option<&str>, options: &RegionOptions, dropdown: usize) -> Option<Selection> {
    if let Some(name) = clicked {
        let key = normalize(name);
        if let Some(position) = options.position(&key) {
            return Some(Selection {
                key,
                source: SelectionSource::Click,
                position,
            });
        }
    }

    let position = dropdown.min(options.len().checked_sub(1)?);
    let (key, _) = options.get(position)?;
    Some(Selection {
        key: key.clone(),
        source: SelectionSource::Dropdown,
        position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::tests::risk;
    use geojson::JsonValue;

    fn options() -> RegionOptions {
        let records = vec![
            risk("Kota Bandung", 4, "High", 310.0),
            risk("Kab. Garut", 1, "Low", 10.0),
            risk("Kab. Bandung", 2, "Medium", 120.0),
            risk("GARUT", 1, "Low", 10.0),
        ];
        RegionOptions::from_records(&records)
    }

    #[test]
    fn test_options_sorted_and_unique() {
        let opts = options();
        let names: Vec<&str> = opts.iter().map(|(_, d)| d.as_str()).collect();
        assert_eq!(names, vec!["CITY BANDUNG", "REGENCY BANDUNG", "REGENCY GARUT"]);
    }

    #[test]
    fn test_click_on_known_region() {
        let opts = options();
        let sel = resolve(Some("CITY BANDUNG"), &opts, 2).unwrap();
        assert_eq!(sel.key.as_str(), "CITY BANDUNG");
        assert_eq!(sel.source, SelectionSource::Click);
        assert_eq!(sel.position, 0);
    }

    #[test]
    fn test_unknown_click_falls_back_to_dropdown() {
        let opts = options();
        let sel = resolve(Some("REGENCY CIANJUR"), &opts, 1).unwrap();
        assert_eq!(sel.key.as_str(), "BANDUNG");
        assert_eq!(sel.source, SelectionSource::Dropdown);
    }

    #[test]
    fn test_no_click_uses_dropdown() {
        let opts = options();
        let sel = resolve(None, &opts, 2).unwrap();
        assert_eq!(sel.key.as_str(), "GARUT");
    }

    #[test]
    fn test_dropdown_index_clamped() {
        let opts = options();
        let sel = resolve(None, &opts, 99).unwrap();
        assert_eq!(sel.position, 2);
    }

    #[test]
    fn test_empty_options_select_nothing() {
        let opts = RegionOptions::default();
        assert_eq!(resolve(Some("REGENCY GARUT"), &opts, 0), None);
        assert_eq!(resolve(None, &opts, 0), None);
    }

    #[test]
    fn test_click_shapes_collapse_to_display_name() {
        let mut props = JsonObject::new();
        props.insert("KABKOT".into(), JsonValue::from("GARUT"));
        assert_eq!(
            MapClick::Feature(props.clone()).display_name("KABKOT").as_deref(),
            Some("GARUT")
        );

        props.insert(PROP_DISPLAY_NAME.into(), JsonValue::from("REGENCY GARUT"));
        assert_eq!(
            MapClick::Feature(props).display_name("KABKOT").as_deref(),
            Some("REGENCY GARUT")
        );
        assert_eq!(
            MapClick::Focused(present("Kota Depok")).display_name("KABKOT").as_deref(),
            Some("CITY DEPOK")
        );
        assert_eq!(MapClick::Background.display_name("KABKOT"), None);
    }
}
