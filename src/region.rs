use std::fmt;

/// Prefix carried by city keys and display names
pub const CITY_PREFIX: &str = "CITY ";
/// Prefix carried by regency display names (stripped from keys)
pub const REGENCY_PREFIX: &str = "REGENCY ";

/// Leading spellings rewritten to the canonical prefixes.
/// The source tables and the boundary file use the local-language
/// forms ("KAB.", "KABUPATEN", "KOTA") interchangeably.
const PREFIX_REWRITES: [(&str, &str); 3] = [
    ("KAB. ", REGENCY_PREFIX),
    ("KABUPATEN ", REGENCY_PREFIX),
    ("KOTA ", CITY_PREFIX),
];

/// Internal join key for a region. Regencies are keyed by their bare
/// base name, cities keep the `CITY ` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// User-facing region label, always prefixed with `CITY ` or `REGENCY `
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_city(&self) -> bool {
        self.0.starts_with(CITY_PREFIX)
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trim, uppercase, collapse whitespace and rewrite the leading
/// regency/city spelling to its canonical prefix.
fn canonicalize(raw: &str) -> String {
    let collapsed = raw
        .split_whitespace()
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join(" ");

    for (from, to) in PREFIX_REWRITES {
        if let Some(rest) = collapsed.strip_prefix(from) {
            return format!("{to}{rest}");
        }
    }
    collapsed
}

/// Canonicalize a raw region name into its join key.
///
/// `"Kab. Bandung"` -> `BANDUNG`, `"Kota Bandung"` -> `CITY BANDUNG`.
pub fn normalize(raw: &str) -> NormalizedKey {
    let s = canonicalize(raw);
    match s.strip_prefix(REGENCY_PREFIX) {
        Some(base) => NormalizedKey(base.to_string()),
        None => NormalizedKey(s),
    }
}

/// Derive the display label for a raw region name.
///
/// Bare names are the boundary-file convention for regencies and get
/// the `REGENCY ` prefix.
pub fn present(raw: &str) -> DisplayName {
    let s = canonicalize(raw);
    if s.starts_with(CITY_PREFIX) || s.starts_with(REGENCY_PREFIX) {
        DisplayName(s)
    } else {
        DisplayName(format!("{REGENCY_PREFIX}{s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regency_and_city_keys() {
        assert_eq!(normalize("Kab. Bandung").as_str(), "BANDUNG");
        assert_eq!(normalize("Kota Bandung").as_str(), "CITY BANDUNG");
        assert_eq!(present("Kab. Bandung").as_str(), "REGENCY BANDUNG");
        assert_eq!(present("Kota Bandung").as_str(), "CITY BANDUNG");
    }

    #[test]
    fn test_abbreviation_matches_long_forms() {
        for name in ["Bandung Barat", "Garut", "Sukabumi"] {
            let abbreviated = normalize(&format!("KAB. {name}"));
            assert_eq!(abbreviated, normalize(&format!("KABUPATEN {name}")));
            assert_eq!(abbreviated, normalize(&format!("REGENCY {name}")));
            assert_eq!(abbreviated, normalize(name));
        }
    }

    #[test]
    fn test_whitespace_and_case() {
        assert_eq!(normalize("  kab.   bandung   barat ").as_str(), "BANDUNG BARAT");
        assert_eq!(normalize("city\tCirebon").as_str(), "CITY CIREBON");
    }

    #[test]
    fn test_idempotent() {
        for raw in ["Kab. Bogor", "Kota Bogor", "  garut", "City Depok", "Regency Bekasi", ""] {
            let once = normalize(raw);
            assert_eq!(normalize(once.as_str()), once, "raw = {raw:?}");
        }
    }

    #[test]
    fn test_city_never_collides_with_regency() {
        for base in ["BANDUNG", "Bogor", "cirebon", "Sukabumi"] {
            assert_ne!(normalize(base), normalize(&format!("CITY {base}")));
            assert_ne!(present(base), present(&format!("CITY {base}")));
        }
    }

    #[test]
    fn test_presenter_always_prefixed() {
        for raw in ["", "garut", "Kota Depok", "KAB. CIAMIS", "REGENCY KUNINGAN", "city banjar"] {
            let shown = present(raw);
            assert!(
                shown.as_str().starts_with(CITY_PREFIX) || shown.as_str().starts_with(REGENCY_PREFIX),
                "{shown}"
            );
        }
    }

    #[test]
    fn test_display_name_round_trips_to_key() {
        // Clicks carry display names; they must resolve back to the same key
        for raw in ["BANDUNG", "Kota Bandung", "Kab. Garut"] {
            assert_eq!(normalize(present(raw).as_str()), normalize(raw));
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize("").is_empty());
        assert!(normalize("   ").is_empty());
    }

    #[test]
    fn test_prefix_only_rewritten_at_start() {
        assert_eq!(normalize("Tasik Kota Lama").as_str(), "TASIK KOTA LAMA");
        assert!(present("Kota Banjar").is_city());
    }
}
