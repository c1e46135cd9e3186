use serde::{Deserialize, Deserializer};

/// Risk cluster assignment for one (region, year, category)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RiskRecord {
    #[serde(rename = "nama_kabupaten_kota")]
    pub region_name: String,
    #[serde(rename = "tahun", deserialize_with = "integral")]
    pub year: i32,
    #[serde(rename = "jenis_kematian", default)]
    pub death_category: Option<String>,
    #[serde(deserialize_with = "integral")]
    pub cluster: u8,
    pub risk_label: String,
    #[serde(rename = "total_kematian", deserialize_with = "number_or_zero")]
    pub total_deaths: f64,
}

/// Death count for one cause within a (region, year, category)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetailRecord {
    #[serde(rename = "nama_kabupaten_kota")]
    pub region_name: String,
    #[serde(rename = "tahun", deserialize_with = "integral")]
    pub year: i32,
    #[serde(rename = "jenis_kematian", default)]
    pub death_category: Option<String>,
    #[serde(rename = "penyebab_kematian")]
    pub cause: String,
    #[serde(rename = "jumlah_kematian", default)]
    pub death_count: Option<f64>,
}

/// Accept `2` as well as `2.0`; tables exported from dataframes mix both
fn integral<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let value = f64::deserialize(deserializer)?;
    if value.fract() != 0.0 || !value.is_finite() {
        return Err(serde::de::Error::custom(format!("expected an integer, got {value}")));
    }
    T::try_from(value as i64).map_err(|_| serde::de::Error::custom(format!("{value} out of range")))
}

/// Empty cells count as zero
fn number_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}
