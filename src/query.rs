use crate::data::{DetailRecord, RiskRecord, Table};
use crate::region::{normalize, NormalizedKey};
use std::collections::HashMap;

/// Number of causes kept in the ranking
pub const TOP_CAUSES: usize = 10;

/// Active year and optional death category
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Filter {
    pub year: i32,
    pub category: Option<String>,
}

impl Filter {
    fn matches(&self, year: i32, category: Option<&str>, apply_category: bool) -> bool {
        if year != self.year {
            return false;
        }
        match (&self.category, apply_category) {
            (Some(wanted), true) => category == Some(wanted.as_str()),
            _ => true,
        }
    }
}

/// Risk records for the filter, in table order
pub fn filter_risk<'a>(risk: &'a Table<RiskRecord>, filter: &Filter) -> Vec<&'a RiskRecord> {
    risk.records
        .iter()
        .filter(|r| filter.matches(r.year, r.death_category.as_deref(), risk.has_category))
        .collect()
}

/// First filtered risk record for the selected region
pub fn region_summary<'a>(filtered: &[&'a RiskRecord], key: &NormalizedKey) -> Option<&'a RiskRecord> {
    filtered
        .iter()
        .copied()
        .find(|r| normalize(&r.region_name) == *key)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CauseCount {
    pub cause: String,
    pub total: f64,
}

/// Ranked causes of death for one region, at most [`TOP_CAUSES`] long.
/// Causes summing to zero (or with only missing counts) are dropped;
/// ties keep first-seen order.
pub fn top_causes(detail: &Table<DetailRecord>, filter: &Filter, key: &NormalizedKey) -> Vec<CauseCount> {
    let mut ranked: Vec<CauseCount> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();

    let rows = detail.records.iter().filter(|r| {
        filter.matches(r.year, r.death_category.as_deref(), detail.has_category)
            && normalize(&r.region_name) == *key
    });

    for row in rows {
        let count = row.death_count.unwrap_or(0.0);
        match slots.get(row.cause.as_str()) {
            Some(&i) => ranked[i].total += count,
            None => {
                slots.insert(&row.cause, ranked.len());
                ranked.push(CauseCount {
                    cause: row.cause.clone(),
                    total: count,
                });
            }
        }
    }

    ranked.retain(|c| c.total > 0.0);
    // sort_by is stable, equal totals stay in first-seen order
    ranked.sort_by(|a, b| b.total.total_cmp(&a.total));
    ranked.truncate(TOP_CAUSES);
    ranked
}
