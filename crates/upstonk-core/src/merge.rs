//! Deduplication and field-level merging of provider records.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::domain::Product;

/// Groups records by identity key and folds each group left to right.
///
/// Output order follows the first appearance of each key. Records with
/// neither ticker nor ISIN are dropped.
pub fn deduplicate(records: Vec<Product>) -> Vec<Product> {
    let mut merged: Vec<Product> = Vec::with_capacity(records.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in records {
        let Some(key) = record.identity_key() else {
            warn!(name = %record.name, "dropping product record without ticker or ISIN");
            continue;
        };
        match positions.get(&key) {
            Some(&index) => merge_into(&mut merged[index], record),
            None => {
                positions.insert(key, merged.len());
                merged.push(record);
            }
        }
    }

    merged
}

/// Merges `other` into `acc`.
///
/// `acc` keeps every non-empty field and only adopts a field from `other`
/// when its own is empty or zero. Asset-class weights merge per class.
/// Holdings and sector lists are replaced by
/// the longer list; region and country maps are unioned with `acc` winning
/// collisions; provenance records are concatenated.
pub fn merge_into(acc: &mut Product, other: Product) {
    adopt_text(&mut acc.ticker, other.ticker);
    adopt_text(&mut acc.name, other.name);
    adopt_text(&mut acc.isin, other.isin);
    adopt_text(&mut acc.exchange, other.exchange);
    adopt_text(&mut acc.exchange_country, other.exchange_country);
    adopt_text(&mut acc.domicile, other.domicile);
    adopt_text(&mut acc.legal_structure, other.legal_structure);
    adopt_text(&mut acc.replication_method, other.replication_method);
    adopt_text(&mut acc.asset_class, other.asset_class);
    adopt_text(&mut acc.tracking_index, other.tracking_index);
    adopt_text(&mut acc.currency, other.currency);
    adopt_text(&mut acc.dividend_treatment, other.dividend_treatment);
    adopt_text(&mut acc.provider, other.provider);

    if !acc.is_physical && !acc.is_synthetic {
        acc.is_physical = other.is_physical;
        acc.is_synthetic = other.is_synthetic;
    } else if (acc.is_physical, acc.is_synthetic) != (other.is_physical, other.is_synthetic)
        && (other.is_physical || other.is_synthetic)
    {
        debug!(
            ticker = %acc.ticker,
            kept_physical = acc.is_physical,
            discarded_physical = other.is_physical,
            "replication flags disagree across sources, keeping the first"
        );
    }
    acc.is_leveraged |= other.is_leveraged;
    acc.is_inverse |= other.is_inverse;

    adopt_number(&mut acc.ter, other.ter);
    adopt_number(&mut acc.aum, other.aum);
    adopt_number(&mut acc.average_daily_volume, other.average_daily_volume);
    adopt_number(&mut acc.bid_ask_spread, other.bid_ask_spread);
    if acc.tracking_difference.is_none() {
        acc.tracking_difference = other.tracking_difference;
    }
    if acc.inception_date.is_none() {
        acc.inception_date = other.inception_date;
    }
    acc.last_updated = acc.last_updated.max(other.last_updated);

    let exposure = &mut acc.asset_exposure;
    adopt_number(&mut exposure.equities, other.asset_exposure.equities);
    adopt_number(&mut exposure.bonds, other.asset_exposure.bonds);
    adopt_number(&mut exposure.cash, other.asset_exposure.cash);
    adopt_number(&mut exposure.commodities, other.asset_exposure.commodities);
    adopt_number(&mut exposure.real_estate, other.asset_exposure.real_estate);
    adopt_number(&mut exposure.other, other.asset_exposure.other);
    for (region, weight) in other.geographic_exposure.regions {
        acc.geographic_exposure
            .regions
            .entry(region)
            .or_insert(weight);
    }
    for (country, weight) in other.geographic_exposure.countries {
        acc.geographic_exposure
            .countries
            .entry(country)
            .or_insert(weight);
    }

    if other.sector_exposure.len() > acc.sector_exposure.len() {
        acc.sector_exposure = other.sector_exposure;
    }
    if other.top_holdings.len() > acc.top_holdings.len() {
        acc.top_holdings = other.top_holdings;
    }

    acc.data_sources.extend(other.data_sources);
}

fn adopt_text(acc: &mut String, other: String) {
    if acc.trim().is_empty() && !other.trim().is_empty() {
        *acc = other;
    }
}

fn adopt_number(acc: &mut f64, other: f64) {
    if *acc == 0.0 && other != 0.0 {
        *acc = other;
    }
}
