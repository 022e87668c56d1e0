//! Row tuples to response types.
//!
//! Shapes the executor's flattened row sets into the schema's types. Ordering
//! always follows the query's own ORDER BY; nothing here re-sorts.

use stats_warehouse::{Error, Row};

use crate::model::{RegionCount, TopPackage, VersionCount};

/// Single-row count. Zero rows means the warehouse saw no downloads at all,
/// which resolves to zero rather than an error.
pub(crate) fn count_scalar(rows: &[Row]) -> Result<i64, Error> {
    rows.first().map(|row| row.int(0)).unwrap_or(Ok(0))
}

/// Single-row fraction, same zero-rows convention as [`count_scalar`].
pub(crate) fn fraction_scalar(rows: &[Row]) -> Result<f64, Error> {
    rows.first().map(|row| row.float(0)).unwrap_or(Ok(0.0))
}

pub(crate) fn version_breakdown(rows: &[Row]) -> Result<Vec<VersionCount>, Error> {
    let entries = labeled_counts(rows)?;
    let total = total(&entries);

    Ok(entries
        .into_iter()
        .map(|(version, downloads)| VersionCount {
            version,
            downloads,
            share: share(downloads, total),
        })
        .collect())
}

pub(crate) fn country_breakdown(rows: &[Row]) -> Result<Vec<RegionCount>, Error> {
    let entries = labeled_counts(rows)?;
    let total = total(&entries);

    Ok(entries
        .into_iter()
        .map(|(country_code, downloads)| RegionCount {
            country_code,
            downloads,
            share: share(downloads, total),
        })
        .collect())
}

pub(crate) fn top_packages(rows: &[Row]) -> Result<Vec<TopPackage>, Error> {
    rows.iter()
        .map(|row| {
            Ok(TopPackage {
                name: row.text(0)?.to_owned(),
                recent_downloads: row.int(1)?,
            })
        })
        .collect()
}

fn labeled_counts(rows: &[Row]) -> Result<Vec<(String, i64)>, Error> {
    rows.iter()
        .map(|row| Ok((row.text(0)?.to_owned(), row.int(1)?)))
        .collect()
}

fn total(entries: &[(String, i64)]) -> i64 {
    entries.iter().map(|(_, count)| count).sum()
}

/// Share of the full list. An all-zero (or empty) list has no meaningful
/// denominator; every share is 0.0 by convention.
fn share(count: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(values: &[serde_json::Value]) -> Row {
        Row::new(values.to_vec())
    }

    #[test]
    fn scalar_of_zero_rows_is_zero() {
        assert_eq!(count_scalar(&[]).unwrap(), 0);
        assert_eq!(fraction_scalar(&[]).unwrap(), 0.0);
    }

    #[test]
    fn scalar_takes_the_first_column_of_the_first_row() {
        let rows = [row(&[json!("8675309")])];

        assert_eq!(count_scalar(&rows).unwrap(), 8_675_309);
    }

    #[test]
    fn shares_partition_the_total() {
        let rows = [
            row(&[json!("3.7"), json!("900")]),
            row(&[json!("2.7"), json!("100")]),
        ];

        let breakdown = version_breakdown(&rows).unwrap();
        let denominator: i64 = breakdown.iter().map(|entry| entry.downloads).sum();

        assert_eq!(denominator, 1000);

        for entry in &breakdown {
            assert!((0.0..=1.0).contains(&entry.share));
        }

        assert_eq!(breakdown[0].share, 0.9);
        assert_eq!(breakdown[1].share, 0.1);
    }

    #[test]
    fn all_zero_counts_produce_zero_shares() {
        let rows = [row(&[json!("US"), json!("0")])];

        let breakdown = country_breakdown(&rows).unwrap();

        assert_eq!(breakdown[0].share, 0.0);
    }

    #[test]
    fn empty_breakdown_is_empty() {
        assert!(version_breakdown(&[]).unwrap().is_empty());
        assert!(country_breakdown(&[]).unwrap().is_empty());
    }

    #[test]
    fn ranking_preserves_row_order() {
        let rows = [
            row(&[json!("pkgA"), json!("100")]),
            row(&[json!("pkgB"), json!("50")]),
        ];

        let ranking = top_packages(&rows).unwrap();

        assert_eq!(
            ranking,
            vec![
                TopPackage {
                    name: "pkgA".to_owned(),
                    recent_downloads: 100,
                },
                TopPackage {
                    name: "pkgB".to_owned(),
                    recent_downloads: 50,
                },
            ]
        );
    }

    #[test]
    fn malformed_count_is_an_error() {
        let rows = [row(&[json!("3.7"), json!("many")])];

        assert!(version_breakdown(&rows).is_err());
    }
}
