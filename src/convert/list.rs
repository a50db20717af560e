//! Shared helpers for list endpoints
//!
//! Index documents store timestamps in epoch milliseconds; list records
//! expose epoch seconds. Commit records additionally derive a breakdown of
//! their changed lines into new, refactored and legacy lines.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::dsl::response::SearchResponse;
use crate::error::Result;

/// `part * 100 / total`, defined as 0 when `total` is 0
pub fn percentage(part: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Epoch millis to epoch seconds
pub fn millis_to_secs(millis: Option<i64>) -> Option<i64> {
    millis.map(|ms| ms.div_euclid(1000))
}

/// Field deserializer that reads an explicit `null` as the type's default
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode every hit's `_source` into `D`, paired with the document id
pub fn decode_hits<D: DeserializeOwned>(response: &SearchResponse) -> Result<Vec<(String, D)>> {
    response
        .hits
        .hits
        .iter()
        .map(|hit| Ok((hit.id.clone(), serde_json::from_value(hit.source.clone())?)))
        .collect()
}

/// Changed lines of one document split by the age of the revision they replace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineBreakdown {
    /// All changed lines
    pub total: i64,
    /// Lines with no prior revision
    pub new: i64,
    /// Lines whose prior revision is newer than the cutoff
    pub refactored: i64,
    /// Lines whose prior revision is at or before the cutoff
    pub legacy: i64,
}

impl LineBreakdown {
    /// Classify `(lines, previous_revision_millis)` change records against
    /// `cutoff_secs`
    pub fn classify<I>(changes: I, cutoff_secs: i64) -> Self
    where
        I: IntoIterator<Item = (i64, Option<i64>)>,
    {
        changes
            .into_iter()
            .fold(Self::default(), |mut acc, (lines, previous)| {
                acc.total += lines;
                match millis_to_secs(previous) {
                    None => acc.new += lines,
                    Some(prev) if prev > cutoff_secs => acc.refactored += lines,
                    Some(_) => acc.legacy += lines,
                }
                acc
            })
    }

    /// Percent of new lines
    pub fn pct_new(&self) -> f64 {
        percentage(self.new, self.total)
    }

    /// Percent of refactored lines
    pub fn pct_refactored(&self) -> f64 {
        percentage(self.refactored, self.total)
    }

    /// Percent of legacy lines
    pub fn pct_legacy(&self) -> f64 {
        percentage(self.legacy, self.total)
    }
}
