//! Chart-ready summaries derived from the full record set.
//!
//! Every aggregate here works on the complete cached set, never the filtered
//! or paginated view. Group order is first-encounter order unless a function
//! says otherwise, and records with missing or uncoercible values simply do
//! not contribute.

use phf::phf_map;
use serde::Serialize;

use crate::models::Catch;

/// Bucket label for records missing the grouped-on field.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    SpeciesCounts,
    CatchesOverTime,
    AverageWeight,
    BaitUsage,
    AverageLength,
}

/// User-facing chart names, as accepted by the `chart` command.
pub static CHART_KINDS: phf::Map<&'static str, ChartKind> = phf_map! {
    "species" => ChartKind::SpeciesCounts,
    "time" => ChartKind::CatchesOverTime,
    "weight" => ChartKind::AverageWeight,
    "bait" => ChartKind::BaitUsage,
    "length" => ChartKind::AverageLength,
};

/// Labels with one count per label.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CountSeries {
    pub labels: Vec<String>,
    pub counts: Vec<u64>,
}

impl CountSeries {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Labels with one value per label.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValueSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ValueSeries {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartData {
    Counts(CountSeries),
    Values(ValueSeries),
}

/// Build the summary behind `kind` from the full record set.
pub fn build(kind: ChartKind, catches: &[Catch]) -> ChartData {
    match kind {
        ChartKind::SpeciesCounts => ChartData::Counts(species_counts(catches)),
        ChartKind::CatchesOverTime => ChartData::Counts(catches_over_time(catches)),
        ChartKind::AverageWeight => ChartData::Values(average_weight(catches)),
        ChartKind::BaitUsage => ChartData::Counts(bait_usage(catches)),
        ChartKind::AverageLength => ChartData::Values(average_length(catches)),
    }
}

/// Number of catches per species; missing species group under
/// [`UNKNOWN_LABEL`].
pub fn species_counts(catches: &[Catch]) -> CountSeries {
    count_by(catches, |catch| label_or_unknown(catch.species.as_deref()))
}

/// Number of catches per calendar day, sorted ascending by the ISO date
/// label. Undated records group under [`UNKNOWN_LABEL`], which sorts after
/// every date.
pub fn catches_over_time(catches: &[Catch]) -> CountSeries {
    let series = count_by(catches, |catch| {
        label_or_unknown(catch.date.as_deref().map(date_part))
    });

    let mut pairs: Vec<_> = series.labels.into_iter().zip(series.counts).collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let (labels, counts) = pairs.into_iter().unzip();
    CountSeries { labels, counts }
}

/// Average weight per species over the records carrying a coercible weight.
/// Species with no usable weight at all are left out entirely.
pub fn average_weight(catches: &[Catch]) -> ValueSeries {
    average_by(catches, |catch| catch.weight_lbs)
}

/// Average length per species, same inclusion rule as [`average_weight`].
pub fn average_length(catches: &[Catch]) -> ValueSeries {
    average_by(catches, |catch| catch.length_in)
}

/// Number of catches per bait; missing bait groups under [`UNKNOWN_LABEL`].
pub fn bait_usage(catches: &[Catch]) -> CountSeries {
    count_by(catches, |catch| label_or_unknown(catch.bait.as_deref()))
}

fn count_by(catches: &[Catch], label_of: impl Fn(&Catch) -> String) -> CountSeries {
    let mut labels: Vec<String> = Vec::new();
    let mut counts: Vec<u64> = Vec::new();

    for catch in catches {
        let label = label_of(catch);
        match labels.iter().position(|known| *known == label) {
            Some(index) => counts[index] += 1,
            None => {
                labels.push(label);
                counts.push(1);
            }
        }
    }

    CountSeries { labels, counts }
}

fn average_by(catches: &[Catch], value_of: impl Fn(&Catch) -> Option<f64>) -> ValueSeries {
    let mut labels: Vec<String> = Vec::new();
    let mut sums: Vec<f64> = Vec::new();
    let mut counts: Vec<u64> = Vec::new();

    for catch in catches {
        let Some(species) = catch.species.as_deref().filter(|s| !s.trim().is_empty()) else {
            continue;
        };
        let Some(value) = value_of(catch) else {
            continue;
        };

        match labels.iter().position(|known| known == species) {
            Some(index) => {
                sums[index] += value;
                counts[index] += 1;
            }
            None => {
                labels.push(species.to_string());
                sums.push(value);
                counts.push(1);
            }
        }
    }

    let values = sums
        .iter()
        .zip(&counts)
        .map(|(sum, count)| sum / *count as f64)
        .collect();

    ValueSeries { labels, values }
}

fn label_or_unknown(value: Option<&str>) -> String {
    match value {
        Some(value) if !value.trim().is_empty() => value.to_string(),
        _ => UNKNOWN_LABEL.to_string(),
    }
}

fn date_part(date: &str) -> &str {
    match date.split_once('T') {
        Some((day, _)) => day,
        None => date,
    }
}
