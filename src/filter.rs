use std::cmp::Ordering;

use crate::models::Catch;

/// Filter the full set by a search keyword and return the matches in the
/// canonical order. The input is never mutated.
///
/// The keyword is trimmed and compared case-insensitively. A record matches
/// when the keyword is empty, or is a substring of the formatted display date
/// or time, or of the string form of any other field. The raw `date`/`time`
/// strings are only ever compared in their formatted form.
pub fn apply(catches: &[Catch], keyword: &str) -> Vec<Catch> {
    let keyword = keyword.trim().to_lowercase();

    let mut filtered: Vec<Catch> = catches
        .iter()
        .filter(|catch| matches(catch, &keyword))
        .cloned()
        .collect();
    filtered.sort_by(compare);

    filtered
}

/// Canonical ordering: combined date and time descending, newest id first on
/// ties. Records without a parsable date sort after every dated one. Ids are
/// unique, so the order is total.
pub fn compare(a: &Catch, b: &Catch) -> Ordering {
    b.timestamp()
        .cmp(&a.timestamp())
        .then_with(|| b.id.cmp(&a.id))
}

fn matches(catch: &Catch, keyword: &str) -> bool {
    if keyword.is_empty() {
        return true;
    }

    if catch.formatted_date().to_lowercase().contains(keyword)
        || catch.formatted_time().to_lowercase().contains(keyword)
    {
        return true;
    }

    other_fields(catch)
        .iter()
        .any(|field| field.to_lowercase().contains(keyword))
}

fn other_fields(catch: &Catch) -> Vec<String> {
    let mut fields = vec![catch.id.to_string()];

    for text in [&catch.user_id, &catch.location, &catch.species, &catch.bait] {
        if let Some(value) = text {
            fields.push(value.clone());
        }
    }
    for number in [catch.length_in, catch.weight_lbs, catch.temperature] {
        if let Some(value) = number {
            fields.push(value.to_string());
        }
    }

    fields
}
