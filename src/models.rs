use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

static TIME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<hour>\d{1,2}):(?P<minute>\d{2})").unwrap());

static TIME_INPUT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<meridiem>[AaPp][Mm])?$").unwrap()
});

/// One logged fishing event, as returned by the backend.
///
/// Everything besides `id` is optional in transit. The numeric fields may
/// arrive as JSON numbers or as strings; values that cannot be coerced are
/// kept as absent so they never reach an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catch {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub bait: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub length_in: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub weight_lbs: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature: Option<f64>,
}

impl Catch {
    /// Display form of the date, `MM/DD/YYYY`. Unparsable dates fall back to
    /// the raw stored string so searching still finds them.
    pub fn formatted_date(&self) -> String {
        let Some(date) = self.date.as_deref() else {
            return String::new();
        };

        match NaiveDate::parse_from_str(date_part(date), "%Y-%m-%d") {
            Ok(parsed) => parsed.format("%m/%d/%Y").to_string(),
            Err(_) => date.to_string(),
        }
    }

    /// Display form of the time, 12-hour `h:MM AM/PM`.
    pub fn formatted_time(&self) -> String {
        let Some(time) = self.time.as_deref() else {
            return String::new();
        };

        match parse_time(time) {
            Some(parsed) => {
                let meridiem = if parsed.hour() >= 12 { "PM" } else { "AM" };
                let hour = match parsed.hour() % 12 {
                    0 => 12,
                    hour => hour,
                };
                format!("{}:{:02} {}", hour, parsed.minute(), meridiem)
            }
            None => time.to_string(),
        }
    }

    /// Combined date and time used by the canonical sort order. A missing or
    /// unparsable time counts as midnight; a missing or unparsable date means
    /// the record has no timestamp at all.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::parse_from_str(date_part(self.date.as_deref()?), "%Y-%m-%d").ok()?;
        let time = self
            .time
            .as_deref()
            .and_then(parse_time)
            .unwrap_or(NaiveTime::MIN);

        Some(date.and_time(time))
    }
}

/// A catch as the user submits it. The backend assigns the id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatchDraft {
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub species: Option<String>,
    pub bait: Option<String>,
    pub length_in: Option<f64>,
    pub weight_lbs: Option<f64>,
    pub temperature: Option<f64>,
}

impl CatchDraft {
    /// Fill a blank date with today and a blank time with the current wall
    /// clock before submission.
    pub fn with_defaults(mut self) -> Self {
        let now = Local::now();
        if self.date.as_deref().map_or(true, |d| d.trim().is_empty()) {
            self.date = Some(now.format("%Y-%m-%d").to_string());
        }
        if self.time.as_deref().map_or(true, |t| t.trim().is_empty()) {
            self.time = Some(now.format("%H:%M").to_string());
        }
        self
    }
}

impl From<&Catch> for CatchDraft {
    fn from(catch: &Catch) -> Self {
        Self {
            date: catch.date.clone(),
            time: catch.time.clone(),
            location: catch.location.clone(),
            species: catch.species.clone(),
            bait: catch.bait.clone(),
            length_in: catch.length_in,
            weight_lbs: catch.weight_lbs,
            temperature: catch.temperature,
        }
    }
}

/// Normalize a user-entered date (`M/D/YYYY` or ISO) to `YYYY-MM-DD`.
pub fn normalize_date_input(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(input, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(input, "%Y-%m-%d"))
        .ok()
        .map(|date| date.format("%Y-%m-%d").to_string())
}

/// Normalize a user-entered time (`h:MM AM/PM` or 24-hour `HH:MM`) to `HH:MM`.
pub fn normalize_time_input(input: &str) -> Option<String> {
    let captures = TIME_INPUT_REGEX.captures(input.trim())?;
    let mut hour: u32 = captures["hour"].parse().ok()?;
    let minute: u32 = captures["minute"].parse().ok()?;

    if let Some(meridiem) = captures.name("meridiem") {
        match meridiem.as_str().to_ascii_uppercase().as_str() {
            "PM" if hour != 12 => hour += 12,
            "AM" if hour == 12 => hour = 0,
            _ => {}
        }
    }

    NaiveTime::from_hms_opt(hour, minute, 0).map(|time| time.format("%H:%M").to_string())
}

// Stored times are `HH:MM`; trailing seconds are tolerated and dropped.
fn parse_time(time: &str) -> Option<NaiveTime> {
    let captures = TIME_REGEX.captures(time.trim())?;
    let hour = captures["hour"].parse().ok()?;
    let minute = captures["minute"].parse().ok()?;

    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn date_part(date: &str) -> &str {
    match date.split_once('T') {
        Some((day, _)) => day,
        None => date,
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;

    Ok(value.and_then(|value| match value {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }))
}
