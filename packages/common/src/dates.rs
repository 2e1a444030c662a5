use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use thiserror::Error;

/// Naive layouts accepted on input, tried in order. All of them are read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("Invalid date '{0}'. Expected an ISO-8601 date such as 2020-01-01T10:00:00.000Z")]
    Malformed(String),
    #[error("Date '{date}' before the minimal acceptable date {min}")]
    TooEarly { date: String, min: String },
    #[error("Date '{date}' after the maximal acceptable date {max}")]
    TooLate { date: String, max: String },
    #[error("Date range error: from '{from}' > to '{to}'")]
    InvertedRange { from: String, to: String },
}

/// Acceptable date window for every date read from a request.
///
/// Built once from configuration and shared read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateConfig {
    min: Option<DateTime<Utc>>,
    max: Option<DateTime<Utc>>,
}

impl DateConfig {
    /// Build the window from the raw configuration strings.
    pub fn from_bounds(min: Option<&str>, max: Option<&str>) -> Result<Self, DateError> {
        let min = min.map(parse_iso).transpose()?;
        let max = max.map(parse_iso).transpose()?;
        Ok(Self { min, max })
    }

    /// Parse `input` and make sure it falls inside the window.
    pub fn parse(&self, input: &str) -> Result<DateTime<Utc>, DateError> {
        let date = parse_iso(input)?;
        self.check(date)
    }

    pub fn parse_opt(&self, input: Option<&str>) -> Result<Option<DateTime<Utc>>, DateError> {
        input.map(|s| self.parse(s)).transpose()
    }

    /// Reject dates outside of `[min, max]`.
    pub fn check(&self, date: DateTime<Utc>) -> Result<DateTime<Utc>, DateError> {
        if let Some(min) = self.min
            && date < min
        {
            return Err(DateError::TooEarly {
                date: format(&date),
                min: format(&min),
            });
        }
        if let Some(max) = self.max
            && date > max
        {
            return Err(DateError::TooLate {
                date: format(&date),
                max: format(&max),
            });
        }
        Ok(date)
    }
}

pub fn check_order(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<(), DateError> {
    if from > to {
        return Err(DateError::InvertedRange {
            from: format(&from),
            to: format(&to),
        });
    }
    Ok(())
}

/// Current instant, truncated to the millisecond.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Parse an ISO-8601 date, with or without offset, down to the day.
///
/// Anything below the millisecond is dropped so that a parsed date always
/// survives a [`format`] round trip.
pub fn parse_iso(input: &str) -> Result<DateTime<Utc>, DateError> {
    let trimmed = input.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(date.with_timezone(&Utc).trunc_subsecs(3));
    }

    let naive = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    for fmt in NAIVE_FORMATS {
        if let Ok(date) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Ok(date.and_utc().trunc_subsecs(3));
        }
    }
    if let Ok(day) = NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        && let Some(midnight) = day.and_hms_opt(0, 0, 0)
    {
        return Ok(midnight.and_utc());
    }

    Err(DateError::Malformed(trimmed.to_string()))
}

/// Format as `yyyy-MM-ddTHH:mm:ss.SSSZ`.
pub fn format(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde adapter writing dates with millisecond precision and reading any
/// layout accepted by [`parse_iso`].
pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_iso(&raw).map_err(D::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        pub fn serialize<S: Serializer>(
            date: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => serializer.serialize_str(&super::super::format(date)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::super::parse_iso(&raw).map_err(D::Error::custom))
                .transpose()
        }
    }
}
