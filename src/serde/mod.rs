use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{de, Deserialize, Deserializer, Serializer};

pub fn serialize_to_str<T, S>(that: T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: fmt::Display,
    S: Serializer,
{
    serializer.collect_str(&that)
}

pub fn deserialize_from_str<'de, S, D>(deserializer: D) -> Result<S, D::Error>
where
    S: FromStr,
    S::Err: fmt::Display,
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    S::from_str(&s).map_err(de::Error::custom)
}

pub fn serialize_duration_secs<S: Serializer>(that: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(that.as_secs())
}

/// Accepts a number of seconds or a duration string made of decimal numbers with units, such as
/// `"60s"`, `"2m"` or `"1m30s"`. A bare number string is read as seconds.
pub fn deserialize_duration_secs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    struct DurationVisitor;

    impl<'de> de::Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a number of seconds or a duration such as \"60s\" or \"1m30s\"")
        }

        fn visit_u64<E: de::Error>(self, secs: u64) -> Result<Self::Value, E> {
            Ok(Duration::from_secs(secs))
        }

        fn visit_i64<E: de::Error>(self, secs: i64) -> Result<Self::Value, E> {
            u64::try_from(secs)
                .map(Duration::from_secs)
                .map_err(|_| E::invalid_value(de::Unexpected::Signed(secs), &self))
        }

        fn visit_f64<E: de::Error>(self, secs: f64) -> Result<Self::Value, E> {
            Duration::try_from_secs_f64(secs).map_err(|_| E::invalid_value(de::Unexpected::Float(secs), &self))
        }

        fn visit_str<E: de::Error>(self, rep: &str) -> Result<Self::Value, E> {
            parse_duration(rep).map_err(E::custom)
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

/// Parses a duration such as `"90"`, `"60s"`, `"1.5h"` or `"1m30s"`. Units are `h`, `m`, `s`,
/// `ms`, `us` (or `µs`) and `ns`; a bare integer is seconds. Negative durations are rejected.
pub fn parse_duration(rep: &str) -> Result<Duration, String> {
    let rep = rep.trim();
    if rep.is_empty() {
        return Err("empty duration".to_string());
    }

    if let Ok(secs) = rep.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let is_numeric = |c: char| c.is_ascii_digit() || c == '.';
    let mut nanos: u64 = 0;
    let mut rest = rep;
    while !rest.is_empty() {
        let (number, tail) = rest.split_at(rest.find(|c: char| !is_numeric(c)).unwrap_or(rest.len()));
        let (unit, tail) = tail.split_at(tail.find(is_numeric).unwrap_or(tail.len()));

        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid number {:?} in duration {:?}", number, rep))?;
        let unit_nanos: u64 = match unit {
            "h" => 3_600_000_000_000,
            "m" => 60_000_000_000,
            "s" => 1_000_000_000,
            "ms" => 1_000_000,
            "us" | "µs" => 1_000,
            "ns" => 1,
            "" => return Err(format!("missing unit in duration {:?}", rep)),
            unknown => return Err(format!("unknown unit {:?} in duration {:?}", unknown, rep)),
        };

        let part = (value * unit_nanos as f64).round();
        if !(0.0..=u64::MAX as f64).contains(&part) {
            return Err(format!("duration {:?} is out of range", rep));
        }
        nanos = nanos
            .checked_add(part as u64)
            .ok_or_else(|| format!("duration {:?} is out of range", rep))?;
        rest = tail;
    }

    Ok(Duration::from_nanos(nanos))
}

/// Accepts either a sequence of strings or a single comma-separated string. Every entry is split
/// on commas and trimmed; empty entries are dropped.
pub fn deserialize_comma_separated<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let raw = match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(rep) => vec![rep],
        OneOrMany::Many(reps) => reps,
    };

    Ok(split_comma_separated(raw))
}

pub fn split_comma_separated<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .flat_map(|v| {
            v.as_ref()
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}
