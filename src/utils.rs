use core::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::de;

lazy_static! {
    // Whole text must be a plain decimal number, optionally signed and with an exponent.
    static ref NUMERIC_REGEX: Regex =
        Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").unwrap();
}

/// Parses user text as a number only when the entire (trimmed) text is numeric.
pub fn parse_numeric(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if !NUMERIC_REGEX.is_match(trimmed) {
        return None;
    }

    trimmed.parse::<f64>().ok().filter(|x| x.is_finite())
}

/// Rounds half away from zero at `decimals` places.
#[inline]
pub fn round_half_up(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// `round_half_up` rendered with exactly `decimals` fraction digits.
pub fn format_fixed(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, round_half_up(value, decimals))
}

struct LenientF64Visitor;

impl<'de> de::Visitor<'de> for LenientF64Visitor {
    type Value = f64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a number or a string containing a number")
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(v)
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(v as f64)
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(v as f64)
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        match parse_numeric(s) {
            Some(v) => Ok(v),
            None => Err(de::Error::invalid_value(de::Unexpected::Str(s), &self)),
        }
    }
}

/// Upstream feeds send numbers either as JSON numbers or as numeric strings.
pub fn lenient_f64<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: de::Deserializer<'de>,
{
    d.deserialize_any(LenientF64Visitor)
}
