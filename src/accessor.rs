//! Typed conversions from resolved values
//!
//! Every scalar conversion starts from the value's string form, so a number
//! written as `"8080"` and one written as `8080` read the same.

use crate::error::AccessError;
use crate::view::ValueRef;
use std::time::Duration;

/// Conversion from a resolved value
pub trait FromValue: Sized {
    /// Converts `value`, or describes why it does not coerce
    fn from_value(value: &ValueRef<'_>) -> Result<Self, AccessError>;
}

impl FromValue for String {
    fn from_value(value: &ValueRef<'_>) -> Result<Self, AccessError> {
        value.get_string()
    }
}

impl FromValue for bool {
    fn from_value(value: &ValueRef<'_>) -> Result<Self, AccessError> {
        parse_bool(&value.get_string()?)
    }
}

macro_rules! impl_from_value_for_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &ValueRef<'_>) -> Result<Self, AccessError> {
                    let text = value.get_string()?;
                    text.parse::<$ty>().map_err(|e| AccessError::InvalidNumber {
                        reason: e.to_string(),
                        target: stringify!($ty),
                        value: text,
                    })
                }
            }
        )*
    };
}

impl_from_value_for_number!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &ValueRef<'_>) -> Result<Self, AccessError> {
        value.get_array()?.iter().map(T::from_value).collect()
    }
}

/// A size in bytes, read with unit suffixes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteSize(pub u64);

impl FromValue for ByteSize {
    fn from_value(value: &ValueRef<'_>) -> Result<Self, AccessError> {
        parse_byte_size(&value.get_string()?).map(ByteSize)
    }
}

/// Reads `infinite` as [`Duration::MAX`]
impl FromValue for Duration {
    fn from_value(value: &ValueRef<'_>) -> Result<Self, AccessError> {
        parse_duration(&value.get_string()?, true)
    }
}

/// Parses the boolean vocabulary, ignoring case
///
/// `true`/`yes`/`on` and `false`/`no`/`off`.
pub fn parse_bool(text: &str) -> Result<bool, AccessError> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Ok(true),
        "false" | "no" | "off" => Ok(false),
        _ => Err(AccessError::InvalidBoolean {
            value: text.to_string(),
        }),
    }
}

/// Splits `"10 MiB"` into `("10", "MiB")`
fn split_unit(text: &str) -> (&str, &str) {
    let text = text.trim();
    let end = text
        .find(|ch: char| !(ch.is_ascii_digit() || ch == '.'))
        .unwrap_or(text.len());
    (&text[..end], text[end..].trim_start())
}

fn byte_multiplier(unit: &str) -> Option<u64> {
    const KB: u64 = 1000;
    const KIB: u64 = 1024;
    let multiplier = match unit {
        "" | "B" | "b" | "byte" | "bytes" => 1,
        "kB" | "kilobyte" | "kilobytes" => KB,
        "MB" | "megabyte" | "megabytes" => KB.pow(2),
        "GB" | "gigabyte" | "gigabytes" => KB.pow(3),
        "TB" | "terabyte" | "terabytes" => KB.pow(4),
        "K" | "k" | "Ki" | "KiB" | "kibibyte" | "kibibytes" => KIB,
        "M" | "m" | "Mi" | "MiB" | "mebibyte" | "mebibytes" => KIB.pow(2),
        "G" | "g" | "Gi" | "GiB" | "gibibyte" | "gibibytes" => KIB.pow(3),
        "T" | "t" | "Ti" | "TiB" | "tebibyte" | "tebibytes" => KIB.pow(4),
        _ => return None,
    };
    Some(multiplier)
}

/// Parses a byte size such as `512`, `10kB` or `4 MiB`
///
/// Units are case-sensitive. SI units (`kB`, `MB`, `GB`, `TB`) are powers of
/// 1000; IEC units (`KiB`, `MiB`, ...) and the one-letter forms (`K`, `M`,
/// `G`, `T`, either case) are powers of 1024. A bare number is bytes.
pub fn parse_byte_size(text: &str) -> Result<u64, AccessError> {
    let invalid = || AccessError::InvalidByteSize {
        value: text.to_string(),
    };
    let (number, unit) = split_unit(text);
    let magnitude = number.parse::<u64>().map_err(|_| invalid())?;
    let multiplier = byte_multiplier(unit).ok_or_else(invalid)?;
    magnitude.checked_mul(multiplier).ok_or_else(invalid)
}

fn duration_nanos(unit: &str) -> Option<u64> {
    const MICRO: u64 = 1_000;
    const MILLI: u64 = 1_000_000;
    const SECOND: u64 = 1_000_000_000;
    let nanos = match unit {
        "ns" | "nano" | "nanos" | "nanosecond" | "nanoseconds" => 1,
        "us" | "micro" | "micros" | "microsecond" | "microseconds" => MICRO,
        "" | "ms" | "milli" | "millis" | "millisecond" | "milliseconds" => MILLI,
        "s" | "second" | "seconds" => SECOND,
        "m" | "min" | "mins" | "minute" | "minutes" => 60 * SECOND,
        "h" | "hour" | "hours" => 3_600 * SECOND,
        "d" | "day" | "days" => 86_400 * SECOND,
        _ => return None,
    };
    Some(nanos)
}

/// Parses a duration such as `250`, `30s` or `1.5 h`
///
/// A bare number is milliseconds. `infinite` is [`Duration::MAX`] when
/// `allow_infinite` is set and an error otherwise.
pub fn parse_duration(text: &str, allow_infinite: bool) -> Result<Duration, AccessError> {
    let invalid = || AccessError::InvalidDuration {
        value: text.to_string(),
    };
    if text.trim() == "infinite" {
        return if allow_infinite {
            Ok(Duration::MAX)
        } else {
            Err(invalid())
        };
    }

    let (number, unit) = split_unit(text);
    let per_unit = duration_nanos(unit).ok_or_else(invalid)?;
    if let Ok(whole) = number.parse::<u64>() {
        let nanos = whole.checked_mul(per_unit).ok_or_else(invalid)?;
        return Ok(Duration::from_nanos(nanos));
    }

    let fractional = number.parse::<f64>().map_err(|_| invalid())?;
    let nanos = fractional * per_unit as f64;
    if !nanos.is_finite() || nanos >= u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(nanos.round() as u64))
}
