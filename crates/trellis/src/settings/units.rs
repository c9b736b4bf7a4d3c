// Copyright (c) 2025 Zensical and contributors

// SPDX-License-Identifier: MIT
// Third-party contributions licensed under DCO

// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to
// deal in the Software without restriction, including without limitation the
// rights to use, copy, modify, merge, publish, distribute, sublicense, and/or
// sell copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:

// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NON-INFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS
// IN THE SOFTWARE.

// ----------------------------------------------------------------------------

//! Units for durations and sizes in configuration.
//!
//! Configuration values describing time spans or sizes can be given either
//! as plain numbers or as strings with a unit suffix, e.g. `30s` or `4kb`.
//! The unit a plain number is measured in depends on the value: intervals
//! are measured in milliseconds, client caching ages in seconds, and sizes
//! in bytes.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Far future client caching age in seconds, i.e., ten years.
pub const FAR_FUTURE: i64 = 315_360_000;

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// Value that can be read from a number or a string with unit suffix.
trait Unit: Sized {
    /// Description used in error messages.
    const EXPECTING: &'static str;

    /// Creates a value from a plain number.
    fn from_number(value: i64) -> Option<Self>;

    /// Creates a value from a string.
    fn from_text(value: &str) -> Option<Self>;
}

impl Unit for Interval {
    const EXPECTING: &'static str = "milliseconds or a duration like `30s`";

    fn from_number(value: i64) -> Option<Self> {
        u64::try_from(value)
            .ok()
            .map(|millis| Self(Duration::from_millis(millis)))
    }

    fn from_text(value: &str) -> Option<Self> {
        parse_duration(value).map(Self)
    }
}

impl Unit for MaxAge {
    const EXPECTING: &'static str = "seconds, a duration like `1h` or `farFuture`";

    fn from_number(value: i64) -> Option<Self> {
        Some(Self(value))
    }

    fn from_text(value: &str) -> Option<Self> {
        if value == "farFuture" {
            return Some(Self(FAR_FUTURE));
        }
        let duration = parse_duration(value)?;
        i64::try_from(duration.as_secs()).ok().map(Self)
    }
}

impl Unit for ByteSize {
    const EXPECTING: &'static str = "bytes or a size like `4kb`";

    fn from_number(value: i64) -> Option<Self> {
        u64::try_from(value).ok().map(Self)
    }

    fn from_text(value: &str) -> Option<Self> {
        parse_size(value).map(Self)
    }
}

// ----------------------------------------------------------------------------

/// Visitor for values implementing [`Unit`].
struct UnitVisitor<T> {
    marker: std::marker::PhantomData<T>,
}

impl<T> UnitVisitor<T> {
    fn new() -> Self {
        Self { marker: std::marker::PhantomData }
    }
}

impl<T> Visitor<'_> for UnitVisitor<T>
where
    T: Unit,
{
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(T::EXPECTING)
    }

    fn visit_i64<E>(self, value: i64) -> Result<T, E>
    where
        E: de::Error,
    {
        T::from_number(value).ok_or_else(|| {
            E::invalid_value(de::Unexpected::Signed(value), &self)
        })
    }

    fn visit_u64<E>(self, value: u64) -> Result<T, E>
    where
        E: de::Error,
    {
        i64::try_from(value)
            .ok()
            .and_then(T::from_number)
            .ok_or_else(|| {
                E::invalid_value(de::Unexpected::Unsigned(value), &self)
            })
    }

    fn visit_str<E>(self, value: &str) -> Result<T, E>
    where
        E: de::Error,
    {
        T::from_text(value.trim()).ok_or_else(|| {
            E::invalid_value(de::Unexpected::Str(value), &self)
        })
    }
}

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Interval, plain numbers denoting milliseconds.
///
/// # Examples
///
/// ```
/// # use std::error::Error;
/// # fn main() -> Result<(), Box<dyn Error>> {
/// use std::time::Duration;
/// use trellis::settings::Interval;
///
/// // Parse intervals from numbers and strings
/// let interval: Interval = serde_json::from_str("1500")?;
/// assert_eq!(interval.0, Duration::from_millis(1500));
/// let interval: Interval = serde_json::from_str(r#""5m""#)?;
/// assert_eq!(interval.0, Duration::from_secs(300));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Interval(pub Duration);

/// Client caching age, plain numbers denoting seconds.
///
/// Negative ages are valid and mean that caching headers are left alone,
/// while the string `farFuture` stands for [`FAR_FUTURE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaxAge(pub i64);

/// Size, plain numbers denoting bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ByteSize(pub u64);

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl MaxAge {
    /// Leave caching headers untouched.
    pub const UNSET: Self = Self(-1);
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Default for MaxAge {
    #[inline]
    fn default() -> Self {
        Self::UNSET
    }
}

impl From<Duration> for Interval {
    #[inline]
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

// ----------------------------------------------------------------------------

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(UnitVisitor::<Interval>::new())
    }
}

impl<'de> Deserialize<'de> for MaxAge {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(UnitVisitor::<MaxAge>::new())
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(UnitVisitor::<ByteSize>::new())
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Parses a duration with unit suffix, i.e. `ms`, `s`, `m`, `h`, `d` or `w`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use trellis::settings::units::parse_duration;
///
/// assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
/// assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
/// assert_eq!(parse_duration("2"), None);
/// ```
#[must_use]
pub fn parse_duration(value: &str) -> Option<Duration> {
    let (number, unit) = split_unit(value)?;
    let factor = match unit {
        "ms" => 1,
        "s" => 1_000,
        "m" => 60 * 1_000,
        "h" => 60 * 60 * 1_000,
        "d" => 24 * 60 * 60 * 1_000,
        "w" => 7 * 24 * 60 * 60 * 1_000,
        _ => return None,
    };
    number.checked_mul(factor).map(Duration::from_millis)
}

/// Parses a size with unit suffix, i.e. `b`, `kb`, `mb` or `gb`.
///
/// # Examples
///
/// ```
/// use trellis::settings::units::parse_size;
///
/// assert_eq!(parse_size("4kb"), Some(4096));
/// assert_eq!(parse_size("512b"), Some(512));
/// ```
#[must_use]
pub fn parse_size(value: &str) -> Option<u64> {
    let (number, unit) = split_unit(value)?;
    let factor: u64 = match unit.to_ascii_lowercase().as_str() {
        "b" => 1,
        "kb" => 1 << 10,
        "mb" => 1 << 20,
        "gb" => 1 << 30,
        _ => return None,
    };
    number.checked_mul(factor)
}

/// Splits a value into its leading number and trailing unit.
fn split_unit(value: &str) -> Option<(u64, &str)> {
    let index = value.find(|char: char| !char.is_ascii_digit())?;
    let (number, unit) = value.split_at(index);
    let number = number.parse().ok()?;
    Some((number, unit.trim()))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_intervals() -> serde_json::Result<()> {
        let interval: Interval = serde_json::from_str("250")?;
        assert_eq!(interval.0, Duration::from_millis(250));
        let interval: Interval = serde_json::from_str(r#""1d""#)?;
        assert_eq!(interval.0, Duration::from_secs(86_400));
        assert!(serde_json::from_str::<Interval>("-1").is_err());
        assert!(serde_json::from_str::<Interval>(r#""soon""#).is_err());
        Ok(())
    }

    #[test]
    fn reads_max_ages() -> serde_json::Result<()> {
        let age: MaxAge = serde_json::from_str(r#""farFuture""#)?;
        assert_eq!(age, MaxAge(FAR_FUTURE));
        let age: MaxAge = serde_json::from_str("-1")?;
        assert_eq!(age, MaxAge::UNSET);
        let age: MaxAge = serde_json::from_str(r#""1h""#)?;
        assert_eq!(age, MaxAge(3600));
        let age: MaxAge = serde_json::from_str("3600")?;
        assert_eq!(age, MaxAge(3600));
        Ok(())
    }

    #[test]
    fn reads_sizes() -> serde_json::Result<()> {
        let size: ByteSize = serde_json::from_str(r#""2mb""#)?;
        assert_eq!(size, ByteSize(2 * 1024 * 1024));
        let size: ByteSize = serde_json::from_str("1024")?;
        assert_eq!(size, ByteSize(1024));
        assert!(serde_json::from_str::<ByteSize>(r#""2tb""#).is_err());
        Ok(())
    }
}
