//! Working-time fractions.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A working-time rate in millionths: `1.0` is `1_000_000`.
///
/// Stored as an integer so that ranking engagements never compares floats.
/// Rates above one (overtime contracts) are accepted.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct Fraction(u32);

impl Fraction {
  pub const SCALE: u32 = 1_000_000;
  pub const FULL: Self = Self(Self::SCALE);

  pub fn from_millionths(value: u32) -> Self { Self(value) }

  pub fn millionths(self) -> u32 { self.0 }

}

impl FromStr for Fraction {
  type Err = Error;

  /// Parse the feed's decimal text, e.g. `"0.5000"` or `"1"`.
  fn from_str(s: &str) -> Result<Self> {
    let rate: f64 = s
      .trim()
      .replace(',', ".")
      .parse()
      .map_err(|_| Error::InvalidFraction(s.to_owned()))?;
    if !rate.is_finite() || rate < 0.0 {
      return Err(Error::InvalidFraction(s.to_owned()));
    }
    let scaled = (rate * f64::from(Self::SCALE)).round();
    if scaled > f64::from(u32::MAX) {
      return Err(Error::InvalidFraction(s.to_owned()));
    }
    Ok(Self(scaled as u32))
  }
}

impl fmt::Display for Fraction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{:06}", self.0 / Self::SCALE, self.0 % Self::SCALE)
  }
}
