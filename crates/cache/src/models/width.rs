use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A target width held at 2-decimal precision.
///
/// Widths are derived from layout arithmetic and are rarely whole numbers.
/// Two widths that agree to 2 decimal places are the same width, so the value
/// is stored as integer hundredths and compared exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetWidth(u32);

impl TargetWidth {
    /// Round `width` half away from zero to 2 decimals.
    ///
    /// Rejects non-finite values and anything that rounds to zero or below.
    pub fn new(width: f64) -> Result<Self> {
        let hundredths = (width * 100.0).round();
        if !hundredths.is_finite() || hundredths < 1.0 || hundredths > f64::from(u32::MAX) {
            exn::bail!(ErrorKind::InvalidWidth(width.to_string()));
        }
        // Range checked above, so the cast cannot truncate.
        Ok(Self(hundredths as u32))
    }

    pub fn from_hundredths(hundredths: u32) -> Result<Self> {
        if hundredths == 0 {
            exn::bail!(ErrorKind::InvalidWidth("0.00".to_string()));
        }
        Ok(Self(hundredths))
    }

    pub fn hundredths(&self) -> u32 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl TryFrom<f64> for TargetWidth {
    type Error = Error;
    fn try_from(width: f64) -> Result<Self> {
        Self::new(width)
    }
}

impl Display for TargetWidth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for TargetWidth {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let width = s.trim().parse::<f64>().or_raise(|| ErrorKind::InvalidWidth(s.to_string()))?;
        Self::new(width)
    }
}
