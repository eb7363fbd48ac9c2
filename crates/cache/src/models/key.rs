use crate::error::{Error, ErrorKind, Result};
use crate::models::TargetWidth;
use exn::{OptionExt, ResultExt};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

const SEPARATOR: &str = "--";

/// Canonical identity of a cache entry: `"<identifier>--<width>"`.
///
/// The string form is the durable store key, so its format must never
/// change. Identifiers are opaque URIs and may themselves contain `--`;
/// decoding splits on the last separator because the width never does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub asset_identifier: String,
    pub target_width: TargetWidth,
}
impl CacheKey {
    pub fn new(asset_identifier: impl Into<String>, target_width: TargetWidth) -> Self {
        Self { asset_identifier: asset_identifier.into(), target_width }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.asset_identifier, self.target_width)
    }
}

impl FromStr for CacheKey {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let (identifier, width) = s.rsplit_once(SEPARATOR).ok_or_raise(|| ErrorKind::InvalidKey(s.to_string()))?;
        if identifier.is_empty() {
            exn::bail!(ErrorKind::InvalidKey(s.to_string()));
        }
        let target_width = width.parse::<TargetWidth>().or_raise(|| ErrorKind::InvalidKey(s.to_string()))?;
        Ok(Self::new(identifier, target_width))
    }
}
