use serde::{Deserialize, Serialize};

/// A media asset as reported by the external index.
///
/// The identifier is an opaque URI owned by the index. Nothing in mipmap
/// invents one; the constructor exists so index implementations can build
/// records from whatever they enumerate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRecord {
    pub identifier: String,
}
impl AssetRecord {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self { identifier: identifier.into() }
    }
}
