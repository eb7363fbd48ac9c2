use crate::error::{ErrorKind, Result};
use serde::{Deserialize, Serialize};

/// Column counts the gallery grid can be laid out with.
pub const COLUMN_CHOICES: [u8; 6] = [1, 2, 3, 5, 6, 8];
/// Gaps (between grid cells) the gallery grid can be laid out with.
pub const GAP_CHOICES: [u8; 5] = [1, 2, 4, 8, 12];

/// Gallery grid layout, from which the artifact target width is derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryLayout {
    pub window_width: f64,
    pub columns: u8,
    pub gap: u8,
}

impl Default for GalleryLayout {
    fn default() -> Self {
        Self { window_width: 390.0, columns: 5, gap: 1 }
    }
}

impl GalleryLayout {
    /// Width of a single grid cell: the window minus one gap per column, shared evenly.
    pub fn target_width(&self) -> f64 {
        let columns = f64::from(self.columns);
        (self.window_width - columns * f64::from(self.gap)) / columns
    }

    pub fn validate(&self) -> Result<()> {
        if !COLUMN_CHOICES.contains(&self.columns) {
            exn::bail!(ErrorKind::Invalid(format!(
                "gallery columns must be one of {COLUMN_CHOICES:?}, got {}",
                self.columns
            )));
        }
        if !GAP_CHOICES.contains(&self.gap) {
            exn::bail!(ErrorKind::Invalid(format!("gallery gap must be one of {GAP_CHOICES:?}, got {}", self.gap)));
        }
        if !self.window_width.is_finite() || self.target_width() <= 0.0 {
            exn::bail!(ErrorKind::Invalid(format!(
                "window width {} leaves no room for {} columns with a gap of {}",
                self.window_width, self.columns, self.gap
            )));
        }
        Ok(())
    }
}
