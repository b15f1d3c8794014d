//! Pixel changes and the frame-indexed diff map.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::DiffError;

/// "At this frame, cell `(x, y)` becomes `color`."
///
/// Serializes as a three-element array `[x, y, color]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(u32, u32, u8)", into = "(u32, u32, u8)")]
pub struct PixelChange {
    pub x: u32,
    pub y: u32,
    pub color: u8,
}

impl PixelChange {
    pub const fn new(x: u32, y: u32, color: u8) -> Self {
        Self { x, y, color }
    }
}

impl From<(u32, u32, u8)> for PixelChange {
    fn from((x, y, color): (u32, u32, u8)) -> Self {
        Self { x, y, color }
    }
}

impl From<PixelChange> for (u32, u32, u8) {
    fn from(change: PixelChange) -> Self {
        (change.x, change.y, change.color)
    }
}

/// Changes for one frame transition, in row-major order.
pub type ChangeSet = Vec<PixelChange>;

/// Sparse mapping from source frame index to its change set.
///
/// Frames without changes are absent. Keys iterate in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiffMap {
    frames: BTreeMap<u64, ChangeSet>,
}

impl DiffMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the changes for `index`. Empty sets are not stored.
    ///
    /// Returns `true` if an entry was stored.
    pub fn insert(&mut self, index: u64, changes: ChangeSet) -> bool {
        if changes.is_empty() {
            return false;
        }
        self.frames.insert(index, changes);
        true
    }

    pub fn get(&self, index: u64) -> Option<&ChangeSet> {
        self.frames.get(&index)
    }

    pub fn contains(&self, index: u64) -> bool {
        self.frames.contains_key(&index)
    }

    /// Entries in ascending frame order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &ChangeSet)> + '_ {
        self.frames.iter().map(|(&index, changes)| (index, changes))
    }

    pub fn frame_indices(&self) -> impl Iterator<Item = u64> + '_ {
        self.frames.keys().copied()
    }

    /// Number of frames with changes.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total number of cell writes across all frames.
    pub fn total_changes(&self) -> usize {
        self.frames.values().map(Vec::len).sum()
    }

    /// Checks every change against the grid and palette size.
    pub fn validate(&self, width: u32, height: u32, palette_len: usize) -> Result<(), DiffError> {
        for (&frame, changes) in &self.frames {
            for change in changes {
                if change.x >= width || change.y >= height {
                    return Err(DiffError::OutOfBounds {
                        frame,
                        x: change.x,
                        y: change.y,
                        width,
                        height,
                    });
                }
                if change.color as usize >= palette_len {
                    return Err(DiffError::InvalidColor {
                        frame,
                        color: change.color,
                        palette_len,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, DiffError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DiffError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the map as JSON to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DiffError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Reads a JSON map from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DiffError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

impl FromIterator<(u64, ChangeSet)> for DiffMap {
    fn from_iter<T: IntoIterator<Item = (u64, ChangeSet)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (index, changes) in iter {
            map.insert(index, changes);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sets_not_stored() {
        let mut map = DiffMap::new();
        assert!(!map.insert(3, Vec::new()));
        assert!(map.is_empty());
        assert!(map.insert(4, vec![PixelChange::new(0, 0, 1)]));
        assert_eq!(map.frame_indices().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn test_json_shape() {
        let map: DiffMap = [(2, vec![PixelChange::new(0, 0, 2), PixelChange::new(5, 1, 3)])]
            .into_iter()
            .collect();
        assert_eq!(map.to_json().unwrap(), r#"{"2":[[0,0,2],[5,1,3]]}"#);
    }

    #[test]
    fn test_json_parse() {
        let map = DiffMap::from_json(r#"{"10": [[1, 2, 3]], "7": [[0, 0, 0]]}"#).unwrap();
        assert_eq!(map.frame_indices().collect::<Vec<_>>(), vec![7, 10]);
        assert_eq!(map.get(10).unwrap(), &vec![PixelChange::new(1, 2, 3)]);
    }

    #[test]
    fn test_json_rejects_negative_coordinates() {
        assert!(matches!(
            DiffMap::from_json(r#"{"0": [[-1, 0, 1]]}"#),
            Err(DiffError::Json(_))
        ));
    }

    #[test]
    fn test_validate_bounds_and_colors() {
        let map: DiffMap = [(1, vec![PixelChange::new(24, 0, 1)])].into_iter().collect();
        assert!(matches!(
            map.validate(24, 20, 4),
            Err(DiffError::OutOfBounds { frame: 1, x: 24, .. })
        ));

        let map: DiffMap = [(1, vec![PixelChange::new(0, 0, 4)])].into_iter().collect();
        assert!(matches!(
            map.validate(24, 20, 4),
            Err(DiffError::InvalidColor { color: 4, .. })
        ));
    }

    #[test]
    fn test_total_changes() {
        let map: DiffMap = [
            (0, vec![PixelChange::new(0, 0, 1); 3]),
            (9, vec![PixelChange::new(1, 1, 2)]),
        ]
        .into_iter()
        .collect();
        assert_eq!(map.total_changes(), 4);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diffs.json");
        let map: DiffMap = [(3, vec![PixelChange::new(2, 1, 0)])].into_iter().collect();

        map.save(&path).unwrap();
        assert_eq!(DiffMap::load(&path).unwrap(), map);
    }
}
