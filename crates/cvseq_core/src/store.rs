//! Fixed-size step storage for patterns, pitches and sample-and-hold values.
//!
//! Every row spans the full `MAX_STEPS` domain regardless of the channel's current
//! step count, so rows never reallocate and can live inside the audio thread's
//! snapshot. On the wire a row is a plain JSON array; shorter arrays are padded
//! with the element default.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{CHANNEL_COUNT, MAX_STEPS};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepRow<T>([T; MAX_STEPS]);

impl<T: Copy + Default> Default for StepRow<T> {
    fn default() -> Self {
        Self([T::default(); MAX_STEPS])
    }
}

impl<T: Copy + Default> StepRow<T> {
    /// Build a row from the leading `values`; the remainder is filled with defaults.
    pub fn from_slice(values: &[T]) -> Self {
        let mut row = Self::default();
        for (slot, value) in row.0.iter_mut().zip(values) {
            *slot = *value;
        }
        row
    }

    /// Reset every step to the element default.
    pub fn clear(&mut self) {
        self.0 = [T::default(); MAX_STEPS];
    }
}

impl<T: Copy> StepRow<T> {
    pub fn get(&self, step: usize) -> Option<T> {
        self.0.get(step).copied()
    }

    /// Out-of-range steps are ignored.
    pub fn set(&mut self, step: usize, value: T) {
        if let Some(slot) = self.0.get_mut(step) {
            *slot = value;
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.0
    }
}

impl<T: Copy + Serialize> Serialize for StepRow<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

impl<'de, T: Copy + Default + Deserialize<'de>> Deserialize<'de> for StepRow<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<T>::deserialize(deserializer)?;
        if values.len() > MAX_STEPS {
            return Err(D::Error::invalid_length(
                values.len(),
                &"at most 96 steps per channel",
            ));
        }
        Ok(Self::from_slice(&values))
    }
}

/// One `StepRow` per output channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
#[serde(bound(
    serialize = "T: Copy + Serialize",
    deserialize = "T: Copy + Default + Deserialize<'de>"
))]
pub struct StepMatrix<T> {
    rows: [StepRow<T>; CHANNEL_COUNT],
}

impl<T: Copy + Default> Default for StepMatrix<T> {
    fn default() -> Self {
        Self {
            rows: [StepRow::default(); CHANNEL_COUNT],
        }
    }
}

impl<T: Copy + Default> StepMatrix<T> {
    /// Value at `[channel][step]`, or the element default when out of range.
    pub fn get(&self, channel: usize, step: usize) -> T {
        self.rows
            .get(channel)
            .and_then(|row| row.get(step))
            .unwrap_or_default()
    }

    pub fn set(&mut self, channel: usize, step: usize, value: T) {
        if let Some(row) = self.rows.get_mut(channel) {
            row.set(step, value);
        }
    }

    pub fn row(&self, channel: usize) -> &StepRow<T> {
        &self.rows[channel]
    }

    pub fn row_mut(&mut self, channel: usize) -> &mut StepRow<T> {
        &mut self.rows[channel]
    }

    pub fn clear_channel(&mut self, channel: usize) {
        if let Some(row) = self.rows.get_mut(channel) {
            row.clear();
        }
    }

    pub fn clear(&mut self) {
        for row in &mut self.rows {
            row.clear();
        }
    }
}

/// Active trigger cells.
pub type PatternStore = StepMatrix<bool>;

/// Semitone offsets; `None` holds the previously latched pitch.
pub type PitchStore = StepMatrix<Option<i8>>;

/// Per-step sample-and-hold values in [-1, 1].
pub type ShStore = StepMatrix<f32>;

impl PatternStore {
    pub fn active_count(&self, channel: usize, step_count: usize) -> usize {
        self.row(channel)
            .as_slice()
            .iter()
            .take(step_count)
            .filter(|active| **active)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_from_short_slice_pads_with_default() {
        let row = StepRow::from_slice(&[true, false, true]);
        assert_eq!(row.get(0), Some(true));
        assert_eq!(row.get(2), Some(true));
        assert_eq!(row.get(3), Some(false));
        assert_eq!(row.get(MAX_STEPS - 1), Some(false));
        assert_eq!(row.get(MAX_STEPS), None);
    }

    #[test]
    fn out_of_range_access_is_ignored() {
        let mut store = PatternStore::default();
        store.set(CHANNEL_COUNT, 0, true);
        store.set(0, MAX_STEPS, true);
        assert!(!store.get(CHANNEL_COUNT, 0));
        assert!(!store.get(0, MAX_STEPS));
        assert_eq!(store.active_count(0, MAX_STEPS), 0);
    }

    #[test]
    fn pitch_store_json_uses_null_for_hold() {
        let mut pitches = PitchStore::default();
        pitches.set(1, 0, Some(12));
        let value = serde_json::to_value(pitches).unwrap();
        assert_eq!(value[1][0], json!(12));
        assert_eq!(value[1][1], json!(null));
        assert_eq!(value.as_array().unwrap().len(), CHANNEL_COUNT);
        assert_eq!(value[0].as_array().unwrap().len(), MAX_STEPS);
    }

    #[test]
    fn rejects_rows_longer_than_step_domain() {
        let too_long = vec![false; MAX_STEPS + 1];
        let result: Result<StepRow<bool>, _> = serde_json::from_value(json!(too_long));
        assert!(result.is_err());
    }

    #[test]
    fn matrix_deserializes_short_rows() {
        let rows: Vec<Vec<bool>> = (0..CHANNEL_COUNT).map(|ch| vec![ch == 2]).collect();
        let store: PatternStore = serde_json::from_value(json!(rows)).unwrap();
        assert!(store.get(2, 0));
        assert!(!store.get(1, 0));
        assert_eq!(store.active_count(2, 16), 1);
    }

    #[test]
    fn clear_channel_only_touches_that_channel() {
        let mut store = PatternStore::default();
        store.set(0, 3, true);
        store.set(1, 3, true);
        store.clear_channel(0);
        assert!(!store.get(0, 3));
        assert!(store.get(1, 3));
        store.clear();
        assert!(!store.get(1, 3));
    }
}
