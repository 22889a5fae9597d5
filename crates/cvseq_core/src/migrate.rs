//! Phase-preserving resampling of step data between step counts.
//!
//! These are pure functions. They never run on the audio thread: the control side
//! migrates its copy of the state and ships the result as a new snapshot.
//!
//! Each old step `s` sits at phase `s / old_count`; it lands on the new step
//! closest to the same phase. Patterns resolve collisions by searching outward for
//! a free slot (lower offset first), pitches let the last write win, and
//! sample-and-hold values are linearly interpolated instead of point-mapped.

/// Map an old step index to the new step at the same phase, clamped into range.
pub fn remap_step(old_step: usize, old_count: usize, new_count: usize) -> usize {
    if old_count == 0 || new_count == 0 {
        return 0;
    }
    let phase = old_step as f64 / old_count as f64;
    let target = (phase * new_count as f64).round() as usize;
    target.min(new_count - 1)
}

/// Copy the leading `count` entries, padding with `T::default()` when `old` is short.
fn copy_leading<T: Copy + Default>(old: &[T], count: usize) -> Vec<T> {
    let mut out = vec![T::default(); count];
    for (slot, value) in out.iter_mut().zip(old) {
        *slot = *value;
    }
    out
}

/// Nearest unoccupied slot to `target`, alternating lower then higher offsets.
fn nearest_free_slot(slots: &[bool], target: usize) -> Option<usize> {
    if !slots[target] {
        return Some(target);
    }
    for offset in 1..slots.len() {
        if let Some(lower) = target.checked_sub(offset)
            && !slots[lower]
        {
            return Some(lower);
        }
        let higher = target + offset;
        if higher < slots.len() && !slots[higher] {
            return Some(higher);
        }
    }
    None
}

/// Resample a trigger pattern from `old_count` to `new_count` steps.
///
/// Collisions move to the nearest free step; when none remains the trigger is
/// dropped, so the number of active steps never grows.
pub fn migrate_pattern(old: &[bool], old_count: usize, new_count: usize) -> Vec<bool> {
    if old_count == new_count {
        return copy_leading(old, new_count);
    }
    let mut migrated = vec![false; new_count];
    if new_count == 0 {
        return migrated;
    }

    for (old_step, _) in old
        .iter()
        .take(old_count)
        .enumerate()
        .filter(|(_, active)| **active)
    {
        let target = remap_step(old_step, old_count, new_count);
        if let Some(slot) = nearest_free_slot(&migrated, target) {
            migrated[slot] = true;
        }
    }
    migrated
}

/// Resample a pitch row. Empty cells are skipped; colliding pitches overwrite.
pub fn migrate_pitches(old: &[Option<i8>], old_count: usize, new_count: usize) -> Vec<Option<i8>> {
    if old_count == new_count {
        return copy_leading(old, new_count);
    }
    let mut migrated = vec![None; new_count];
    if new_count == 0 {
        return migrated;
    }

    for (old_step, pitch) in old.iter().take(old_count).enumerate() {
        if let Some(semitones) = pitch {
            migrated[remap_step(old_step, old_count, new_count)] = Some(*semitones);
        }
    }
    migrated
}

/// Resample sample-and-hold values by linear interpolation at each new step's
/// fractional position on the old grid.
pub fn migrate_sample_hold(old: &[f32], old_count: usize, new_count: usize) -> Vec<f32> {
    let old_count = old_count.min(old.len());
    if old_count == 0 {
        return vec![0.0; new_count];
    }

    (0..new_count)
        .map(|new_step| {
            let position = new_step as f64 * old_count as f64 / new_count as f64;
            let lower = (position.floor() as usize).min(old_count - 1);
            let upper = (lower + 1).min(old_count - 1);
            let fraction = (position - lower as f64) as f32;
            let a = old[lower];
            let b = old[upper];
            a + (b - a) * fraction
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(active: &[usize], count: usize) -> Vec<bool> {
        let mut p = vec![false; count];
        for &s in active {
            p[s] = true;
        }
        p
    }

    fn active_steps(p: &[bool]) -> Vec<usize> {
        p.iter()
            .enumerate()
            .filter(|(_, a)| **a)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn remap_preserves_phase() {
        assert_eq!(remap_step(0, 8, 16), 0);
        assert_eq!(remap_step(4, 8, 16), 8);
        assert_eq!(remap_step(3, 4, 3), 2);
        // 7/8 * 4 = 3.5 rounds to 4, clamped to the last step
        assert_eq!(remap_step(7, 8, 4), 3);
    }

    #[test]
    fn single_downbeat_survives_expansion() {
        let old = pattern(&[0], 8);
        let migrated = migrate_pattern(&old, 8, 16);
        assert_eq!(migrated.len(), 16);
        assert_eq!(active_steps(&migrated), vec![0]);
    }

    #[test]
    fn equal_counts_are_identity() {
        let old = pattern(&[1, 5, 6], 8);
        assert_eq!(migrate_pattern(&old, 8, 8), old);
        let pitches = vec![Some(3), None, Some(-7), None];
        assert_eq!(migrate_pitches(&pitches, 4, 4), pitches);
    }

    #[test]
    fn collisions_search_lower_slot_first() {
        // 8 -> 4: steps 2 and 3 both map near step 1/2
        let old = pattern(&[2, 3], 8);
        let migrated = migrate_pattern(&old, 8, 4);
        // step 2 -> round(1.0) = 1, step 3 -> round(1.5) = 2
        assert_eq!(active_steps(&migrated), vec![1, 2]);

        // steps 1 and 2 of 8 both land on 1 of 4 after rounding (0.5 -> 1, 1.0 -> 1)
        let old = pattern(&[1, 2], 8);
        let migrated = migrate_pattern(&old, 8, 4);
        assert_eq!(active_steps(&migrated), vec![0, 1]);
    }

    #[test]
    fn exhausted_search_drops_triggers() {
        let old = pattern(&[0, 1, 2, 3, 4, 5, 6, 7], 8);
        let migrated = migrate_pattern(&old, 8, 3);
        assert_eq!(active_steps(&migrated), vec![0, 1, 2]);
    }

    #[test]
    fn migration_never_increases_active_count() {
        for old_count in 2..=24 {
            for new_count in 1..=24 {
                let old: Vec<bool> = (0..old_count).map(|s| s % 3 != 1).collect();
                let before = old.iter().filter(|a| **a).count();
                let migrated = migrate_pattern(&old, old_count, new_count);
                let after = migrated.iter().filter(|a| **a).count();
                assert!(after <= before, "{old_count}->{new_count}: {before} -> {after}");
                assert_eq!(migrated.len(), new_count);
            }
        }
    }

    #[test]
    fn pitches_last_write_wins() {
        let old = vec![Some(1), Some(2), Some(3), Some(4)];
        // 4 -> 2: 0->0, 1->round(0.5)=1, 2->1, 3->round(1.5)=2 clamped to 1
        let migrated = migrate_pitches(&old, 4, 2);
        assert_eq!(migrated, vec![Some(1), Some(4)]);
    }

    #[test]
    fn empty_pitch_cells_do_not_overwrite() {
        let old = vec![Some(5), None];
        let migrated = migrate_pitches(&old, 2, 1);
        assert_eq!(migrated, vec![Some(5)]);
    }

    #[test]
    fn sample_hold_interpolates_between_neighbours() {
        let old = vec![-1.0, 1.0];
        let migrated = migrate_sample_hold(&old, 2, 4);
        assert_eq!(migrated, vec![-1.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn sample_hold_round_trip_restores_grid_points() {
        let old = vec![0.25, -0.5, 0.75, -1.0, 0.1, 0.9];
        for factor in 1..=4 {
            let new_count = old.len() * factor;
            let expanded = migrate_sample_hold(&old, old.len(), new_count);
            let restored = migrate_sample_hold(&expanded, new_count, old.len());
            for (a, b) in old.iter().zip(&restored) {
                assert!((a - b).abs() < 1e-6, "factor {factor}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn sample_hold_from_empty_is_silent() {
        assert_eq!(migrate_sample_hold(&[], 0, 3), vec![0.0; 3]);
    }
}
