//! "GetFullMistData", grounded on
//! `GetFullMistData`/`InterpolateMistData`/`FindPhaseChanges`/
//! `InterpolateStarData`/`ExpandMistData` in
//! `original_source/.../StellarGenerator.cpp`.

use log::warn;

use crate::error::{GenError, GenResult, StarOutcome};

use super::{
    bracket_mass, TrackTableCache, WdThickness, EVOLUTION_PROGRESS, LIFETIME, LOG_R, LOG_TEFF,
    PHASE, STAR_AGE, STAR_MASS, STAR_MDOT, WD_LOG_CENTER_RHO, WD_LOG_CENTER_T, WD_LOG_R,
    WD_LOG_TEFF, WD_STAR_AGE,
};

/// Sentinel meaning "near-death", used by the Giant generation
/// option.
pub const NEAR_DEATH_AGE: f64 = -1.0;

pub struct MistQuery {
    pub target_age_s: f64,
    pub target_feh: f64,
    pub target_mass_sol: f64,
}

/// Entry point: brackets the mass grid, blends both files' state
/// vectors at `alpha`, and appends lifetime (and, for normal stars,
/// the snapped metallicity).
pub fn get_full_mist_data(
    cache: &TrackTableCache,
    query: &MistQuery,
    is_white_dwarf: bool,
    is_single_white_dwarf: bool,
) -> GenResult<StarOutcome<Vec<f64>>> {
    if !is_white_dwarf {
        let feh = TrackTableCache::snap_feh(query.target_feh);
        let dir = cache.feh_dir(feh);
        let masses = cache.mass_list(&dir)?;
        let (lo, hi, alpha) = bracket_mass(&masses, query.target_mass_sol, false)?;

        let lower_path = dir.join(TrackTableCache::mass_filename(lo));
        let outcome = if (lo - hi).abs() < 1e-12 {
            interpolate_single_normal_file(cache, &lower_path, query.target_age_s, query.target_mass_sol)?
        } else {
            let upper_path = dir.join(TrackTableCache::mass_filename(hi));
            interpolate_two_normal_files(cache, &lower_path, &upper_path, query.target_age_s, alpha)?
        };

        return Ok(match outcome {
            StarOutcome::Alive(mut row) => {
                row.push(feh);
                StarOutcome::Alive(row)
            }
            died => died,
        });
    }

    let thickness = if is_single_white_dwarf {
        WdThickness::Thin
    } else {
        WdThickness::Thick
    };
    let dir = cache.wd_dir(thickness);
    let masses = cache.mass_list(&dir)?;
    let (lo, hi, alpha) = bracket_mass(&masses, query.target_mass_sol, true)?;

    let lower_path = dir.join(TrackTableCache::mass_filename(lo));
    let row = if (lo - hi).abs() < 1e-12 {
        interpolate_white_dwarf_file(cache, &lower_path, query.target_age_s)?
    } else {
        let upper_path = dir.join(TrackTableCache::mass_filename(hi));
        let lower_rows = interpolate_white_dwarf_file(cache, &lower_path, query.target_age_s)?;
        let upper_rows = interpolate_white_dwarf_file(cache, &upper_path, query.target_age_s)?;
        interpolate_array(&lower_rows, &upper_rows, alpha)
    };

    Ok(StarOutcome::Alive(apply_white_dwarf_overrides(
        row,
        query.target_mass_sol,
        query.target_age_s,
    )))
}

fn interpolate_array(lower: &[f64], upper: &[f64], alpha: f64) -> Vec<f64> {
    lower
        .iter()
        .zip(upper.iter())
        .map(|(l, u)| l + (u - l) * alpha)
        .collect()
}

fn interpolate_two_normal_files(
    cache: &TrackTableCache,
    lower_path: &std::path::Path,
    upper_path: &std::path::Path,
    target_age_s: f64,
    alpha: f64,
) -> GenResult<StarOutcome<Vec<f64>>> {
    let lower_phases = cache.phase_changes(lower_path)?;
    let upper_phases = cache.phase_changes(upper_path)?;

    let lower_lifetime = lower_phases.last().map(|r| r[STAR_AGE]).unwrap_or(0.0);
    let upper_lifetime = upper_phases.last().map(|r| r[STAR_AGE]).unwrap_or(0.0);
    let blended_lifetime = lower_lifetime + (upper_lifetime - lower_lifetime) * alpha;

    let target_age_s = if target_age_s == NEAR_DEATH_AGE {
        blended_lifetime - 500_000.0
    } else {
        target_age_s
    };

    let progress = match evolution_progress_two_files(&lower_phases, &upper_phases, target_age_s, alpha) {
        Some(p) => p,
        None => {
            return Ok(StarOutcome::Died {
                lifetime_s: blended_lifetime,
            })
        }
    };

    let lower_rows = cache.load_mist(lower_path)?;
    let upper_rows = cache.load_mist(upper_path)?;
    let mut lower_row = interpolate_by_progress(&lower_rows, progress);
    let mut upper_row = interpolate_by_progress(&upper_rows, progress);
    lower_row.push(lower_lifetime);
    upper_row.push(upper_lifetime);

    let mut result = interpolate_array(&lower_row, &upper_row, alpha);
    result[PHASE] = lower_row[PHASE];
    Ok(StarOutcome::Alive(result))
}

fn interpolate_single_normal_file(
    cache: &TrackTableCache,
    path: &std::path::Path,
    target_age_s: f64,
    target_mass_sol: f64,
) -> GenResult<StarOutcome<Vec<f64>>> {
    let phases = cache.phase_changes(path)?;
    let lifetime = phases.last().map(|r| r[STAR_AGE]).unwrap_or(0.0);
    let target_age_s = if target_age_s == NEAR_DEATH_AGE {
        lifetime - 500_000.0
    } else {
        target_age_s
    };

    if target_mass_sol >= 0.1 {
        let progress = match evolution_progress_single_file(&phases, target_age_s) {
            Some(p) => p,
            None => return Ok(StarOutcome::Died { lifetime_s: lifetime }),
        };
        let rows = cache.load_mist(path)?;
        let mut row = interpolate_by_progress(&rows, progress);
        row.push(lifetime);
        return Ok(StarOutcome::Alive(row));
    }

    // Extrapolate sub-0.1 M☉ stars.
    if phases.len() < 3 {
        return Err(GenError::AssetMissing(format!(
            "{}: too few phase-change rows to extrapolate",
            path.display()
        )));
    }
    let shift = (target_mass_sol / 0.1_f64).powf(-1.3);
    let lower_point = phases[1][STAR_AGE] * shift;
    let upper_point = phases[2][STAR_AGE] * shift;
    let extrapolated_lifetime = upper_point;

    let progress = if target_age_s < lower_point {
        target_age_s / lower_point - 1.0
    } else if target_age_s <= upper_point {
        (target_age_s - lower_point) / (upper_point - lower_point)
    } else {
        return Ok(StarOutcome::Died {
            lifetime_s: extrapolated_lifetime,
        });
    };

    let rows = cache.load_mist(path)?;
    let mut row = interpolate_by_progress(&rows, progress);
    row.push(extrapolated_lifetime);
    expand_mist_data(target_mass_sol, &mut row);
    Ok(StarOutcome::Alive(row))
}

/// Rescales a single-file extrapolated row for a sub-0.1 M☉ target.
/// Grounded on the source's distinct `ExpandMistData` method, kept
/// separate per DESIGN.md's supplemented-feature note.
fn expand_mist_data(target_mass_sol: f64, row: &mut [f64]) {
    let radius_sol = 10f64.powf(row[LOG_R]);
    let teff = 10f64.powf(row[LOG_TEFF]);
    let luminosity_sol = radius_sol.powi(2) * (teff / crate::constants::SOLAR_TEFF_K).powi(4);
    let log_l = luminosity_sol.log10();

    let scale = (target_mass_sol / 0.1).powf(2.3);
    row[STAR_MASS] = target_mass_sol * (row[STAR_MASS] / 0.1);
    row[STAR_MDOT] = target_mass_sol * (row[STAR_MDOT] / 0.1);

    let radius_sol = 10f64.powf(row[LOG_R]) * scale;
    let luminosity_sol = 10f64.powf(log_l) * scale;
    let teff = crate::constants::SOLAR_TEFF_K * (luminosity_sol / radius_sol.powi(2)).powf(0.25);

    row[LOG_TEFF] = teff.log10();
    row[LOG_R] = radius_sol.log10();
}

/// Finds the interval `[lo, lo+1]` of a phase-change timeline
/// containing `target_age`, returning `None` (signal death) if the
/// age exceeds the last row.
fn find_surrounding_phase_points(rows: &[Vec<f64>], target_age: f64) -> Option<(usize, f64, f64)> {
    if rows.len() < 2 {
        return None;
    }
    for i in 0..rows.len() - 1 {
        let lo = rows[i][STAR_AGE];
        let hi = rows[i + 1][STAR_AGE];
        if target_age <= hi || i + 2 == rows.len() {
            if target_age > rows.last().unwrap()[STAR_AGE] {
                return None;
            }
            return Some((i, lo, hi));
        }
    }
    None
}

fn evolution_progress_single_file(phases: &[Vec<f64>], target_age: f64) -> Option<f64> {
    let (idx, lo, hi) = find_surrounding_phase_points(phases, target_age)?;
    let phase = phases[idx][PHASE];
    let span = (hi - lo).max(1e-12);
    Some(phase + (target_age - lo) / span)
}

fn phase_is(row: &[f64], value: f64) -> bool {
    (row[PHASE] - value).abs() < 1e-9
}

/// When the two files' last phase tags agree but their row counts (or
/// second-to-last phase tags) don't, the lower file's final two rows'
/// `STAR_AGE` get shifted back by the gap between its own
/// second-to-last age and the age of the first row where the two
/// files' phase tags diverge. Grounded on the `DeltaTimePoint` step in
/// `CalculateEvolutionProgress` (`original_source/.../StellarGenerator.cpp`),
/// which runs immediately before `AlignArrays`.
fn restamp_last_common_phase(lower: &mut [Vec<f64>], upper: &mut [Vec<f64>]) {
    let min_len = lower.len().min(upper.len());
    let mut first_discard_age = 0.0;
    for i in 0..min_len.saturating_sub(1) {
        if !phase_is(&lower[i], upper[i][PHASE]) {
            first_discard_age = lower[i][STAR_AGE];
            break;
        }
    }
    let n = lower.len();
    let first_common_age = lower[n - 2][STAR_AGE];
    let delta = first_common_age - first_discard_age;
    lower[n - 2][STAR_AGE] -= delta;
    lower[n - 1][STAR_AGE] -= delta;
}

/// Reconciles two phase-change arrays of possibly differing length so
/// a row-by-row blend is meaningful, the way `AlignArrays`
/// (`original_source/.../StellarGenerator.cpp`) does: neither array
/// ending on phase 9 truncates both to the shorter length; one ending
/// on phase 9 drops its excess (an exact one-row overhang pops that
/// row outright, anything larger truncates first) and restamps its
/// new last row's phase/evolution-progress to match the other array's
/// actual last row; both ending on phase 9 keep each array's own last
/// two rows untouched and only trim excess from the middle.
fn align_phase_arrays(lower: &mut Vec<Vec<f64>>, upper: &mut Vec<Vec<f64>>) {
    let lower_ends_9 = phase_is(lower.last().unwrap(), 9.0);
    let upper_ends_9 = phase_is(upper.last().unwrap(), 9.0);

    match (lower_ends_9, upper_ends_9) {
        (false, false) => {
            let min_len = lower.len().min(upper.len());
            lower.truncate(min_len);
            upper.truncate(min_len);
        }
        (false, true) => restamp_trailing_overhang(upper, lower),
        (true, false) => restamp_trailing_overhang(lower, upper),
        (true, true) => {
            let min_len = lower.len().min(upper.len());
            if min_len < 2 {
                return;
            }
            let lower_tail = lower[lower.len() - 2..].to_vec();
            let upper_tail = upper[upper.len() - 2..].to_vec();
            lower.truncate(min_len - 2);
            upper.truncate(min_len - 2);
            lower.extend(lower_tail);
            upper.extend(upper_tail);
        }
    }
}

/// Drops `ending_in_9`'s excess rows so it ends up the same length as
/// `other`, then restamps its new last row's phase/evolution-progress
/// to `other`'s last row so the two line up exactly. `other` is
/// trimmed to match when the size gap isn't exactly one row.
fn restamp_trailing_overhang(ending_in_9: &mut Vec<Vec<f64>>, other: &mut Vec<Vec<f64>>) {
    if ending_in_9.len() == other.len() + 1 {
        ending_in_9.pop();
    } else {
        let min_len = ending_in_9.len().min(other.len());
        if min_len == 0 {
            return;
        }
        ending_in_9.truncate(min_len - 1);
        other.truncate(min_len - 1);
    }
    let other_last = other.last().unwrap().clone();
    let new_last = ending_in_9.last_mut().unwrap();
    new_last[PHASE] = other_last[PHASE];
    new_last[EVOLUTION_PROGRESS] = other_last[EVOLUTION_PROGRESS];
}

/// Mass-blends the two (now equal-length) arrays' `STAR_AGE` columns
/// to find the bracketing interval for `target_age`, then returns the
/// evolution-progress coordinate within it. Grounded on
/// `FindSurroundingTimePoints`'s two-array overload feeding the main
/// body of `CalculateEvolutionProgress`.
fn blended_progress_from_aligned(lower: &[Vec<f64>], upper: &[Vec<f64>], target_age: f64, alpha: f64) -> Option<f64> {
    let n = lower.len().min(upper.len());
    if n < 2 {
        return None;
    }
    let blended_ages: Vec<f64> = (0..n)
        .map(|i| lower[i][STAR_AGE] + (upper[i][STAR_AGE] - lower[i][STAR_AGE]) * alpha)
        .collect();

    if target_age > *blended_ages.last().unwrap() {
        return None;
    }

    let mut index = n - 1;
    for (i, &age) in blended_ages.iter().enumerate() {
        if age >= target_age {
            index = if i == 0 { 0 } else { i - 1 };
            break;
        }
    }
    let phase = lower[index][PHASE];

    if index + 1 >= n {
        return Some(0.0);
    }
    let blended_at_index = lower[index][STAR_AGE] + (upper[index][STAR_AGE] - lower[index][STAR_AGE]) * alpha;
    let blended_at_next =
        lower[index + 1][STAR_AGE] + (upper[index + 1][STAR_AGE] - lower[index + 1][STAR_AGE]) * alpha;
    let span = (blended_at_next - blended_at_index).max(1e-12);
    let result = (target_age - blended_at_index) / span + phase;

    if result > lower[n - 1][PHASE] + 1.0 {
        return Some(0.0);
    }
    Some(result)
}

/// Blends two phase-change timelines at `alpha` to find the
/// evolution-progress coordinate for `target_age`. When the arrays
/// already agree on length and on their second-to-last phase tag, the
/// blend runs directly; otherwise the lower file's last-common-phase
/// rows are restamped and the arrays aligned (see
/// [`align_phase_arrays`]) before blending, then the result is clamped
/// to exactly phase 9 under the same near-miss condition
/// `CalculateEvolutionProgress` uses (its `std::modf` check).
/// Grounded on `CalculateEvolutionProgress`/`AlignArrays` in
/// `original_source/.../StellarGenerator.cpp`.
fn evolution_progress_two_files(
    lower_phases: &[Vec<f64>],
    upper_phases: &[Vec<f64>],
    target_age: f64,
    alpha: f64,
) -> Option<f64> {
    if lower_phases.len() < 2 || upper_phases.len() < 2 {
        return None;
    }

    let tails_match = lower_phases.len() == upper_phases.len()
        && phase_is(&lower_phases[lower_phases.len() - 2], upper_phases[upper_phases.len() - 2][PHASE]);

    if tails_match {
        return blended_progress_from_aligned(lower_phases, upper_phases, target_age, alpha);
    }

    let mut lower = lower_phases.to_vec();
    let mut upper = upper_phases.to_vec();

    if phase_is(lower.last().unwrap(), upper.last().unwrap()[PHASE]) {
        restamp_last_common_phase(&mut lower, &mut upper);
    }
    align_phase_arrays(&mut lower, &mut upper);
    if lower.len() < 2 || upper.len() < 2 {
        return None;
    }

    let progress = blended_progress_from_aligned(&lower, &upper, target_age, alpha)?;

    let integer_part = progress.trunc();
    let fractional_part = progress - integer_part;
    let third_from_last_phase = lower.len().checked_sub(3).map(|i| lower[i][PHASE]);
    if phase_is(upper.last().unwrap(), 9.0)
        && fractional_part > 0.99
        && progress < 9.0
        && third_from_last_phase.is_some_and(|p| integer_part >= p)
    {
        warn!("blended evolution progress landed just shy of the final phase boundary; clamping to it");
        return Some(9.0);
    }
    Some(progress)
}

/// Binary-searches a file's `EvolutionProgress` column and linearly
/// interpolates between the two surrounding rows.
fn interpolate_by_progress(rows: &[Vec<f64>], evolution_progress: f64) -> Vec<f64> {
    if rows.is_empty() {
        return Vec::new();
    }
    let idx = rows.partition_point(|r| r[EVOLUTION_PROGRESS] < evolution_progress);
    if idx == 0 {
        return rows[0].clone();
    }
    if idx >= rows.len() {
        return rows[rows.len() - 1].clone();
    }
    let lower = &rows[idx - 1];
    let upper = &rows[idx];
    let span = (upper[EVOLUTION_PROGRESS] - lower[EVOLUTION_PROGRESS]).max(1e-12);
    let alpha = (evolution_progress - lower[EVOLUTION_PROGRESS]) / span;
    let mut row: Vec<f64> = lower
        .iter()
        .zip(upper.iter())
        .map(|(l, u)| l + (u - l) * alpha)
        .collect();
    row[PHASE] = lower[PHASE];
    row
}

fn interpolate_white_dwarf_file(
    cache: &TrackTableCache,
    path: &std::path::Path,
    target_age_s: f64,
) -> GenResult<Vec<f64>> {
    let rows = cache.load_wd_mist(path)?;
    if rows.is_empty() {
        return Err(GenError::AssetMissing(format!("{}: empty track", path.display())));
    }
    if target_age_s >= rows.last().unwrap()[WD_STAR_AGE] {
        return Ok(rows.last().unwrap().clone());
    }
    let idx = rows.partition_point(|r| r[WD_STAR_AGE] < target_age_s);
    if idx == 0 {
        return Ok(rows[0].clone());
    }
    let lower = &rows[idx - 1];
    let upper = &rows[idx];
    let span = (upper[WD_STAR_AGE] - lower[WD_STAR_AGE]).max(1e-12);
    let alpha = (target_age_s - lower[WD_STAR_AGE]) / span;
    Ok(interpolate_array(lower, upper, alpha))
}

/// Overrides for masses outside `[0.2, 1.3]` M☉ and ages past the
/// final row.
fn apply_white_dwarf_overrides(mut row: Vec<f64>, mass_sol: f64, target_age_s: f64) -> Vec<f64> {
    if !(0.2..=1.3).contains(&mass_sol) {
        row[WD_LOG_R] = (0.0323 - 0.021_384 * mass_sol).log10();
        row[WD_LOG_CENTER_T] = f64::NAN;
        row[WD_LOG_CENTER_RHO] = f64::NAN;
    }

    let end_age = row[WD_STAR_AGE];
    if end_age > 0.0 && target_age_s > end_age {
        let teff = 10f64.powf(row[WD_LOG_TEFF]);
        let decayed = teff * (20.0 * end_age / (target_age_s + 19.0 * end_age)).powf(1.75);
        row[WD_LOG_TEFF] = decayed.log10();
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolate_by_progress_clamps_at_ends() {
        let rows = vec![
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
        ];
        let below = interpolate_by_progress(&rows, -5.0);
        assert_eq!(below[STAR_AGE], 0.0);
        let above = interpolate_by_progress(&rows, 50.0);
        assert_eq!(above[STAR_AGE], 1.0);
    }

    #[test]
    fn white_dwarf_overrides_nan_outside_mass_band() {
        let row = vec![1e9, -1.0, 4.0, 7.0, 5.0];
        let overridden = apply_white_dwarf_overrides(row, 1.5, 1e9);
        assert!(overridden[WD_LOG_CENTER_T].is_nan());
    }
}
