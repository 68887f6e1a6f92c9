//! Track table + interpolator ("GetFullMistData").
//!
//! Grounded on `original_source/.../StellarGenerator.h`/`.cpp`: the
//! `FMistData`/`FWdMistData` row layouts, the `_kMassFilesCache` /
//! `_kPhaseChangesCache` split (kept as two separate `RwLock`s per
//! DESIGN.md's supplemented-feature note), and the
//! `GetFullMistData`/`InterpolateMistData`/`FindPhaseChanges` naming.
//! The phase-change cache keys on filename rather than data-pointer
//! identity, since Rust has no stable-pointer equivalent to
//! `const FMistData*` here.

mod interpolate;

use std::collections::HashMap;
use std::sync::RwLock;

use csv::ReaderBuilder;
use log::{trace, warn};
use serde::Deserialize;

use crate::error::{GenError, GenResult};

pub use interpolate::{get_full_mist_data, MistQuery, NEAR_DEATH_AGE};

/// Row-index constants for a main-sequence track row, matching
/// `_kStarAgeIndex`..`_kXIndex` in the source.
pub const STAR_AGE: usize = 0;
pub const STAR_MASS: usize = 1;
pub const STAR_MDOT: usize = 2;
pub const LOG_TEFF: usize = 3;
pub const LOG_R: usize = 4;
pub const LOG_SURF_Z: usize = 5;
pub const SURFACE_H1: usize = 6;
pub const SURFACE_HE3: usize = 7;
pub const LOG_CENTER_T: usize = 8;
pub const LOG_CENTER_RHO: usize = 9;
pub const PHASE: usize = 10;
pub const EVOLUTION_PROGRESS: usize = 11;
/// Appended by the interpolator, not present in the raw CSV row.
pub const LIFETIME: usize = 12;

/// Row-index constants for a white-dwarf cooling-track row.
pub const WD_STAR_AGE: usize = 0;
pub const WD_LOG_R: usize = 1;
pub const WD_LOG_TEFF: usize = 2;
pub const WD_LOG_CENTER_T: usize = 3;
pub const WD_LOG_CENTER_RHO: usize = 4;

pub const PRESET_FEH: [f64; 8] = [-4.0, -3.0, -2.0, -1.5, -1.0, -0.5, 0.0, 0.5];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WdThickness {
    Thin,
    Thick,
}

#[derive(Debug, Deserialize)]
struct MistRecord {
    star_age: f64,
    star_mass: f64,
    star_mdot: f64,
    log_teff: f64,
    log_r: f64,
    log_surf_z: f64,
    surface_h1: f64,
    surface_he3: f64,
    log_center_t: f64,
    log_center_rho: f64,
    phase: f64,
    x: f64,
}

impl MistRecord {
    fn into_row(self) -> Vec<f64> {
        vec![
            self.star_age,
            self.star_mass,
            self.star_mdot,
            self.log_teff,
            self.log_r,
            self.log_surf_z,
            self.surface_h1,
            self.surface_he3,
            self.log_center_t,
            self.log_center_rho,
            self.phase,
            self.x,
        ]
    }
}

#[derive(Debug, Deserialize)]
struct WdMistRecord {
    star_age: f64,
    log_r: f64,
    log_teff: f64,
    log_center_t: f64,
    log_center_rho: f64,
}

impl WdMistRecord {
    fn into_row(self) -> Vec<f64> {
        vec![
            self.star_age,
            self.log_r,
            self.log_teff,
            self.log_center_t,
            self.log_center_rho,
        ]
    }
}

/// Process-wide, reader-writer-synchronized track asset cache.
/// Generators hold a `&TrackTableCache` rather than a bare static, an
/// injected-asset-service design documented as an Open Question
/// resolution in DESIGN.md.
pub struct TrackTableCache {
    root: std::path::PathBuf,
    mass_files: RwLock<HashMap<String, Vec<f64>>>,
    mist_rows: RwLock<HashMap<String, std::sync::Arc<Vec<Vec<f64>>>>>,
    phase_changes: RwLock<HashMap<String, std::sync::Arc<Vec<Vec<f64>>>>>,
}

impl TrackTableCache {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            root: root.into(),
            mass_files: RwLock::new(HashMap::new()),
            mist_rows: RwLock::new(HashMap::new()),
            phase_changes: RwLock::new(HashMap::new()),
        }
    }

    fn feh_dir(&self, feh: f64) -> std::path::PathBuf {
        let sign = if feh >= 0.0 { "+" } else { "" };
        self.root.join(format!("[Fe_H]={sign}{feh:.1}"))
    }

    fn wd_dir(&self, thickness: WdThickness) -> std::path::PathBuf {
        match thickness {
            WdThickness::Thin => self.root.join("WhiteDwarfs/Thin"),
            WdThickness::Thick => self.root.join("WhiteDwarfs/Thick"),
        }
    }

    /// Snaps `feh` to the nearest preset bin.
    pub fn snap_feh(feh: f64) -> f64 {
        PRESET_FEH
            .iter()
            .copied()
            .min_by(|a, b| (a - feh).abs().partial_cmp(&(b - feh).abs()).unwrap())
            .unwrap_or(0.0)
    }

    fn mass_filename(mass_sol: f64) -> String {
        format!("{mass_sol:06.2}0Ms_track.csv")
    }

    /// Sorted list of initial masses present in a directory, loading
    /// and caching it on first request.
    fn mass_list(&self, dir: &std::path::Path) -> GenResult<Vec<f64>> {
        let key = dir.to_string_lossy().to_string();
        if let Some(list) = self.mass_files.read().unwrap().get(&key) {
            return Ok(list.clone());
        }

        let mut masses = Vec::new();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| GenError::AssetMissing(format!("{}: {e}", dir.display())))?;
        for entry in entries {
            let entry = entry.map_err(|e| GenError::AssetMissing(e.to_string()))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(prefix) = name.strip_suffix("Ms_track.csv") {
                if let Ok(mass) = prefix.parse::<f64>() {
                    masses.push(mass);
                }
            }
        }
        masses.sort_by(|a, b| a.partial_cmp(b).unwrap());

        self.mass_files.write().unwrap().insert(key, masses.clone());
        Ok(masses)
    }

    fn load_mist(&self, path: &std::path::Path) -> GenResult<std::sync::Arc<Vec<Vec<f64>>>> {
        let key = path.to_string_lossy().to_string();
        if let Some(rows) = self.mist_rows.read().unwrap().get(&key) {
            return Ok(rows.clone());
        }
        trace!("loading MIST track {}", path.display());
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| GenError::AssetMissing(format!("{}: {e}", path.display())))?;
        let mut rows = Vec::new();
        for record in reader.deserialize::<MistRecord>() {
            let record = record.map_err(|e| GenError::AssetMissing(format!("{}: {e}", path.display())))?;
            rows.push(record.into_row());
        }
        let rows = std::sync::Arc::new(rows);
        self.mist_rows.write().unwrap().insert(key, rows.clone());
        Ok(rows)
    }

    fn load_wd_mist(&self, path: &std::path::Path) -> GenResult<std::sync::Arc<Vec<Vec<f64>>>> {
        let key = path.to_string_lossy().to_string();
        if let Some(rows) = self.mist_rows.read().unwrap().get(&key) {
            return Ok(rows.clone());
        }
        trace!("loading WD track {}", path.display());
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| GenError::AssetMissing(format!("{}: {e}", path.display())))?;
        let mut rows = Vec::new();
        for record in reader.deserialize::<WdMistRecord>() {
            let record = record.map_err(|e| GenError::AssetMissing(format!("{}: {e}", path.display())))?;
            rows.push(record.into_row());
        }
        let rows = std::sync::Arc::new(rows);
        self.mist_rows.write().unwrap().insert(key, rows.clone());
        Ok(rows)
    }

    /// Phase-change sub-table: rows whose phase index changes, or
    /// whose evolution progress jumps to the sentinel `10.0`, computed
    /// lazily and cached by filename.
    fn phase_changes(&self, path: &std::path::Path) -> GenResult<std::sync::Arc<Vec<Vec<f64>>>> {
        let key = path.to_string_lossy().to_string();
        if let Some(changes) = self.phase_changes.read().unwrap().get(&key) {
            return Ok(changes.clone());
        }
        let rows = self.load_mist(path)?;
        let mut result = Vec::new();
        let mut current_phase = -2.0_f64;
        for row in rows.iter() {
            if (row[PHASE] - current_phase).abs() > f64::EPSILON || row[EVOLUTION_PROGRESS] == 10.0 {
                current_phase = row[PHASE];
                result.push(row.clone());
            }
        }
        let result = std::sync::Arc::new(result);
        self.phase_changes
            .write()
            .unwrap()
            .insert(key, result.clone());
        Ok(result)
    }
}

fn bracket_mass(masses: &[f64], target: f64, clamp_to_grid: bool) -> GenResult<(f64, f64, f64)> {
    if masses.is_empty() {
        return Err(GenError::AssetMissing("empty mass grid".into()));
    }
    let idx = masses.partition_point(|&m| m < target);
    if idx == masses.len() {
        if clamp_to_grid {
            let last = masses[masses.len() - 1];
            return Ok((last, last, 0.0));
        }
        let lo = masses[0];
        let hi = masses[masses.len() - 1];
        warn!("requested mass {target} outside track grid [{lo}, {hi}]");
        return Err(GenError::OutOfRange { mass: target, lo, hi });
    }
    let hi = masses[idx];
    if (hi - target).abs() < 1e-9 {
        return Ok((hi, hi, 0.0));
    }
    let lo = if idx == 0 { hi } else { masses[idx - 1] };
    if (lo - hi).abs() < 1e-12 {
        return Ok((lo, hi, 0.0));
    }
    let alpha = (target - lo) / (hi - lo);
    Ok((lo, hi, alpha))
}
