//! Text outputs of an alignment run.
//!
//! - positions: `{full_name}\t{position}` per tile, `unresolved` when the
//!   tile could not be placed
//! - pairwise log: `{reference}\t{template}\t{offset}` per measured pair
//! - pair diagnostics: reference, template and aligned template side by side

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::align::aligned_series;
use crate::config::AlignConfig;
use crate::error::Error;
use crate::tile::{PairwiseOffset, Tile};

pub const POSITIONS_FILE: &str = "_zPositions.txt";
pub const PAIR_LOG_FILE: &str = "z_registration.txt";

const UNRESOLVED: &str = "unresolved";

fn write_text(path: &Path, text: String) -> Result<(), Error> {
    std::fs::write(path, text).map_err(|source| Error::ResultIo {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_positions(path: &Path, tiles: &[Tile]) -> Result<(), Error> {
    let mut text = String::new();
    for tile in tiles {
        let _ = match tile.position {
            Some(z) => writeln!(text, "{}\t{}", tile.full_name(), z),
            None => writeln!(text, "{}\t{}", tile.full_name(), UNRESOLVED),
        };
    }
    write_text(path, text)
}

pub fn read_positions(path: &Path) -> Result<Vec<(String, Option<f64>)>, Error> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::ResultIo {
        path: path.to_path_buf(),
        source,
    })?;

    let mut positions = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let format_error = |reason: String| Error::ResultFormat {
            path: path.to_path_buf(),
            line: i + 1,
            reason,
        };
        let (name, value) = line
            .split_once('\t')
            .ok_or_else(|| format_error("missing tab".to_string()))?;
        let value = value.trim();
        let position = if value == UNRESOLVED {
            None
        } else {
            Some(
                value
                    .parse::<f64>()
                    .map_err(|e| format_error(format!("bad position '{}': {}", value, e)))?,
            )
        };
        positions.push((name.to_string(), position));
    }
    Ok(positions)
}

pub fn write_pair_log(path: &Path, tiles: &[Tile], offsets: &[PairwiseOffset]) -> Result<(), Error> {
    let mut text = String::new();
    for o in offsets {
        let _ = writeln!(
            text,
            "{}\t{}\t{}",
            tiles[o.source].full_name(),
            tiles[o.target].full_name(),
            o.offset
        );
    }
    write_text(path, text)
}

/// `values_z_registration_{template}-onto-{reference}.txt` in `dir`.
pub fn pair_diagnostics_path(dir: &Path, reference: &Tile, template: &Tile) -> PathBuf {
    dir.join(format!(
        "values_z_registration_{}-onto-{}.txt",
        template.full_name(),
        reference.full_name()
    ))
}

/// Reference curve, template curve and template resampled by `offset`, one
/// row per reference slice. Tiles without curves write nothing.
pub fn write_pair_diagnostics(
    dir: &Path,
    reference: &Tile,
    template: &Tile,
    offset: f32,
    config: &AlignConfig,
) -> Result<(), Error> {
    let (Some(ref_curve), Some(tmpl_curve)) = (&reference.curve, &template.curve) else {
        return Ok(());
    };
    let aligned = aligned_series(tmpl_curve, offset, ref_curve.len(), config);

    let mut text = String::from("slice\treference\ttemplate\taligned\n");
    for (i, (&r, &a)) in ref_curve.iter().zip(&aligned).enumerate() {
        let t = tmpl_curve.get(i).copied().unwrap_or(f32::NAN);
        let _ = writeln!(text, "{}\t{}\t{}\t{}", i, r, t, a);
    }
    write_text(&pair_diagnostics_path(dir, reference, template), text)
}
