//! Global relaxation of pairwise offsets into one Z position per tile.
//!
//! Each surviving offset `o` from `source` to `target` is a soft constraint
//! `position(target) - position(source) ≈ o`. One reference tile is pinned at
//! zero. Positions are refined by Gauss-Seidel sweeps: each free tile moves to
//! the weighted mean of the positions its constraints predict for it.
//!
//! Sweeps are grouped into rounds. Between rounds the constraint weights are
//! recomputed from the residuals with a Huber function, so a few bad offsets
//! that slipped through outlier filtering lose influence (iteratively
//! reweighted least squares). Tiles with no constraint path to the reference
//! are left unresolved.


use std::collections::VecDeque;

use crate::config::{ReferenceTile, SolverConfig};
use crate::error::Error;
use crate::tile::Tile;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pub source: usize,
    pub target: usize,
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    /// Position per tile, `None` when unreachable from the reference.
    pub positions: Vec<Option<f64>>,
    pub reference: usize,
    pub rounds: usize,
    /// Total sweeps over all rounds.
    pub iterations: usize,
    /// Largest `|position(target) - position(source) - offset|` over the
    /// constraints between resolved tiles.
    pub max_residual: f64,
    pub mean_residual: f64,
    /// `max_residual` is within the configured `max_allowed_error`.
    pub converged: bool,
}

impl SolveResult {
    pub fn unresolved_count(&self) -> usize {
        self.positions.iter().filter(|p| p.is_none()).count()
    }
}

/// Every offset left in the tiles' same- and cross-channel lists.
pub fn collect_constraints(tiles: &[Tile]) -> Vec<Constraint> {
    tiles
        .iter()
        .flat_map(|t| t.offsets())
        .map(|o| Constraint {
            source: o.source,
            target: o.target,
            offset: o.offset as f64,
        })
        .collect()
}

/// Index of the tile to pin at zero.
pub fn resolve_reference(tiles: &[Tile], reference: ReferenceTile) -> Result<usize, Error> {
    if tiles.is_empty() {
        return Err(Error::EmptyTileSet);
    }
    match reference {
        ReferenceTile::Index(index) if index < tiles.len() => Ok(index),
        ReferenceTile::Index(index) => Err(Error::ReferenceOutOfRange {
            index,
            count: tiles.len(),
        }),
        ReferenceTile::Center => {
            let mut indices: Vec<usize> = tiles.iter().map(|t| t.id.tile_index).collect();
            indices.sort_unstable();
            indices.dedup();
            let middle = indices[indices.len() / 2];
            Ok(tiles
                .iter()
                .position(|t| t.id.tile_index == middle)
                .unwrap_or(0))
        }
    }
}

/// Solve positions from the offsets stored in `tiles` and write them back
/// into each tile.
pub fn relax_tiles(tiles: &mut [Tile], config: &SolverConfig) -> Result<SolveResult, Error> {
    let reference = resolve_reference(tiles, config.reference)?;
    let constraints = collect_constraints(tiles);
    let result = solve_positions(tiles.len(), &constraints, reference, config);

    for (tile, position) in tiles.iter_mut().zip(&result.positions) {
        tile.position = *position;
    }

    tracing::info!(
        reference = %tiles[reference].id,
        constraints = constraints.len(),
        rounds = result.rounds,
        iterations = result.iterations,
        max_residual = result.max_residual,
        mean_residual = result.mean_residual,
        unresolved = result.unresolved_count(),
        "Global relaxation finished"
    );
    Ok(result)
}

/// Relax `count` unknowns under `constraints` with `reference` pinned at 0.
pub fn solve_positions(
    count: usize,
    constraints: &[Constraint],
    reference: usize,
    config: &SolverConfig,
) -> SolveResult {
    assert!(
        reference < count,
        "reference {} out of range for {} tiles",
        reference,
        count
    );

    let constraints: Vec<Constraint> = constraints
        .iter()
        .copied()
        .filter(|c| {
            c.source != c.target && c.source < count && c.target < count && c.offset.is_finite()
        })
        .collect();

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (ci, c) in constraints.iter().enumerate() {
        adjacency[c.source].push(ci);
        adjacency[c.target].push(ci);
    }

    // Breadth-first walk from the reference: marks the resolvable tiles and
    // seeds their positions along a spanning tree.
    let mut positions = vec![0.0f64; count];
    let mut resolved = vec![false; count];
    resolved[reference] = true;
    let mut queue = VecDeque::from([reference]);
    while let Some(node) = queue.pop_front() {
        for &ci in &adjacency[node] {
            let c = constraints[ci];
            let (other, estimate) = if c.source == node {
                (c.target, positions[node] + c.offset)
            } else {
                (c.source, positions[node] - c.offset)
            };
            if !resolved[other] {
                resolved[other] = true;
                positions[other] = estimate;
                queue.push_back(other);
            }
        }
    }

    let free: Vec<usize> = (0..count)
        .filter(|&i| resolved[i] && i != reference)
        .collect();
    let active: Vec<usize> = (0..constraints.len())
        .filter(|&ci| resolved[constraints[ci].source])
        .collect();

    let mut weights = vec![1.0f64; constraints.len()];
    let mut iterations = 0;
    let mut rounds = 0;
    let mut max_residual = residual_stats(&constraints, &active, &positions).0;

    while rounds < config.rounds {
        rounds += 1;
        for _ in 0..config.max_iterations {
            iterations += 1;
            let mut max_update = 0.0f64;
            for &node in &free {
                let (mut num, mut den) = (0.0, 0.0);
                for &ci in &adjacency[node] {
                    let c = constraints[ci];
                    let estimate = if c.target == node {
                        positions[c.source] + c.offset
                    } else {
                        positions[c.target] - c.offset
                    };
                    num += weights[ci] * estimate;
                    den += weights[ci];
                }
                if den > 0.0 {
                    let updated = num / den;
                    max_update = max_update.max((updated - positions[node]).abs());
                    positions[node] = updated;
                }
            }
            max_residual = residual_stats(&constraints, &active, &positions).0;
            if max_residual < config.convergence_threshold || max_update < config.min_update {
                break;
            }
        }

        if max_residual < config.convergence_threshold {
            break;
        }
        let Some(delta) = config.huber_delta else {
            break;
        };
        let mut changed = false;
        for &ci in &active {
            let w = huber_weight(residual(&constraints[ci], &positions), delta);
            if (w - weights[ci]).abs() > 1e-9 {
                changed = true;
            }
            weights[ci] = w;
        }
        if !changed {
            break;
        }
        tracing::debug!(round = rounds, max_residual, "Reweighted constraints");
    }

    let (max_residual, mean_residual) = residual_stats(&constraints, &active, &positions);
    let converged = max_residual <= config.max_allowed_error;
    if !converged {
        tracing::warn!(
            max_residual,
            max_allowed_error = config.max_allowed_error,
            "Relaxation did not reach the allowed error, returning best effort"
        );
    }

    positions[reference] = 0.0;
    SolveResult {
        positions: (0..count)
            .map(|i| resolved[i].then_some(positions[i]))
            .collect(),
        reference,
        rounds,
        iterations,
        max_residual,
        mean_residual,
        converged,
    }
}

#[inline]
fn residual(c: &Constraint, positions: &[f64]) -> f64 {
    positions[c.target] - positions[c.source] - c.offset
}

/// `(max, mean)` absolute residual over the active constraints.
fn residual_stats(constraints: &[Constraint], active: &[usize], positions: &[f64]) -> (f64, f64) {
    if active.is_empty() {
        return (0.0, 0.0);
    }
    let mut max = 0.0f64;
    let mut sum = 0.0;
    for &ci in active {
        let r = residual(&constraints[ci], positions).abs();
        max = max.max(r);
        sum += r;
    }
    (max, sum / active.len() as f64)
}

/// Huber weight: 1 inside the threshold, `delta / |r|` outside.
#[inline]
pub(crate) fn huber_weight(residual: f64, delta: f64) -> f64 {
    let abs_r = residual.abs();
    if abs_r <= delta {
        1.0
    } else {
        delta / abs_r
    }
}
