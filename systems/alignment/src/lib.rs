#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Roll-free rotation that carries one 3D direction onto another.
//!
//! Each direction is expanded into an orthonormal basis whose "right" axis is
//! derived from a stable world "up" reference. Composing
//! `basis(to) · basis(from)ᵀ` rotates `from` onto `to` without imparting roll
//! relative to that reference, which keeps the stimulus field upright while
//! the focus target sweeps continuously. A shortest-arc rotation leaves the
//! roll about the target axis unconstrained and is therefore not used.

use kinetic_perimetry_core::{Direction3, PerimetryError, RotationMatrix};

/// Default "up" reference of the virtual scene.
pub const WORLD_UP: Direction3 = Direction3::Y;

/// Cross products shorter than this are treated as parallel.
pub const PARALLEL_EPSILON: f64 = 1e-6;

/// Rotation mapping `from` onto `to`, keeping [`WORLD_UP`] upright.
pub fn compute_alignment(
    from: Direction3,
    to: Direction3,
) -> Result<RotationMatrix, PerimetryError> {
    compute_alignment_with_up(from, to, WORLD_UP)
}

/// Rotation mapping `from` onto `to`, keeping `world_up` upright.
///
/// Directions parallel to `world_up` fall back to world Z and then world X as
/// the reference, so only zero-length or non-finite inputs are rejected.
pub fn compute_alignment_with_up(
    from: Direction3,
    to: Direction3,
    world_up: Direction3,
) -> Result<RotationMatrix, PerimetryError> {
    let from_basis = orientation_basis(from, world_up)?;
    let to_basis = orientation_basis(to, world_up)?;
    Ok(to_basis * from_basis.transpose())
}

/// Orthonormal basis with columns `(right, up, forward)` where `forward ∥ axis`.
pub fn orientation_basis(
    axis: Direction3,
    world_up: Direction3,
) -> Result<RotationMatrix, PerimetryError> {
    let length = axis.length();
    if !length.is_finite() || length == 0.0 {
        return Err(PerimetryError::InvalidDirection);
    }
    let forward = axis / length;

    let right = [world_up, Direction3::Z, Direction3::X]
        .into_iter()
        .map(|reference| reference.cross(forward))
        .find(|candidate| candidate.length() >= PARALLEL_EPSILON)
        .ok_or(PerimetryError::InvalidDirection)?
        .normalize();
    let up = forward.cross(right);

    Ok(RotationMatrix::from_cols(right, up, forward))
}
