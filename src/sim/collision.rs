//! Cloud contact and wall response
//!
//! Overlapping clouds merge one mass unit at a time from the smaller disc to
//! the larger one, and clouds leaving the arena are clamped back inside with
//! a damped reflection.

use super::entity::Entity;
use crate::consts::{TRANSFER_STEP, WALL_RESTITUTION};

/// Move mass between two clouds while they overlap and both live
///
/// The donor is fixed before the first step: `a` donates only if its radius
/// is strictly smaller, so on equal radii `b` donates. Returns the amount
/// moved (always a whole number of steps). Stops early once the masses are
/// too large for a step to register.
pub fn transfer_mass(a: &mut Entity, b: &mut Entity) -> f32 {
    let a_donates = a.radius() < b.radius();
    let mut moved = 0.0;

    while a.intersects(b) {
        if !a.is_alive() || !b.is_alive() {
            break;
        }
        let (donor, receiver) = if a_donates { (&mut *a, &mut *b) } else { (&mut *b, &mut *a) };
        let before = (donor.mass, receiver.mass);
        donor.mass -= TRANSFER_STEP;
        receiver.mass += TRANSFER_STEP;
        // Past f32 integer precision a step no longer changes anything
        if (donor.mass, receiver.mass) == before {
            break;
        }
        moved += TRANSFER_STEP;
    }

    moved
}

/// Clamp a cloud inside `[r, size - r]` on both axes, reflecting velocity
///
/// Returns true if any wall was touched.
pub fn bounce(cloud: &mut Entity, width: f32, height: f32) -> bool {
    let r = cloud.radius();
    let mut hit = false;

    if cloud.pos.x < r {
        cloud.pos.x = r;
        cloud.vel.x = cloud.vel.x.abs() * WALL_RESTITUTION;
        hit = true;
    }
    if cloud.pos.y < r {
        cloud.pos.y = r;
        cloud.vel.y = cloud.vel.y.abs() * WALL_RESTITUTION;
        hit = true;
    }
    if cloud.pos.x + r > width {
        cloud.pos.x = width - r;
        cloud.vel.x = -cloud.vel.x.abs() * WALL_RESTITUTION;
        hit = true;
    }
    if cloud.pos.y + r > height {
        cloud.pos.y = height - r;
        cloud.vel.y = -cloud.vel.y.abs() * WALL_RESTITUTION;
        hit = true;
    }

    hit
}

/// Two distinct mutable elements of a slice
///
/// Panics if `i == j` or either index is out of bounds.
pub(crate) fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    assert_ne!(i, j, "pair_mut needs distinct indices");
    if i < j {
        let (head, tail) = items.split_at_mut(j);
        (&mut head[i], &mut tail[0])
    } else {
        let (head, tail) = items.split_at_mut(i);
        (&mut tail[0], &mut head[j])
    }
}
