//! Fixed timestep simulation tick
//!
//! `advance` moves the world forward by one tick. `apply_impulse` and `kill`
//! are the only commands a player can issue against its cloud.

use glam::Vec2;

use super::collision::{bounce, pair_mut, transfer_mass};
use super::world::World;
use crate::consts::*;
use crate::impulse_at_angle;

/// Advance the world by one tick
///
/// Clouds are processed in stable index order, and each one resolves its
/// contacts against the others in index order too. With three or more
/// mutually overlapping clouds the result therefore depends on that order.
pub fn advance(world: &mut World) {
    let step = MOVE_SCALE * world.speed() as f32;
    let width = world.width as f32;
    let height = world.height as f32;
    let count = world.entities.len();

    for i in 0..count {
        if !world.entities[i].is_alive() {
            continue;
        }

        // Movement and damping
        {
            let cloud = &mut world.entities[i];
            cloud.pos += cloud.vel * step;
            cloud.vel *= VELOCITY_DAMPING;
        }

        // Absorb or donate vapor
        for j in 0..count {
            if j == i {
                continue;
            }
            let (cloud, other) = pair_mut(&mut world.entities, i, j);
            if !other.is_alive() {
                continue;
            }
            transfer_mass(cloud, other);
        }

        bounce(&mut world.entities[i], width, height);
    }

    world.settle();
}

/// Push the cloud at `index` with `impulse`, paying for it in vapor
///
/// Rejected without any change when the strength is below `MIN_IMPULSE`,
/// above half the cloud's mass, or `index` is out of range. On success the
/// spent vapor is ejected behind the cloud as a new neutral cloud.
pub fn apply_impulse(world: &mut World, index: usize, impulse: Vec2) -> bool {
    let Some(cloud) = world.entities.get_mut(index) else {
        return false;
    };

    let strength = impulse.length();
    // Written so that NaN strengths are rejected too
    if !(strength >= MIN_IMPULSE && strength <= cloud.mass / 2.0) {
        return false;
    }

    cloud.mass -= strength;
    cloud.vel += impulse * (IMPULSE_GAIN / cloud.radius());

    // Exhaust
    let dir = impulse / strength;
    let distance = (cloud.radius() + strength.sqrt()) * EXHAUST_SPACING;
    let pos = cloud.pos - dir * distance;
    let vel = -dir * EXHAUST_SPEED + cloud.vel;
    world.spawn(pos, vel, strength);

    true
}

/// Blow up the cloud at `index`
///
/// Returns false if the cloud was already dead (its mass is still forced to
/// zero) or `index` is out of range.
pub fn kill(world: &mut World, index: usize) -> bool {
    let Some(cloud) = world.entities.get_mut(index) else {
        return false;
    };
    if !cloud.is_alive() {
        cloud.mass = 0.0;
        return false;
    }

    let mut angle = 0.0;
    while angle < 360.0 && world.entities[index].is_alive() {
        apply_impulse(world, index, impulse_at_angle(angle, KILL_RING_STRENGTH));
        angle += KILL_RING_STEP;
    }

    world.entities[index].mass = 0.0;
    true
}
