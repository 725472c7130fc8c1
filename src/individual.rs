use epidemic_common::{Arena, Health, SimParams, Vec2};

use crate::rng::SimRng;

/// A disk-shaped individual moving through the arena.
///
/// Between collisions an individual travels in a straight line at constant
/// speed. The `collisions` counter is bumped on every wall or pair collision
/// and serves as the epoch token that invalidates stale queued events.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f64,
    pub mass: f64,
    health: Health,
    collisions: u32,
}

impl Individual {
    pub fn new(position: Vec2, velocity: Vec2, radius: f64, mass: f64) -> Self {
        Individual {
            position,
            velocity,
            radius,
            mass,
            health: Health::Susceptible,
            collisions: 0,
        }
    }

    /// Draws a susceptible individual with a uniform position inside the
    /// walls (inset by the radius) and Normal(0, velocity_sigma) velocity
    /// components.
    pub fn random(rng: &mut SimRng, params: &SimParams) -> Self {
        let arena = &params.arena;
        let r = params.radius;
        let position = Vec2::new(
            rng.uniform_in(arena.left() + r, arena.right() - r),
            rng.uniform_in(arena.bottom() + r, arena.top() - r),
        );
        let velocity = Vec2::new(
            rng.normal(0.0, params.velocity_sigma),
            rng.normal(0.0, params.velocity_sigma),
        );
        Individual::new(position, velocity, r, params.mass)
    }

    pub fn health(&self) -> Health {
        self.health
    }

    /// Epoch counter: total collisions this individual has participated in.
    pub fn collisions(&self) -> u32 {
        self.collisions
    }

    pub fn can_get_infected(&self) -> bool {
        self.health.can_get_infected()
    }

    pub fn is_infected(&self) -> bool {
        self.health.is_infected()
    }

    pub fn is_dead(&self) -> bool {
        self.health.is_dead()
    }

    /// Geometric overlap test.
    pub fn collides_with(&self, other: &Individual) -> bool {
        let sigma = self.radius + other.radius;
        self.position.distance_squared(other.position) < sigma * sigma
    }

    /// Advances the position by `velocity * dt`. Dead individuals stay put.
    pub fn advance(&mut self, dt: f64) {
        if self.is_dead() {
            return;
        }
        self.position = self.position + self.velocity.scale(dt);
    }

    /// Analytic time until this disk contacts `other`, assuming both keep
    /// their current velocities. Returns infinity when no contact is ahead:
    /// either is dead, the disks already touch, they are not approaching
    /// (`dv·dr >= 0`), or the quadratic has no real root.
    pub fn time_to_hit(&self, other: &Individual) -> f64 {
        if self.is_dead() || other.is_dead() {
            return f64::INFINITY;
        }
        let dr = other.position - self.position;
        let dv = other.velocity - self.velocity;
        let dvdr = dv.dot(dr);
        if dvdr >= 0.0 {
            return f64::INFINITY;
        }
        let dvdv = dv.length_squared();
        if dvdv == 0.0 {
            return f64::INFINITY;
        }
        let drdr = dr.length_squared();
        let sigma = self.radius + other.radius;
        if drdr < sigma * sigma {
            return f64::INFINITY;
        }
        let d = dvdr * dvdr - dvdv * (drdr - sigma * sigma);
        if d < 0.0 {
            return f64::INFINITY;
        }
        -(dvdr + d.sqrt()) / dvdv
    }

    /// Time until the disk reaches the left or right wall, whichever its
    /// x-velocity points at.
    pub fn time_to_hit_vertical_wall(&self, arena: &Arena) -> f64 {
        if self.is_dead() {
            return f64::INFINITY;
        }
        if self.velocity.x > 0.0 {
            (arena.right() - self.radius - self.position.x) / self.velocity.x
        } else if self.velocity.x < 0.0 {
            (arena.left() + self.radius - self.position.x) / self.velocity.x
        } else {
            f64::INFINITY
        }
    }

    /// Time until the disk reaches the top or bottom wall, whichever its
    /// y-velocity points at.
    pub fn time_to_hit_horizontal_wall(&self, arena: &Arena) -> f64 {
        if self.is_dead() {
            return f64::INFINITY;
        }
        if self.velocity.y > 0.0 {
            (arena.top() - self.radius - self.position.y) / self.velocity.y
        } else if self.velocity.y < 0.0 {
            (arena.bottom() + self.radius - self.position.y) / self.velocity.y
        } else {
            f64::INFINITY
        }
    }

    /// Elastic collision with `other`: reflects both velocities about the
    /// line of centers and bumps both epoch counters. Both individuals must
    /// be alive; the dispatcher guarantees this through event validity.
    pub fn bounce_off(&mut self, other: &mut Individual) {
        let dr = other.position - self.position;
        let dv = other.velocity - self.velocity;
        let dvdr = dv.dot(dr);
        let sigma = self.radius + other.radius;
        let impulse = 2.0 * self.mass * other.mass * dvdr / ((self.mass + other.mass) * sigma);
        let impulse_vec = dr.scale(impulse / sigma);
        self.velocity = self.velocity + impulse_vec.scale(1.0 / self.mass);
        other.velocity = other.velocity - impulse_vec.scale(1.0 / other.mass);
        self.collisions += 1;
        other.collisions += 1;
    }

    /// Bounce off the left or right wall: the x-velocity flips.
    pub fn bounce_off_vertical_wall(&mut self) {
        self.velocity.x = -self.velocity.x;
        self.collisions += 1;
    }

    /// Bounce off the top or bottom wall: the y-velocity flips.
    pub fn bounce_off_horizontal_wall(&mut self) {
        self.velocity.y = -self.velocity.y;
        self.collisions += 1;
    }

    /// Susceptible → Infected. No-op in any other state.
    pub fn infect(&mut self) {
        if self.health == Health::Susceptible {
            self.health = Health::Infected;
        }
    }

    /// Infected → Dead (velocity zeroed) or Recovered. No-op in any other
    /// state.
    pub fn end_infection(&mut self, die: bool) {
        if self.health != Health::Infected {
            return;
        }
        if die {
            self.health = Health::Dead;
            self.velocity = Vec2::zero();
        } else {
            self.health = Health::Recovered;
        }
    }
}
