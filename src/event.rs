use crate::individual::Individual;

/// A future occurrence on the simulation clock.
///
/// Events never hold references into the population: particle events carry
/// the individual's index together with the epoch (collision count) captured
/// at scheduling time. When the individual collides with anything else
/// first, its epoch advances and the queued event goes stale; the dispatcher
/// detects this after dequeue and skips it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Event {
    /// Repaint request. Always valid.
    Redraw { time: f64 },
    /// Predicted pair collision.
    Collision {
        time: f64,
        a: usize,
        b: usize,
        a_epoch: u32,
        b_epoch: u32,
    },
    /// Predicted bounce off the left or right wall.
    VerticalWallCollision { time: f64, id: usize, epoch: u32 },
    /// Predicted bounce off the top or bottom wall.
    HorizontalWallCollision { time: f64, id: usize, epoch: u32 },
    /// End of an individual's infectious period. Valid unless the
    /// individual has died.
    EndInfection { time: f64, id: usize },
}

impl Event {
    /// Builds a pair collision event, snapshotting both epochs.
    pub fn collision(time: f64, a: usize, b: usize, individuals: &[Individual]) -> Self {
        Event::Collision {
            time,
            a,
            b,
            a_epoch: individuals[a].collisions(),
            b_epoch: individuals[b].collisions(),
        }
    }

    /// Builds a vertical-wall event, snapshotting the epoch.
    pub fn vertical_wall(time: f64, id: usize, individuals: &[Individual]) -> Self {
        Event::VerticalWallCollision {
            time,
            id,
            epoch: individuals[id].collisions(),
        }
    }

    /// Builds a horizontal-wall event, snapshotting the epoch.
    pub fn horizontal_wall(time: f64, id: usize, individuals: &[Individual]) -> Self {
        Event::HorizontalWallCollision {
            time,
            id,
            epoch: individuals[id].collisions(),
        }
    }

    /// The simulated time this event is scheduled for.
    pub fn time(&self) -> f64 {
        match *self {
            Event::Redraw { time }
            | Event::Collision { time, .. }
            | Event::VerticalWallCollision { time, .. }
            | Event::HorizontalWallCollision { time, .. }
            | Event::EndInfection { time, .. } => time,
        }
    }

    /// True if the event still refers to the state it was scheduled
    /// against: every referenced individual alive with an unchanged epoch.
    pub fn is_valid(&self, individuals: &[Individual]) -> bool {
        let fresh = |id: usize, epoch: u32| {
            let i = &individuals[id];
            !i.is_dead() && i.collisions() == epoch
        };
        match *self {
            Event::Redraw { .. } => true,
            Event::Collision { a, b, a_epoch, b_epoch, .. } => {
                fresh(a, a_epoch) && fresh(b, b_epoch)
            }
            Event::VerticalWallCollision { id, epoch, .. }
            | Event::HorizontalWallCollision { id, epoch, .. } => fresh(id, epoch),
            Event::EndInfection { id, .. } => !individuals[id].is_dead(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epidemic_common::Vec2;

    fn population() -> Vec<Individual> {
        vec![
            Individual::new(Vec2::new(-50.0, 0.0), Vec2::new(1.0, 0.0), 8.0, 1.0),
            Individual::new(Vec2::new(50.0, 0.0), Vec2::new(-1.0, 0.0), 8.0, 1.0),
        ]
    }

    #[test]
    fn collision_goes_stale_when_either_epoch_moves() {
        let mut individuals = population();
        let ev = Event::collision(1.0, 0, 1, &individuals);
        assert!(ev.is_valid(&individuals));

        individuals[1].bounce_off_vertical_wall();
        assert!(!ev.is_valid(&individuals));
    }

    #[test]
    fn death_invalidates_particle_events() {
        let mut individuals = population();
        let wall = Event::vertical_wall(2.0, 0, &individuals);
        let end = Event::EndInfection { time: 3.0, id: 0 };
        assert!(wall.is_valid(&individuals));
        assert!(end.is_valid(&individuals));

        individuals[0].infect();
        individuals[0].end_infection(true);
        assert!(!wall.is_valid(&individuals));
        assert!(!end.is_valid(&individuals));
    }

    #[test]
    fn redraw_is_always_valid() {
        let individuals = population();
        assert!(Event::Redraw { time: 0.0 }.is_valid(&individuals));
        assert!(Event::Redraw { time: 0.0 }.is_valid(&[]));
    }

    #[test]
    fn end_infection_survives_epoch_changes() {
        let mut individuals = population();
        individuals[0].infect();
        let end = Event::EndInfection { time: 3.0, id: 0 };
        individuals[0].bounce_off_horizontal_wall();
        assert!(end.is_valid(&individuals));
    }
}
