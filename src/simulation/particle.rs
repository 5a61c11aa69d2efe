//! Particle state.

use std::fmt;

use crate::types::GridPoint;

/// Why a particle stopped moving.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeathCause {
    /// Reached the closed-boundary margin of the domain
    Edge,
    /// Its stencil left the loaded domain
    OutOfDomain,
    /// Moved onto land
    Beached,
}

impl fmt::Display for DeathCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Edge => "edge",
            Self::OutOfDomain => "out of domain",
            Self::Beached => "beached",
        };
        f.write_str(name)
    }
}

/// One tracked particle.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    id: usize,
    position: GridPoint,
    /// Seconds since release, always positive.
    age: f64,
    death: Option<DeathCause>,
}

impl Particle {
    pub fn new(id: usize, position: GridPoint) -> Self {
        Self {
            id,
            position,
            age: 0.0,
            death: None,
        }
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn position(&self) -> GridPoint {
        self.position
    }

    pub fn age(&self) -> f64 {
        self.age
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.death.is_none()
    }

    pub fn death(&self) -> Option<DeathCause> {
        self.death
    }

    /// Stop the particle; the first cause sticks.
    pub fn kill(&mut self, cause: DeathCause) {
        if self.death.is_none() {
            self.death = Some(cause);
        }
    }

    pub(crate) fn move_to(&mut self, position: GridPoint) {
        self.position = position;
    }

    pub(crate) fn grow_older(&mut self, dt: f64) {
        self.age += dt.abs();
    }
}
