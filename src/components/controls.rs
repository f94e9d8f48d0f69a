//! Control and protection elements: Switch, Fuse, SeriesAmmeter.

use crate::MIN_RESISTANCE;

/// A switch.
///
/// Closed: stamped like a wire.
/// Open: stamps nothing, leaving its two vertices electrically disconnected.
#[derive(Debug, Clone)]
pub struct Switch {
    pub closed: bool,
}

impl Switch {
    /// Resistance when closed.
    pub const R_CLOSED: f64 = MIN_RESISTANCE;

    /// Create a new switch.
    pub fn new(closed: bool) -> Self {
        Self { closed }
    }

    /// Set the switch state.
    pub fn set_state(&mut self, closed: bool) {
        self.closed = closed;
    }

    /// Toggle the switch state.
    pub fn toggle(&mut self) {
        self.closed = !self.closed;
    }
}

/// A fuse.
///
/// Conducts like a small resistor until the current magnitude exceeds the
/// rating for longer than `trip_delay`, then opens permanently until reset.
#[derive(Debug, Clone)]
pub struct Fuse {
    /// Current rating in amperes
    pub current_rating: f64,
    pub resistance: f64,
    /// How long (s) the rating may be exceeded before tripping
    pub trip_delay: f64,
    /// Time (s) the rating has been continuously exceeded
    pub over_rating_time: f64,
    pub tripped: bool,
}

impl Fuse {
    /// Lowest and highest ratings on the resistance map (A).
    pub const MIN_RATING: f64 = 0.5;
    pub const MAX_RATING: f64 = 20.0;

    /// Resistance of the thinnest and thickest fuse elements (Ω).
    pub const MAX_FUSE_RESISTANCE: f64 = 0.03;
    pub const MIN_FUSE_RESISTANCE: f64 = 0.0005;

    /// Default trip delay (s).
    pub const DEFAULT_TRIP_DELAY: f64 = 0.05;

    /// Create a new fuse. Its resistance follows from the rating.
    pub fn new(current_rating: f64) -> Self {
        let rating = current_rating.abs();
        Self {
            current_rating: rating,
            resistance: Self::resistance_for_rating(rating),
            trip_delay: Self::DEFAULT_TRIP_DELAY,
            over_rating_time: 0.0,
            tripped: false,
        }
    }

    pub fn with_trip_delay(mut self, trip_delay: f64) -> Self {
        self.trip_delay = trip_delay.max(0.0);
        self
    }

    /// Thin (low rating) fuse elements have more resistance than thick ones.
    /// Linear map from [`MIN_RATING`, `MAX_RATING`] onto
    /// [`MAX_FUSE_RESISTANCE`, `MIN_FUSE_RESISTANCE`].
    ///
    /// [`MIN_RATING`]: Fuse::MIN_RATING
    /// [`MAX_RATING`]: Fuse::MAX_RATING
    /// [`MAX_FUSE_RESISTANCE`]: Fuse::MAX_FUSE_RESISTANCE
    /// [`MIN_FUSE_RESISTANCE`]: Fuse::MIN_FUSE_RESISTANCE
    pub fn resistance_for_rating(rating: f64) -> f64 {
        let t = ((rating - Self::MIN_RATING) / (Self::MAX_RATING - Self::MIN_RATING)).clamp(0.0, 1.0);
        Self::MAX_FUSE_RESISTANCE + t * (Self::MIN_FUSE_RESISTANCE - Self::MAX_FUSE_RESISTANCE)
    }

    /// Change the rating; the resistance follows.
    pub fn set_rating(&mut self, current_rating: f64) {
        self.current_rating = current_rating.abs();
        self.resistance = Self::resistance_for_rating(self.current_rating);
    }

    /// Account for `dt` seconds of `current`. Returns true if the fuse
    /// tripped during this call.
    pub fn observe(&mut self, current: f64, dt: f64) -> bool {
        if self.tripped {
            return false;
        }
        if current.abs() > self.current_rating {
            self.over_rating_time += dt;
            if self.over_rating_time > self.trip_delay {
                self.tripped = true;
                return true;
            }
        } else {
            self.over_rating_time = 0.0;
        }
        false
    }

    /// Replace the blown element.
    pub fn reset(&mut self) {
        self.tripped = false;
        self.over_rating_time = 0.0;
    }
}

/// An ammeter inserted in series. Electrically a wire; exists to be read.
#[derive(Debug, Clone)]
pub struct SeriesAmmeter {
    pub resistance: f64,
}

impl SeriesAmmeter {
    pub fn new() -> Self {
        Self {
            resistance: MIN_RESISTANCE,
        }
    }
}

impl Default for SeriesAmmeter {
    fn default() -> Self {
        Self::new()
    }
}
