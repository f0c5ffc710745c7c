//! Geometry accepted by the index facade.
//!
//! Callers hand over either a point or an axis-aligned rectangle (usually the
//! envelope of a richer shape such as a shapefile polygon). Dispatch on the
//! variant happens once, when a record is built for insertion or deletion.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::envelope::Envelope;

/// A point or rectangle keyed into the index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point {
        x: f64,
        y: f64,
    },
    Rectangle {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },
}

impl Geometry {
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point { x, y }
    }

    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Geometry::Rectangle {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn is_point(&self) -> bool {
        matches!(self, Geometry::Point { .. })
    }

    pub fn envelope(&self) -> Envelope {
        match *self {
            Geometry::Point { x, y } => Envelope::from_point(x, y),
            Geometry::Rectangle {
                min_x,
                min_y,
                max_x,
                max_y,
            } => Envelope::new(min_x, min_y, max_x, max_y),
        }
    }
}

impl From<Envelope> for Geometry {
    fn from(envelope: Envelope) -> Self {
        Geometry::rectangle(
            envelope.min_x,
            envelope.min_y,
            envelope.max_x,
            envelope.max_y,
        )
    }
}

impl Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Geometry::Point { x, y } => write!(f, "POINT({} {})", x, y),
            Geometry::Rectangle {
                min_x,
                min_y,
                max_x,
                max_y,
            } => write!(f, "RECTANGLE({} {}, {} {})", min_x, min_y, max_x, max_y),
        }
    }
}
