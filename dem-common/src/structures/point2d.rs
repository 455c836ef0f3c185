/// A 2-D point, with x and y fields.
#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    /// Creates a new Point2D.
    pub fn new(x: f64, y: f64) -> Point2D {
        Point2D { x: x, y: y }
    }

    /// Rotates the point about the origin by `angle` radians (counter-clockwise).
    pub fn rotated(&self, angle: f64) -> Point2D {
        let (s, c) = angle.sin_cos();
        Point2D {
            x: c * self.x - s * self.y,
            y: s * self.x + c * self.y,
        }
    }

    pub fn shifted(&self, by: Point2D) -> Point2D {
        Point2D {
            x: self.x + by.x,
            y: self.y + by.y,
        }
    }
}

impl std::ops::Sub for Point2D {
    type Output = Point2D;
    fn sub(self, other: Point2D) -> Point2D {
        Point2D::new(self.x - other.x, self.y - other.y)
    }
}

impl std::ops::Add for Point2D {
    type Output = Point2D;
    fn add(self, other: Point2D) -> Point2D {
        Point2D::new(self.x + other.x, self.y + other.y)
    }
}
