/// Coarse per-cell traversability label (§3).
///
/// Kept as a separate enum from [`FineLabel`] per the design note in spec
/// §9: coarse and fine labels are tagged enumerations, never overlapping
/// integers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CoarseLabel {
    Unknown,
    Traversable,
    NonTraversable,
}

impl Default for CoarseLabel {
    fn default() -> Self {
        CoarseLabel::Unknown
    }
}

/// Fine-grained sub-label describing ground geometry or obstacle sign (§3).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FineLabel {
    Unknown,
    FlatGround,
    Upslope,
    Downslope,
    LeftSideSlope,
    RightSideSlope,
    EdgePoints,
    PositiveObstacle,
    NegativeObstacle,
}

impl Default for FineLabel {
    fn default() -> Self {
        FineLabel::Unknown
    }
}

impl FineLabel {
    /// True for the sub-labels the obstacle sub-labeler is allowed to write
    /// (§3 invariant: `sublab` is non-unknown-obstacle only under
    /// `NonTraversable` cells or within an interpolated blind gap).
    pub fn is_obstacle(&self) -> bool {
        matches!(self, FineLabel::PositiveObstacle | FineLabel::NegativeObstacle)
    }
}
