use serde::Deserialize;

use super::Extent;

/// How much of a composite a candidate tile covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contribution {
    None,
    Partial,
    Full,
}

/// Classification rule used when enumerating composite candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionPolicy {
    /// Corner containment. A candidate with no corner strictly inside the
    /// composite falls back to an overlap test, so an enclosing candidate is
    /// `Full` and a crossing one `Partial`.
    #[default]
    Corner,
    /// Interval overlap on both axes.
    Interval,
}

impl Extent {
    /// Positive-area intersection; shared edges do not count.
    fn overlaps(&self, other: &Extent) -> bool {
        self.east.min(other.east) > self.west.max(other.west)
            && self.north.min(other.north) > self.south.max(other.south)
    }

    /// Classify this candidate tile against a composite extent.
    pub fn contribution_to(&self, composite: &Extent, policy: ContributionPolicy) -> Contribution {
        match policy {
            ContributionPolicy::Corner => {
                let corners = self.corners();
                if corners.iter().all(|&(x, y)| composite.contains(x, y)) {
                    Contribution::Full
                } else if corners.iter().any(|&(x, y)| composite.strictly_contains(x, y)) {
                    Contribution::Partial
                } else if !self.overlaps(composite) {
                    Contribution::None
                } else if self.contains_extent(composite) {
                    Contribution::Full
                } else {
                    Contribution::Partial
                }
            }
            ContributionPolicy::Interval => {
                if !self.overlaps(composite) {
                    Contribution::None
                } else if composite.contains_extent(self) {
                    Contribution::Full
                } else {
                    Contribution::Partial
                }
            }
        }
    }
}
