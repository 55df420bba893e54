//! Region alias table.
//!
//! Each supported region carries the default security group applied to new
//! instances when the launch spec does not name one. Region resolution runs
//! before any provider call so an unrecognized alias never reaches the API.

use crate::domain::FleetError;

/// A supported provider region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Canonical region id, e.g. `us-east-1`.
    pub id: &'static str,
    /// Human alias accepted interchangeably with the canonical id.
    pub alias: &'static str,
    /// Default security group for instances created in this region.
    pub security_group: &'static str,
}

const REGIONS: &[Region] = &[
    Region {
        id: "us-east-1",
        alias: "virginia",
        security_group: "sg-098524cf5a5d0011f",
    },
    Region {
        id: "us-east-2",
        alias: "ohio",
        security_group: "sg-0a98f6952f8c78610",
    },
    Region {
        id: "us-west-2",
        alias: "oregon",
        security_group: "sg-087e10932df344958",
    },
];

/// Region used when neither the command line nor the profile names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Resolve a region alias or canonical id.
///
/// # Errors
///
/// Returns [`FleetError::UnknownRegionAlias`] for anything not in the table.
pub fn resolve(input: &str) -> Result<&'static Region, FleetError> {
    REGIONS
        .iter()
        .find(|r| r.id == input || r.alias == input)
        .ok_or_else(|| FleetError::UnknownRegionAlias(input.to_string()))
}
