//! Identity types shared by every layer above the protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a statically configured game room.
///
/// Rooms are numbered by the configuration store and arrive on the wire as
/// `int32`. The `#[serde(transparent)]` attribute keeps seed files plain:
/// `RoomId(3)` is written as just `3`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub i32);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

impl From<i32> for RoomId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}
