//! Room capacity configuration.

use serde_json::Value;

/// Capacity limits for one room.
///
/// The two limits are independent: a room can be full of users while no
/// one is presenting, and vice versa.
#[derive(Debug, Clone)]
pub struct RoomLimits {
    /// Maximum concurrently admitted participants (user slot pool size).
    pub max_users: u32,

    /// Maximum concurrent screen-shares (presentation slot pool size).
    pub max_presentations: u32,
}

impl Default for RoomLimits {
    fn default() -> Self {
        Self {
            max_users: 12,
            max_presentations: 3,
        }
    }
}

/// Occupancy summary returned by [`RoomHandle::status`](crate::RoomHandle::status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomStatusInfo {
    pub user_count: u32,
    pub presentation_count: u32,
    pub max_users: u32,
    pub max_presentations: u32,
}

/// A loose check that an engine parameter blob is plausible.
///
/// The coordination layer treats engine blobs as opaque, but a request
/// carrying `null` where RTP parameters or capabilities belong is always a
/// client bug, and rejecting it here gives a clean 400 instead of an
/// engine-side failure later.
pub fn params_present(params: &Value) -> bool {
    !params.is_null()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_limits_default() {
        let limits = RoomLimits::default();
        assert_eq!(limits.max_users, 12);
        assert_eq!(limits.max_presentations, 3);
    }

    #[test]
    fn test_params_present_rejects_null_only() {
        assert!(!params_present(&Value::Null));
        assert!(params_present(&serde_json::json!({})));
        assert!(params_present(&serde_json::json!({ "codecs": [] })));
    }
}
