//! Key encoding utilities for `RocksDB`.

use estate_credits_core::{DeviceId, UsageId, UserId};

/// Create a profile key from a user ID.
#[must_use]
pub fn profile_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a usage log key.
///
/// Format: `user_id (16 bytes) || usage_id (16 bytes)`
///
/// Since ULIDs are time-ordered, a user's records sort by time.
#[must_use]
pub fn usage_key(user_id: &UserId, usage_id: &UsageId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&usage_id.to_bytes());
    key
}

/// Create a prefix for iterating a user's usage log.
#[must_use]
pub fn user_usage_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Upper bound of a user's usage log range, for reverse iteration.
#[must_use]
pub fn user_usage_end(user_id: &UserId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&[0xFF; 16]);
    key
}

/// Create a device trial key.
#[must_use]
pub fn device_trial_key(device_id: &DeviceId) -> Vec<u8> {
    device_id.as_str().as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_key_is_prefixed_by_user() {
        let user_id = UserId::generate();
        let usage_id = UsageId::generate();
        let key = usage_key(&user_id, &usage_id);

        assert_eq!(key.len(), 32);
        assert!(key.starts_with(&user_usage_prefix(&user_id)));
        assert!(key < user_usage_end(&user_id));
        assert_eq!(&key[16..], usage_id.to_bytes());
    }

    #[test]
    fn later_usage_sorts_after_earlier() {
        let user_id = UserId::generate();
        let first = UsageId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = UsageId::generate();

        assert!(usage_key(&user_id, &first) < usage_key(&user_id, &second));
    }
}
