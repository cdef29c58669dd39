//! BlueChat protocol constants
//!
//! Two-phase namespacing: peers advertise and scan under the discovery
//! service, and exchange frames over the session characteristics once paired.
//! The values match the deployed Android and iOS clients.

use uuid::Uuid;

// ----------------------------------------------------------------------------
// Service and Characteristic UUIDs
// ----------------------------------------------------------------------------

/// Discovery identifier: the GATT service advertised and scanned for
pub const DISCOVERY_SERVICE_UUID: Uuid = Uuid::from_u128(0x42332fe8_9915_11ea_bb37_0242ac130002);

/// Session identifier: notify characteristic carrying peripheral → central frames
pub const SESSION_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xf0ab5a15_b003_4653_a248_73fd504c128f);

/// Write characteristic carrying central → peripheral frames
pub const MESSAGE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x43eb0d29_4188_4c84_b1e8_73231e02af95);

// ----------------------------------------------------------------------------
// Framing Limits
// ----------------------------------------------------------------------------

/// Largest attribute value a single GATT write or notification can carry
pub const MAX_ATTRIBUTE_LEN: usize = 512;

/// Largest index `<= max` that does not split a UTF-8 sequence in `bytes`
pub fn utf8_boundary(bytes: &[u8], max: usize) -> usize {
    if bytes.len() <= max {
        return bytes.len();
    }
    let mut end = max;
    // Continuation bytes look like 0b10xx_xxxx
    while end > 0 && (bytes[end] & 0xC0) == 0x80 {
        end -= 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_strings_match_deployed_clients() {
        assert_eq!(
            DISCOVERY_SERVICE_UUID.to_string(),
            "42332fe8-9915-11ea-bb37-0242ac130002"
        );
        assert_eq!(
            SESSION_CHARACTERISTIC_UUID.to_string(),
            "f0ab5a15-b003-4653-a248-73fd504c128f"
        );
        assert_eq!(
            MESSAGE_CHARACTERISTIC_UUID.to_string(),
            "43eb0d29-4188-4c84-b1e8-73231e02af95"
        );
    }

    #[test]
    fn test_utf8_boundary() {
        assert_eq!(utf8_boundary(b"hello", 10), 5);
        assert_eq!(utf8_boundary(b"hello", 3), 3);

        // "é" is two bytes; cutting after its first byte backs off
        let text = "aé".as_bytes();
        assert_eq!(text.len(), 3);
        assert_eq!(utf8_boundary(text, 2), 1);

        // "🦀" is four bytes
        let crab = "🦀🦀".as_bytes();
        assert_eq!(utf8_boundary(crab, 6), 4);
        assert_eq!(utf8_boundary(crab, 3), 0);
    }
}
