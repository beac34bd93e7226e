//! Canonical weather-condition codes.
//!
//! The gateway reports conditions in a single code space (the primary
//! provider's) regardless of which upstream supplied the data. The
//! fallback provider reports WMO codes, mapped here onto their rough
//! canonical equivalents.

/// Maps a WMO weather code onto the canonical code space.
///
/// Unknown codes map to `None`; callers pass the absence through rather
/// than guessing a condition.
#[must_use]
pub fn canonical_code(wmo: i64) -> Option<i64> {
    match wmo {
        0 | 1 => Some(1000),                              // Clear
        2 => Some(1101),                                  // Partly cloudy
        3 => Some(1001),                                  // Overcast
        45 | 48 => Some(2000),                            // Fog
        51 | 53 | 55 | 61 | 63 | 65 | 80 | 81 | 82 => Some(4001), // Drizzle, rain, showers
        71 | 73 | 75 | 77 | 85 | 86 => Some(5001),        // Snow
        56 | 57 | 66 | 67 => Some(6201),                  // Freezing rain / sleet
        95 | 96 | 99 => Some(8000),                       // Thunderstorm
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_and_overcast() {
        assert_eq!(canonical_code(0), Some(1000));
        assert_eq!(canonical_code(1), Some(1000));
        assert_eq!(canonical_code(2), Some(1101));
        assert_eq!(canonical_code(3), Some(1001));
    }

    #[test]
    fn precipitation_families() {
        assert_eq!(canonical_code(61), Some(4001));
        assert_eq!(canonical_code(82), Some(4001));
        assert_eq!(canonical_code(75), Some(5001));
        assert_eq!(canonical_code(66), Some(6201));
        assert_eq!(canonical_code(95), Some(8000));
    }

    #[test]
    fn unknown_codes_stay_unknown() {
        assert_eq!(canonical_code(42), None);
        assert_eq!(canonical_code(-1), None);
    }
}
