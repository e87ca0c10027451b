//! Buffer-size policy for the message encoder.

use serde::Deserialize;

/// A struct with a private constructor, so an out-of-order `Limits`
/// cannot be built except by validating through `Limits::new`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct LimitsOrderingError {
    pub min_packet_size: usize,
    pub max_packet_size: usize,
    pub absolute_max_packet_size: usize,
}

impl std::fmt::Display for LimitsOrderingError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "packet size limits must satisfy min ({}) <= max ({}) <= absolute_max ({}), and min >= 48",
            self.min_packet_size, self.max_packet_size, self.absolute_max_packet_size
        )
    }
}

impl std::error::Error for LimitsOrderingError {}

/// `min_packet_size` (initial buffer capacity), `max_packet_size`
/// (default upper bound for a packet, 576 per DNS-over-UDP convention),
/// `absolute_max_packet_size` (hard ceiling regardless of any EDNS
/// negotiation).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize)]
#[serde(try_from = "RawLimits")]
pub struct Limits {
    min_packet_size: usize,
    max_packet_size: usize,
    absolute_max_packet_size: usize,
}

#[derive(Deserialize)]
struct RawLimits {
    #[serde(default = "default_min")]
    min_packet_size: usize,
    #[serde(default = "default_max")]
    max_packet_size: usize,
    #[serde(default = "default_absolute_max")]
    absolute_max_packet_size: usize,
}

fn default_min() -> usize {
    64
}
fn default_max() -> usize {
    576
}
fn default_absolute_max() -> usize {
    4096
}

impl TryFrom<RawLimits> for Limits {
    type Error = LimitsOrderingError;

    fn try_from(raw: RawLimits) -> Result<Self, Self::Error> {
        Limits::new(raw.min_packet_size, raw.max_packet_size, raw.absolute_max_packet_size)
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            min_packet_size: default_min(),
            max_packet_size: default_max(),
            absolute_max_packet_size: default_absolute_max(),
        }
    }
}

impl Limits {
    /// # Errors
    ///
    /// If the ordering invariant `48 <= min <= max <= absolute_max` does
    /// not hold.
    pub fn new(
        min_packet_size: usize,
        max_packet_size: usize,
        absolute_max_packet_size: usize,
    ) -> Result<Self, LimitsOrderingError> {
        if min_packet_size < 48
            || min_packet_size > max_packet_size
            || max_packet_size > absolute_max_packet_size
        {
            return Err(LimitsOrderingError {
                min_packet_size,
                max_packet_size,
                absolute_max_packet_size,
            });
        }
        Ok(Limits {
            min_packet_size,
            max_packet_size,
            absolute_max_packet_size,
        })
    }

    pub fn min_packet_size(&self) -> usize {
        self.min_packet_size
    }

    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    pub fn absolute_max_packet_size(&self) -> usize {
        self.absolute_max_packet_size
    }

    /// The effective cap for one encode: the channel's advertised
    /// maximum (learned from an inbound EDNS OPT record), falling back
    /// to `max_packet_size`, clamped to `absolute_max_packet_size`.
    pub fn effective_max(&self, channel_advised: Option<usize>) -> usize {
        channel_advised
            .unwrap_or(self.max_packet_size)
            .min(self.absolute_max_packet_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_satisfy_ordering() {
        let limits = Limits::default();
        assert!(limits.min_packet_size() <= limits.max_packet_size());
        assert!(limits.max_packet_size() <= limits.absolute_max_packet_size());
    }

    #[test]
    fn rejects_out_of_order_limits() {
        assert!(Limits::new(600, 576, 4096).is_err());
        assert!(Limits::new(32, 576, 4096).is_err());
    }

    #[test]
    fn effective_max_prefers_channel_advice_but_respects_absolute_ceiling() {
        let limits = Limits::default();
        assert_eq!(limits.effective_max(Some(1200)), 1200);
        assert_eq!(limits.effective_max(Some(8192)), 4096);
        assert_eq!(limits.effective_max(None), 576);
    }
}
