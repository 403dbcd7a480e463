// crates/zigbee-rs/src/correlator/sequence.rs
use crate::hal::ZigbeeError;

/// Generates the 8-bit sequence numbers of bridge commands.
///
/// The counter wraps at 256. Numbers that are still reserved by a waiting
/// exchange are skipped, so a number is never handed out twice while in use.
#[derive(Debug, Default, Clone)]
pub struct SequenceAllocator {
    next: u8,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the counter at a given value (used by tests and after a reset).
    pub fn starting_at(next: u8) -> Self {
        Self { next }
    }

    /// Returns the number the next allocation will try first.
    pub fn peek(&self) -> u8 {
        self.next
    }

    /// Allocates the next free sequence number.
    ///
    /// `is_reserved` reports whether a number is currently held by a waiting
    /// exchange.
    pub fn allocate<F>(&mut self, is_reserved: F) -> Result<u8, ZigbeeError>
    where
        F: Fn(u8) -> bool,
    {
        let mut candidate = self.next;
        for _ in 0..=u8::MAX as u16 {
            if !is_reserved(candidate) {
                self.next = candidate.wrapping_add(1);
                return Ok(candidate);
            }
            candidate = candidate.wrapping_add(1);
        }
        Err(ZigbeeError::SequenceNumbersExhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_wraps() {
        let mut seq = SequenceAllocator::starting_at(254);
        assert_eq!(seq.allocate(|_| false), Ok(254));
        assert_eq!(seq.allocate(|_| false), Ok(255));
        assert_eq!(seq.allocate(|_| false), Ok(0));
        assert_eq!(seq.peek(), 1);
    }

    #[test]
    fn test_allocate_skips_reserved() {
        let mut seq = SequenceAllocator::starting_at(5);
        assert_eq!(seq.allocate(|s| s == 5 || s == 6), Ok(7));
        assert_eq!(seq.peek(), 8);
    }

    #[test]
    fn test_allocate_exhausted() {
        let mut seq = SequenceAllocator::new();
        assert_eq!(
            seq.allocate(|_| true),
            Err(ZigbeeError::SequenceNumbersExhausted)
        );
        // The counter does not move on failure.
        assert_eq!(seq.peek(), 0);
    }
}
