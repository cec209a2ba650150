//! Source address cache for `--log-addresses`.
//!
//! Each address is logged when it is first seen and again once it has aged
//! out. Aging is driven by the housekeeping tick: every [`AGE_TICKS`] ticks a
//! slot that saw traffic becomes old, and an old slot that saw none is freed.

use std::net::IpAddr;
use std::time::Duration;

/// Number of remembered addresses.
pub(crate) const SLOTS: usize = 10;

/// Housekeeping tick interval.
pub(crate) const TICK: Duration = Duration::from_millis(500);

/// Ticks between aging passes (about five minutes).
pub(crate) const AGE_TICKS: u32 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Unused,
    Used(IpAddr),
    Old(IpAddr),
}

#[derive(Debug)]
pub(crate) struct AddressLog {
    slots: [Slot; SLOTS],
    ticks: u32,
}

impl AddressLog {
    pub(crate) fn new() -> Self {
        Self {
            slots: [Slot::Unused; SLOTS],
            ticks: 0,
        }
    }

    /// Record traffic from `addr`. Returns `true` when it should be logged.
    ///
    /// A full cache does not evict; the address is simply logged every time
    /// until a slot frees up.
    pub(crate) fn observe(&mut self, addr: IpAddr) -> bool {
        for slot in &mut self.slots {
            match *slot {
                Slot::Used(known) | Slot::Old(known) if known == addr => {
                    *slot = Slot::Used(addr);
                    return false;
                }
                _ => {}
            }
        }

        if let Some(slot) = self.slots.iter_mut().find(|s| **s == Slot::Unused) {
            *slot = Slot::Used(addr);
        }
        true
    }

    /// Advance one tick, aging the cache when due.
    pub(crate) fn tick(&mut self) {
        self.ticks += 1;
        if self.ticks <= AGE_TICKS {
            return;
        }
        self.ticks = 0;
        for slot in &mut self.slots {
            *slot = match *slot {
                Slot::Used(addr) => Slot::Old(addr),
                Slot::Old(_) | Slot::Unused => Slot::Unused,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([192, 0, 2, last])
    }

    fn age(log: &mut AddressLog) {
        for _ in 0..=AGE_TICKS {
            log.tick();
        }
    }

    #[test]
    fn logs_each_address_once() {
        let mut log = AddressLog::new();
        assert!(log.observe(ip(1)));
        assert!(!log.observe(ip(1)));
        assert!(log.observe(ip(2)));
        assert!(!log.observe(ip(1)));
    }

    #[test]
    fn idle_addresses_age_out_after_two_passes() {
        let mut log = AddressLog::new();
        log.observe(ip(1));

        age(&mut log);
        // old but still remembered; traffic makes it used again
        assert!(!log.observe(ip(1)));

        age(&mut log);
        age(&mut log);
        assert!(log.observe(ip(1)));
    }

    #[test]
    fn full_cache_keeps_logging_newcomers() {
        let mut log = AddressLog::new();
        for last in 0..SLOTS as u8 {
            assert!(log.observe(ip(last)));
        }
        assert!(log.observe(ip(200)));
        assert!(log.observe(ip(200)));
        assert!(!log.observe(ip(0)));
    }
}
