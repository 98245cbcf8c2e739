//! Lifecycle state shared by components, entities, systems and the manager

use bitflags::bitflags;

bitflags! {
    /// Lifecycle progress of a runtime object
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LifecycleFlags: u8 {
        /// `init()` has run
        const INITED = 1 << 0;
        /// `start()` has run
        const STARTED = 1 << 1;
        /// `destroy()` has run; terminal
        const DESTROYED = 1 << 2;
    }
}

impl LifecycleFlags {
    /// Mark `flag` set and report whether it was newly set
    pub fn enter(&mut self, flag: LifecycleFlags) -> bool {
        if self.contains(flag) {
            return false;
        }
        self.insert(flag);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_reports_first_transition_only() {
        let mut flags = LifecycleFlags::empty();
        assert!(flags.enter(LifecycleFlags::INITED));
        assert!(!flags.enter(LifecycleFlags::INITED));
        assert!(flags.contains(LifecycleFlags::INITED));
        assert!(!flags.contains(LifecycleFlags::STARTED));
    }
}
