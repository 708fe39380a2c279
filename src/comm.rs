use core::sync::atomic::{AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use crate::color::ColorCategory;
use crate::sensor::SensorSide;

pub static CLASSIFICATION: SharedClassification = SharedClassification::new();

/// Latest classification per side plus a consume-once "new data" flag.
///
/// One writer (the sampler) and one reader (the decision loop). Writes
/// overwrite, nothing is queued. The two side slots and the flag are not
/// updated as one unit: a reader may see a fresh value for one side next to
/// a stale value for the other. The decision logic tolerates that since each
/// side is re-read every cycle.
pub struct SharedClassification {
    left: AtomicU8,
    right: AtomicU8,
    fresh: Signal<CriticalSectionRawMutex, ()>,
}

impl SharedClassification {
    pub const fn new() -> Self {
        Self {
            left: AtomicU8::new(ColorCategory::None as u8),
            right: AtomicU8::new(ColorCategory::None as u8),
            fresh: Signal::new(),
        }
    }

    pub fn publish(&self, side: SensorSide, category: ColorCategory) {
        let slot = match side {
            SensorSide::Left => &self.left,
            SensorSide::Right => &self.right,
        };
        slot.store(category as u8, Ordering::Release);
    }

    /// Raises the "new data" flag. Raising it again before it is consumed
    /// is a no-op.
    pub fn notify(&self) {
        self.fresh.signal(());
    }

    /// Current (left, right) categories.
    pub fn latest(&self) -> (ColorCategory, ColorCategory) {
        (
            ColorCategory::from_raw(self.left.load(Ordering::Acquire)),
            ColorCategory::from_raw(self.right.load(Ordering::Acquire)),
        )
    }

    /// Waits for the flag and clears it.
    pub async fn wait_fresh(&self) {
        self.fresh.wait().await
    }

    /// Clears the flag if set, returning whether it was.
    pub fn take_fresh(&self) -> bool {
        self.fresh.try_take().is_some()
    }
}

impl Default for SharedClassification {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let cell = SharedClassification::new();
        assert_eq!(cell.latest(), (ColorCategory::None, ColorCategory::None));
        assert!(!cell.take_fresh());
    }

    #[test]
    fn publish_overwrites_one_side() {
        let cell = SharedClassification::new();
        cell.publish(SensorSide::Right, ColorCategory::Blue);
        cell.publish(SensorSide::Right, ColorCategory::Red);
        cell.publish(SensorSide::Left, ColorCategory::Yellow);
        assert_eq!(cell.latest(), (ColorCategory::Yellow, ColorCategory::Red));
    }

    #[test]
    fn flag_is_consumed_once() {
        let cell = SharedClassification::new();
        cell.notify();
        cell.notify();
        assert!(cell.take_fresh());
        assert!(!cell.take_fresh());

        cell.notify();
        embassy_futures::block_on(cell.wait_fresh());
        assert!(!cell.take_fresh());
    }

    #[test]
    fn publish_alone_does_not_raise_flag() {
        let cell = SharedClassification::new();
        cell.publish(SensorSide::Left, ColorCategory::Blue);
        assert!(!cell.take_fresh());
    }
}
