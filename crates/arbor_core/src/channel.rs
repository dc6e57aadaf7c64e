//! Resource channels: the hand-off between a producer and an assembler.
//!
//! A [`ResourceChannel`] is a [`Signal`] with a producer/consumer split.
//! Shape and appearance builders hold a [`ChannelProducer`] and write into
//! it; the object assembler reads the channel and reacts to changes.
//!
//! Channels are single-writer by contract. A second live producer is not
//! rejected (last write wins) but is reported with a warning.
//!
//! Values overwritten before an assembler consumed them are handed back by
//! [`ChannelProducer::set`]; releasing them is the producer's job.

use std::cell::Cell;
use std::rc::Rc;

use crate::signal::{Signal, Subscription};

/// Consumer side of a single-slot resource hand-off.
pub struct ResourceChannel<T> {
    label: Rc<str>,
    signal: Signal<T>,
    producers: Rc<Cell<usize>>,
}

impl<T> ResourceChannel<T> {
    /// Creates an empty channel. `label` appears in diagnostics only.
    pub fn new(label: &str) -> Self {
        Self {
            label: Rc::from(label),
            signal: Signal::new(),
            producers: Rc::new(Cell::new(0)),
        }
    }

    /// Creates the writer for this channel.
    pub fn producer(&self) -> ChannelProducer<T> {
        let live = self.producers.get();
        if live > 0 {
            log::warn!(
                "Channel '{}' already has {live} live producer(s); last write wins",
                self.label
            );
        }
        self.producers.set(live + 1);
        ChannelProducer {
            label: Rc::clone(&self.label),
            signal: self.signal.clone(),
            producers: Rc::clone(&self.producers),
        }
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Reads the latest value.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        self.signal.with(f)
    }

    /// Returns `true` once a producer has written a value.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.signal.is_set()
    }

    /// Change counter of the underlying signal.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.signal.version()
    }

    /// Re-runs `observer` after every write.
    pub fn subscribe(&self, observer: impl FnMut() + 'static) -> Subscription {
        self.signal.subscribe(observer)
    }

    /// Number of producers currently alive.
    #[must_use]
    pub fn producer_count(&self) -> usize {
        self.producers.get()
    }
}

impl<T: Clone> ResourceChannel<T> {
    /// Returns a clone of the latest value.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.signal.get()
    }
}

impl<T> Clone for ResourceChannel<T> {
    fn clone(&self) -> Self {
        Self {
            label: Rc::clone(&self.label),
            signal: self.signal.clone(),
            producers: Rc::clone(&self.producers),
        }
    }
}

/// Writer side of a [`ResourceChannel`].
pub struct ChannelProducer<T> {
    label: Rc<str>,
    signal: Signal<T>,
    producers: Rc<Cell<usize>>,
}

impl<T> ChannelProducer<T> {
    /// Publishes a new value, returning the one it replaced.
    pub fn set(&self, value: T) -> Option<T> {
        log::trace!("Channel '{}' updated", self.label);
        self.signal.set(value)
    }

    /// Withdraws the current value.
    pub fn clear(&self) -> Option<T> {
        self.signal.clear()
    }
}

impl<T> Drop for ChannelProducer<T> {
    fn drop(&mut self) {
        self.producers.set(self.producers.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_writes_are_visible_to_consumer() {
        let channel = ResourceChannel::new("shape");
        let producer = channel.producer();
        assert!(!channel.is_ready());

        assert_eq!(producer.set(10), None);
        assert_eq!(producer.set(20), Some(10));
        assert_eq!(channel.get(), Some(20));
    }

    #[test]
    fn producer_count_tracks_live_writers() {
        let channel: ResourceChannel<u8> = ResourceChannel::new("appearance");
        let first = channel.producer();
        let second = channel.producer();
        assert_eq!(channel.producer_count(), 2);
        drop(first);
        drop(second);
        assert_eq!(channel.producer_count(), 0);
    }
}
