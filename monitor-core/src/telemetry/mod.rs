//! Local event log shared by firmware and host targets.
//!
//! Every event the monitors detect lands here, published or not. The log is a
//! fixed-capacity ring; once full the oldest records are overwritten.

use core::time::Duration;

use heapless::HistoryBuf;

use crate::notify::MonitorEvent;
use crate::sensors::{MonitorInstant, PowerSource};

/// Total number of records retained in memory.
pub const EVENT_LOG_CAPACITY: usize = 64;

/// Monotonically increasing record identifier (wraps).
pub type EventId = u32;

/// Record stored in the event log.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EventRecord<I> {
    pub id: EventId,
    pub timestamp: I,
    pub event: MonitorEvent,
    /// Whether the event was handed to the notification sink.
    pub published: bool,
    /// For `PowerRestored`: time spent on battery since the matching `PowerLost`,
    /// or since boot when the device started on battery.
    pub outage: Option<Duration>,
}

/// Ring buffer of monitor events.
pub struct EventLog<I, const CAPACITY: usize = EVENT_LOG_CAPACITY> {
    ring: HistoryBuf<EventRecord<I>, CAPACITY>,
    outage_started: Option<I>,
    next_event_id: EventId,
}

impl<I, const CAPACITY: usize> EventLog<I, CAPACITY>
where
    I: MonitorInstant,
{
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            outage_started: None,
            next_event_id: 0,
        }
    }

    /// Records `event`, returning its identifier.
    pub fn record(&mut self, event: MonitorEvent, published: bool, timestamp: I) -> EventId {
        let outage = match event {
            MonitorEvent::PowerLost | MonitorEvent::Booted(PowerSource::Battery) => {
                self.outage_started = Some(timestamp);
                None
            }
            MonitorEvent::PowerRestored => self
                .outage_started
                .take()
                .map(|started| timestamp.saturating_duration_since(started)),
            _ => None,
        };

        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(EventRecord {
            id,
            timestamp,
            event,
            published,
            outage,
        });

        id
    }

    /// Iterates the retained records in chronological order.
    pub fn oldest_first(&self) -> impl Iterator<Item = &EventRecord<I>> + '_ {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent record, if available.
    pub fn latest(&self) -> Option<&EventRecord<I>> {
        self.ring.recent()
    }

    /// Returns the instant the current outage began, if power is out.
    pub fn outage_started(&self) -> Option<I> {
        self.outage_started
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl<I, const CAPACITY: usize> Default for EventLog<I, CAPACITY>
where
    I: MonitorInstant,
{
    fn default() -> Self {
        Self::new()
    }
}
