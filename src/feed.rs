//! Post-commit fan-out of attendance changes to subscribers.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::attendance::AttendanceChange;
use crate::error::{Error, Result};

/// Every clone shares the same subscriber list. A subscriber whose
/// receiver is gone is dropped on the next publish.
#[derive(Clone, Default)]
pub struct ChangeFeed {
    subscribers: Arc<Mutex<Vec<Sender<AttendanceChange>>>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, change: AttendanceChange) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            log::error!("Change feed lock poisoned, dropping {:?}", change);
            return;
        };
        subscribers.retain(|tx| tx.send(change.clone()).is_ok());
        log::debug!("Published {:?} to {} subscribers", change, subscribers.len());
    }

    pub fn subscribe(&self) -> Receiver<AttendanceChange> {
        let (tx, rx) = channel();
        match self.subscribers.lock() {
            Ok(mut subscribers) => subscribers.push(tx),
            Err(_) => log::error!("Change feed lock poisoned, subscriber will receive nothing"),
        }
        rx
    }

    /// Runs `callback` for each change on a dedicated thread, in publish
    /// order. Slow work (mail, chat) belongs here, never under the writer
    /// lock.
    pub fn on_change<F>(&self, mut callback: F) -> Result<()>
    where
        F: FnMut(AttendanceChange) + Send + 'static,
    {
        let rx = self.subscribe();
        thread::Builder::new()
            .name("attendance-changes".to_owned())
            .spawn(move || rx.iter().for_each(&mut callback))
            .map_err(|e| Error::Validation(format!("could not start change listener: {e}")))?;
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map_or(0, |subscribers| subscribers.len())
    }
}
