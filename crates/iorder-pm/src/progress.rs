//! Progress counters and the receivers they report to.
//!
//! A [`ProgressCounter`] is created per phase with a name and a total. Every
//! change is delivered to the registered [`ProgressReceiver`], whose return
//! value asks the sender to continue (`true`) or to stop (`false`). Senders
//! are free to ignore that request.

use std::fmt;

/// Snapshot of a counter, as delivered to receivers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressData {
    name: String,
    min: u64,
    max: u64,
    value: u64,
}

impl ProgressData {
    pub fn new(name: impl Into<String>, max: u64) -> Self {
        Self {
            name: name.into(),
            min: 0,
            max,
            value: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// Percentage done, 100 for an empty range
    pub fn percent(&self) -> u64 {
        let range = self.max.saturating_sub(self.min);
        if range == 0 {
            return 100;
        }
        (self.value.saturating_sub(self.min) * 100 / range).min(100)
    }
}

impl fmt::Display for ProgressData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{} ({}%)", self.name, self.value, self.max, self.percent())
    }
}

/// Sink for progress updates
pub trait ProgressReceiver {
    /// Handle an update. Return false to ask the sender to stop.
    fn receive(&mut self, data: &ProgressData) -> bool;
}

impl<F> ProgressReceiver for F
where
    F: FnMut(&ProgressData) -> bool,
{
    fn receive(&mut self, data: &ProgressData) -> bool {
        self(data)
    }
}

/// Receiver that writes every update to the debug log and always continues
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReceiver;

impl ProgressReceiver for LogReceiver {
    fn receive(&mut self, data: &ProgressData) -> bool {
        log::debug!("...->{}", data);
        true
    }
}

/// A named counter reporting to an optional receiver
pub struct ProgressCounter<'a> {
    data: ProgressData,
    receiver: Option<&'a mut dyn ProgressReceiver>,
}

impl<'a> ProgressCounter<'a> {
    /// Create a counter running from 0 to `total`
    pub fn new(name: impl Into<String>, total: u64) -> Self {
        Self {
            data: ProgressData::new(name, total),
            receiver: None,
        }
    }

    /// Deliver all further updates to `receiver`
    pub fn send_to(mut self, receiver: &'a mut dyn ProgressReceiver) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn data(&self) -> &ProgressData {
        &self.data
    }

    pub fn value(&self) -> u64 {
        self.data.value
    }

    /// Reset to the minimum and report
    pub fn to_min(&mut self) -> bool {
        self.data.value = self.data.min;
        self.report()
    }

    /// Advance by one and report
    pub fn incr(&mut self) -> bool {
        self.data.value = self.data.value.saturating_add(1);
        self.report()
    }

    /// Jump to the maximum and report
    pub fn to_max(&mut self) -> bool {
        self.data.value = self.data.max;
        self.report()
    }

    fn report(&mut self) -> bool {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.receive(&self.data),
            None => true,
        }
    }
}

impl fmt::Debug for ProgressCounter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressCounter")
            .field("data", &self.data)
            .field("receiver", &self.receiver.is_some())
            .finish()
    }
}
