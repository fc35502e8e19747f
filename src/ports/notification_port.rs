//! Notification channel port.
//!
//! The core hands over structured reports; rendering is the adapter's job.

use crate::domain::control::ControlReply;
use crate::domain::cycle::CycleReport;
use crate::domain::error::SignalError;

pub trait NotificationPort: Send + Sync {
    fn publish_cycle(&self, report: &CycleReport) -> Result<(), SignalError>;

    fn publish_reply(&self, reply: &ControlReply) -> Result<(), SignalError>;
}
