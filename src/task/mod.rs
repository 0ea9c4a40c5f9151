//! Background tasks for periodic rescans and notification delivery.

pub mod notification_dispatcher;
pub mod rescan_task;
