//! Notification façade and privileged execution.

pub mod privileged;
mod service;

pub use privileged::{run_privileged, DirectExecution, PrivilegeGuard, PrivilegedExecution};
pub use service::NotificationCore;
