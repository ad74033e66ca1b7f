//! Multi-channel notification delivery.
//!
//! Validated [`destination::Destination`]s, a [`transport::TransportRegistry`]
//! with one transport per channel, the [`notification::NotificationCore`]
//! façade and the [`throttle::Accountant`] for monthly email quotas.

// Shared infrastructure
pub mod config;
pub mod error;
pub mod metrics;
pub mod redis;
pub mod telemetry;

// Domain
pub mod destination;
pub mod message;
pub mod validation;

// Delivery
pub mod credentials;
pub mod notification;
pub mod throttle;
pub mod transport;
