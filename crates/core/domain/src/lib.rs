//! historian 桥接的共享数据模型。

pub mod connection;
pub mod data;

pub use connection::{
    CertificateValidationMode, ConnectionConfig, DEFAULT_MINIMUM_ELAPSED_MS, TagSubscription,
};
pub use data::{CanonicalReading, ENVELOPE_NAME, Envelope, Quality, RawValueChange, TagValue};
