//! historian 会话生命周期：初始化、连接订阅、拆除。

mod controller;
mod error;
mod registry;

pub use controller::{HistorianModule, ModuleState};
pub use error::{ModuleError, TeardownError};
pub use registry::SubscriptionRegistry;
