use crate::controller::ModuleState;
use bridge_config::ConfigError;
use bridge_historian::HistorianError;

/// 生命周期错误。
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("connection error: {0}")]
    Connection(#[from] HistorianError),
    #[error("invalid state: cannot {operation} from {state:?}")]
    InvalidState {
        operation: &'static str,
        state: ModuleState,
    },
}

/// 拆除阶段的单步失败，记录后继续后续步骤。
#[derive(Debug, thiserror::Error)]
pub enum TeardownError {
    #[error("drop subscriptions failed: {0}")]
    DropSubscriptions(HistorianError),
    #[error("detach change handler failed: {0}")]
    DetachHandler(HistorianError),
    #[error("disconnect failed: {0}")]
    Disconnect(HistorianError),
    #[error("publish worker failed: {0}")]
    Worker(String),
}
