use std::fmt;

/// 订阅默认的最小间隔（毫秒）。
pub const DEFAULT_MINIMUM_ELAPSED_MS: u32 = 1000;

/// 单个点位订阅。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSubscription {
    pub name: String,
    pub minimum_elapsed_ms: u32,
}

impl TagSubscription {
    pub fn new(name: impl Into<String>, minimum_elapsed_ms: u32) -> Self {
        Self {
            name: name.into(),
            minimum_elapsed_ms,
        }
    }

    /// 使用默认间隔构造订阅。
    pub fn with_default_interval(name: impl Into<String>) -> Self {
        Self::new(name, DEFAULT_MINIMUM_ELAPSED_MS)
    }
}

/// 服务端证书校验模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CertificateValidationMode {
    Strict,
    #[default]
    None,
}

/// historian 连接配置，启动时构造一次，之后只读。
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub certificate_validation: CertificateValidationMode,
    pub print_diagnostics: bool,
    pub subscriptions: Vec<TagSubscription>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"***")
            .field("certificate_validation", &self.certificate_validation)
            .field("print_diagnostics", &self.print_diagnostics)
            .field("subscriptions", &self.subscriptions)
            .finish()
    }
}
