//! 模块 JSON 配置解析。
//!
//! ```json
//! { "ServerName": "hist01", "UserName": "u", "Password": "p",
//!   "PrintToConsole": false,
//!   "TagsToSubscribe": [ { "TagName": "T1", "MinimumElapsedMilliSeconds": 1000 } ] }
//! ```

use crate::ConfigError;
use domain::{
    CertificateValidationMode, ConnectionConfig, DEFAULT_MINIMUM_ELAPSED_MS, TagSubscription,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ModuleConfigInput {
    #[serde(rename = "ServerName")]
    server_name: String,
    #[serde(rename = "UserName")]
    user_name: String,
    #[serde(rename = "Password")]
    password: String,
    #[serde(rename = "PrintToConsole", default)]
    print_to_console: bool,
    #[serde(rename = "CertificateValidationMode", default)]
    certificate_validation_mode: CertificateValidationInput,
    #[serde(rename = "TagsToSubscribe")]
    tags_to_subscribe: Vec<TagInput>,
}

#[derive(Debug, Deserialize)]
struct TagInput {
    #[serde(rename = "TagName")]
    tag_name: String,
    #[serde(rename = "MinimumElapsedMilliSeconds", default = "default_minimum_elapsed")]
    minimum_elapsed_ms: u32,
}

#[derive(Debug, Default, Deserialize)]
enum CertificateValidationInput {
    #[serde(alias = "strict")]
    Strict,
    #[default]
    #[serde(alias = "none")]
    None,
}

fn default_minimum_elapsed() -> u32 {
    DEFAULT_MINIMUM_ELAPSED_MS
}

/// 解析并校验模块配置（UTF-8 JSON）。
pub fn parse_module_config(bytes: &[u8]) -> Result<ConnectionConfig, ConfigError> {
    let text = std::str::from_utf8(bytes).map_err(|err| ConfigError::Parse(err.to_string()))?;
    let input: ModuleConfigInput =
        serde_json::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;

    if input.server_name.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "ServerName".to_string(),
            "must not be empty".to_string(),
        ));
    }

    let mut subscriptions = Vec::with_capacity(input.tags_to_subscribe.len());
    for tag in input.tags_to_subscribe {
        if tag.tag_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "TagName".to_string(),
                "must not be empty".to_string(),
            ));
        }
        subscriptions.push(TagSubscription::new(tag.tag_name, tag.minimum_elapsed_ms));
    }

    let certificate_validation = match input.certificate_validation_mode {
        CertificateValidationInput::Strict => CertificateValidationMode::Strict,
        CertificateValidationInput::None => CertificateValidationMode::None,
    };

    Ok(ConnectionConfig {
        host: input.server_name,
        username: input.user_name,
        password: input.password,
        certificate_validation,
        print_diagnostics: input.print_to_console,
        subscriptions,
    })
}
