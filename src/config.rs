//! 配置模块，负责加载连接器的 JSON 配置文件

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConnectorError;

/// 未指定 host 时使用的默认 NocoDB 云端地址
pub const DEFAULT_HOST: &str = "https://app.nocodb.com";

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

/// 认证方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// 个人 API Token，通过 xc-token 请求头发送
    #[default]
    Token,
    /// Authorization: Bearer <token>
    Bearer,
}

/// 连接器配置：实例地址与认证凭据
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorConfig {
    /// NocoDB 实例的基础 URL
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub auth_method: AuthMethod,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub bearer: Option<String>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            auth_method: AuthMethod::Token,
            token: None,
            bearer: None,
        }
    }
}

impl ConnectorConfig {
    /// 使用 xc-token 认证的配置
    pub fn with_token(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            auth_method: AuthMethod::Token,
            token: Some(token.into()),
            bearer: None,
        }
    }

    /// 使用 Bearer 认证的配置
    pub fn with_bearer(host: impl Into<String>, bearer: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            auth_method: AuthMethod::Bearer,
            token: None,
            bearer: Some(bearer.into()),
        }
    }

    /// 从JSON文件加载连接器配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConnectorError> {
        let path_ref = path.as_ref();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(ConnectorError::Config(format!(
                "配置文件不存在: {}",
                path_ref.display()
            )));
        }

        // 读取文件内容
        let content = fs::read_to_string(path_ref).map_err(|e| {
            ConnectorError::Config(format!("无法读取配置文件 {}: {}", path_ref.display(), e))
        })?;

        // 解析JSON
        let config: ConnectorConfig = serde_json::from_str(&content).map_err(|e| {
            ConnectorError::Config(format!("无法解析JSON配置文件 {}: {}", path_ref.display(), e))
        })?;

        Ok(config)
    }

    /// 返回去除尾部斜杠的基础 URL，空 host 回退到默认地址
    pub fn base_url(&self) -> String {
        let host = if self.host.is_empty() {
            DEFAULT_HOST
        } else {
            self.host.as_str()
        };
        host.trim_end_matches('/').to_string()
    }

    /// 按所选认证方式组装请求头；所需凭据缺失时返回配置错误
    pub fn auth_headers(&self) -> Result<Vec<(String, String)>, ConnectorError> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        match self.auth_method {
            AuthMethod::Bearer => {
                let bearer = self
                    .bearer
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        ConnectorError::Config("Bearer token is missing in credentials".to_string())
                    })?;
                headers.push(("Authorization".to_string(), format!("Bearer {bearer}")));
            }
            AuthMethod::Token => {
                let token = self
                    .token
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        ConnectorError::Config(
                            "API token (xc-token) is missing in credentials".to_string(),
                        )
                    })?;
                headers.push(("xc-token".to_string(), token.to_string()));
            }
        }
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    #[test]
    fn test_load_valid_json_config() {
        // 创建临时配置文件
        let temp_file = "test_connector_config.json";
        let mut file = fs::File::create(temp_file).unwrap();
        writeln!(
            file,
            r#"{{
            "host": "https://nocodb.example.com/",
            "authMethod": "bearer",
            "bearer": "jwt-token"
        }}"#
        )
        .unwrap();

        // 测试加载
        let config = ConnectorConfig::from_json_file(temp_file).unwrap();
        assert_eq!(config.auth_method, AuthMethod::Bearer);
        assert_eq!(config.bearer.as_deref(), Some("jwt-token"));
        assert_eq!(config.base_url(), "https://nocodb.example.com");

        // 清理
        fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_invalid_json_config() {
        let temp_file = "test_invalid_connector_config.json";
        let mut file = fs::File::create(temp_file).unwrap();
        writeln!(file, "invalid json").unwrap();

        let result = ConnectorConfig::from_json_file(temp_file);
        assert!(result.is_err());

        // 清理
        fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_missing_file() {
        let result = ConnectorConfig::from_json_file("non_existent_config.json");
        assert!(result.is_err());
    }

    #[test]
    fn test_default_host_applies_when_missing() {
        let config: ConnectorConfig = serde_json::from_str(r#"{"token": "abc"}"#).unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.base_url(), DEFAULT_HOST);
    }

    #[test]
    fn test_token_headers() {
        let config = ConnectorConfig::with_token("https://x.example.com", "secret");
        let headers = config.auth_headers().unwrap();
        assert!(headers.contains(&("Accept".to_string(), "application/json".to_string())));
        assert!(headers.contains(&("xc-token".to_string(), "secret".to_string())));
    }

    #[test]
    fn test_bearer_headers() {
        let config = ConnectorConfig::with_bearer("https://x.example.com", "jwt");
        let headers = config.auth_headers().unwrap();
        assert!(headers.contains(&("Authorization".to_string(), "Bearer jwt".to_string())));
    }

    #[test]
    fn test_missing_credential_is_config_error() {
        let mut config = ConnectorConfig::default();
        assert!(matches!(
            config.auth_headers(),
            Err(ConnectorError::Config(_))
        ));

        config.auth_method = AuthMethod::Bearer;
        config.token = Some("unused".to_string());
        assert!(matches!(
            config.auth_headers(),
            Err(ConnectorError::Config(_))
        ));
    }
}
