//! NocoDB 连接器：把结构化的过滤树编译为 NocoDB 专有的查询语法，
//! 归一化多代 UI 参数形态，解析人类可读标识符，并驱动分页读取与
//! 关联字段展开。

pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod params;
pub mod records;
pub mod resolver;
pub mod where_compiler;

pub use client::{ApiTransport, HttpTransport, NocoDbClient};
pub use config::{AuthMethod, ConnectorConfig};
pub use error::ConnectorError;
pub use records::{Operation, RecordsApi};
