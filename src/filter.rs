//! 规范化后的过滤与元数据模型, 归一化层的输出、where 编译器的输入

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::params::IdParam;

/// 组内条件之间的逻辑连接词; 组与组之间固定使用 or 连接
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Logic::And => "and",
            Logic::Or => "or",
        }
    }
}

/// 单个过滤条件, 过滤树的叶子节点
///
/// 字段无法解析为非空 ID 的条件会在编译阶段被静默丢弃
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Condition {
    pub field: Option<IdParam>,
    pub operator: Option<String>,
    pub value: Option<Value>,
}

impl Condition {
    /// 条件是否携带任何有效内容（字段、操作符或值）
    pub fn is_usable(&self) -> bool {
        self.field.as_ref().map_or(false, |f| !f.resolve().is_empty())
            || self.operator.as_ref().map_or(false, |o| !o.is_empty())
            || self.value.as_ref().map_or(false, |v| !v.is_null())
    }
}

/// 一组条件
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionGroup {
    pub logic: Logic,
    pub conditions: Vec<Condition>,
}

/// 已解析的排序键, 按后端要求以 JSON 形式编码进 sort 查询参数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortField {
    pub direction: String,
    pub field: String,
}

/// 表上的关联字段（LinkToAnotherRecord / Links 列）
#[derive(Debug, Clone, PartialEq)]
pub struct LinkField {
    pub id: String,
    pub title: String,
}

/// 元数据列表中的一项: 后端 ID 加显示名
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
}
