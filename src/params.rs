//! 参数形态归一化
//!
//! UI 在演进中为同一语义结构留下了多种编码（字段取值集合、过滤组树），
//! 这里用 untagged 联合逐一枚举每种被接受的形态，并在边界处立即归一化
//! 为唯一的内部表示，后续代码不再做形态探测。
//!
//! ## 字段取值接受的形态
//!
//! ```text
//! 缺省                                  -> 空集合
//! [{field, value}, ...]                 -> 原始条目序列
//! {fieldValues: {field, value}}         -> 包装对象（单条）
//! {fieldValues: [{field, value}, ...]}  -> 包装对象（序列）
//! {field, value}                        -> 单条裸条目
//! ```
//!
//! 序列中的元素本身也可能再包一层 `{fieldValues: 条目}`。
//!
//! ## 过滤组接受的形态
//!
//! ```text
//! [组, ...]            或  {groups: [组, ...]}
//! 组: {logic, conditions}  或  {groups: {logic, conditions}}
//! conditions: [条件, ...]  或  {condition: 条件|[条件, ...]}  或  条件
//! 条件元素: {field, operator, value}  或  {condition: {field, operator, value}}
//! ```

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::filter::{Condition, ConditionGroup, Logic};

/// 选择器 UI 产生的 `{value, id, name}` 对象，或一个裸字符串
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IdParam {
    Selector {
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
    Raw(String),
}

impl IdParam {
    /// 取 value -> id -> name 中第一个非空项；裸字符串原样通过
    pub fn resolve(&self) -> &str {
        match self {
            IdParam::Raw(s) => s,
            IdParam::Selector { value, id, name } => [value, id, name]
                .into_iter()
                .flatten()
                .map(String::as_str)
                .find(|s| !s.is_empty())
                .unwrap_or(""),
        }
    }
}

impl From<&str> for IdParam {
    fn from(s: &str) -> Self {
        IdParam::Raw(s.to_string())
    }
}

/// 解析可选的标识符参数, 缺省解析为空字符串
pub fn resolve_id(param: Option<&IdParam>) -> String {
    param.map(|p| p.resolve().to_string()).unwrap_or_default()
}

/// 单值或序列, 两种 JSON 形态都接受
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// 单条字段取值
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct FieldValueEntry {
    pub field: Option<IdParam>,
    pub value: Option<Value>,
}

/// 序列元素：裸条目，或再包一层 fieldValues 的条目
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValueItem {
    Wrapped {
        #[serde(rename = "fieldValues")]
        field_values: FieldValueEntry,
    },
    Plain(FieldValueEntry),
}

impl FieldValueItem {
    fn entry(&self) -> &FieldValueEntry {
        match self {
            FieldValueItem::Wrapped { field_values } => field_values,
            FieldValueItem::Plain(entry) => entry,
        }
    }
}

/// 字段取值集合接受的全部形态
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValuesParam {
    Entries(Vec<FieldValueItem>),
    Wrapper {
        #[serde(rename = "fieldValues")]
        field_values: OneOrMany<FieldValueItem>,
    },
    Single(FieldValueEntry),
}

/// 把任意形态的字段取值集合压成记录字段映射
///
/// 字段标识先解析为后端字段 ID；空 ID 跳过，同一 ID 首次出现生效、
/// 后续重复丢弃。
pub fn normalize_field_entries(param: Option<&FieldValuesParam>) -> Map<String, Value> {
    let entries: Vec<&FieldValueEntry> = match param {
        None => Vec::new(),
        Some(FieldValuesParam::Entries(items)) => items.iter().map(FieldValueItem::entry).collect(),
        Some(FieldValuesParam::Wrapper { field_values }) => match field_values {
            OneOrMany::Many(items) => items.iter().map(FieldValueItem::entry).collect(),
            OneOrMany::One(item) => vec![item.entry()],
        },
        Some(FieldValuesParam::Single(entry)) => vec![entry],
    };

    let mut fields = Map::new();
    for entry in entries {
        let field_id = resolve_id(entry.field.as_ref());
        if field_id.is_empty() || fields.contains_key(&field_id) {
            continue;
        }
        fields.insert(field_id, entry.value.clone().unwrap_or(Value::Null));
    }
    fields
}

/// 条件元素：裸条件，或再包一层 condition
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConditionItem {
    Wrapped { condition: Condition },
    Plain(Condition),
}

impl ConditionItem {
    fn condition(&self) -> &Condition {
        match self {
            ConditionItem::Wrapped { condition } => condition,
            ConditionItem::Plain(condition) => condition,
        }
    }
}

/// 一个组的 conditions 成员接受的全部形态
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConditionsParam {
    Many(Vec<ConditionItem>),
    Wrapped { condition: OneOrMany<ConditionItem> },
    One(ConditionItem),
}

impl ConditionsParam {
    fn flatten(&self) -> Vec<Condition> {
        match self {
            ConditionsParam::Many(items) => {
                items.iter().map(|i| i.condition().clone()).collect()
            }
            ConditionsParam::Wrapped { condition } => match condition {
                OneOrMany::Many(items) => items.iter().map(|i| i.condition().clone()).collect(),
                OneOrMany::One(item) => vec![item.condition().clone()],
            },
            ConditionsParam::One(item) => vec![item.condition().clone()],
        }
    }
}

/// 组体：逻辑连接词加条件集合
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct GroupBody {
    pub logic: Option<Logic>,
    pub conditions: Option<ConditionsParam>,
}

/// 组元素：裸组体，或再包一层 groups 的组体
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum GroupParam {
    Nested { groups: GroupBody },
    Body(GroupBody),
}

impl GroupParam {
    fn body(&self) -> &GroupBody {
        match self {
            GroupParam::Nested { groups } => groups,
            GroupParam::Body(body) => body,
        }
    }
}

/// 过滤组树接受的两种顶层形态：组数组，或带 groups 成员的对象
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FilterGroupsParam {
    Groups(Vec<GroupParam>),
    Wrapper {
        #[serde(default)]
        groups: Vec<GroupParam>,
    },
}

/// 把任意形态的过滤组树归一化为规范的条件组序列
///
/// 不携带任何字段/操作符/值的条件被丢弃；空组保留（编译阶段再省略）。
pub fn normalize_filter_groups(param: Option<&FilterGroupsParam>) -> Vec<ConditionGroup> {
    let groups = match param {
        None => return Vec::new(),
        Some(FilterGroupsParam::Groups(groups)) => groups,
        Some(FilterGroupsParam::Wrapper { groups }) => groups,
    };

    groups
        .iter()
        .map(|group| {
            let body = group.body();
            let conditions = body
                .conditions
                .as_ref()
                .map(ConditionsParam::flatten)
                .unwrap_or_default()
                .into_iter()
                .filter(Condition::is_usable)
                .collect();
            ConditionGroup {
                logic: body.logic.unwrap_or_default(),
                conditions,
            }
        })
        .collect()
}

/// 旧版单组过滤参数 `filters.conditions`
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct LegacyFilters {
    pub conditions: Vec<Condition>,
}

/// 排序键的原始形态
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SortFieldParam {
    pub field: Option<IdParam>,
    pub direction: Option<String>,
}

/// get/getAll 的附加选项
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordOptions {
    pub fields: Vec<String>,
    pub sort: Option<SortOptions>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub expand_relations: bool,
}

/// 排序选项的包装层
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SortOptions {
    pub sort_fields: Vec<SortFieldParam>,
}

/// 单个批处理项的原始参数
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RowParams {
    pub workspace_id: Option<IdParam>,
    pub base_id: Option<IdParam>,
    pub table_id: Option<IdParam>,
    pub record_id: Option<IdParam>,
    pub fields_collection: Option<FieldValuesParam>,
    pub filter_groups: Option<FilterGroupsParam>,
    pub filters: Option<LegacyFilters>,
    pub return_all: bool,
    pub limit: u64,
    pub record_options: RecordOptions,
}
