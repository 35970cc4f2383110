use anyhow::Result;
use serde_json::json;

use nocodb_connector::config::ConnectorConfig;
use nocodb_connector::params::{
    normalize_field_entries, normalize_filter_groups, FieldValuesParam, FilterGroupsParam,
};
use nocodb_connector::where_compiler::{build_where, map_operator_and_value};

/// 加载连接器配置，优先使用JSON配置文件，失败时使用默认配置
fn load_config() -> ConnectorConfig {
    match ConnectorConfig::from_json_file("nocodb_config.json") {
        Ok(config) => {
            println!("✅ 成功从JSON配置文件加载连接器配置");
            config
        }
        Err(e) => {
            println!("⚠️ 无法加载JSON配置文件 ({}), 使用默认配置", e);
            ConnectorConfig::default()
        }
    }
}

fn main() -> Result<()> {
    println!("--- NocoDB Connector: 过滤树到 where 子句编译器 ---");

    // 显示当前使用的连接配置
    println!("\n[配置信息]:");
    let config = load_config();
    println!("  host: {}", config.base_url());
    println!("  认证方式: {:?}", config.auth_method);

    // 1. 示例过滤组（UI 产生的结构化形态）
    let raw_groups = json!({
        "groups": [
            {
                "logic": "and",
                "conditions": [
                    {"field": "status", "operator": "anyof", "value": "Open,InProgress"},
                    {"field": "priority", "operator": "gt", "value": "2"}
                ]
            },
            {
                "logic": "and",
                "conditions": {"condition": {"field": "assignee", "operator": "is", "value": ""}}
            }
        ]
    });
    println!("\n[输入参数]:\n{}\n", serde_json::to_string_pretty(&raw_groups)?);

    // 2. 参数归一化 - 把历史形态压成规范的条件组
    println!("[步骤 1]: 归一化过滤组参数...");
    let param: FilterGroupsParam = serde_json::from_value(raw_groups)?;
    let groups = normalize_filter_groups(Some(&param));
    println!("✓ 归一化出 {} 个条件组", groups.len());

    // 3. where 编译器 - 生成后端查询语法
    println!("\n[步骤 2]: 编译 where 子句...");
    let where_clause = build_where(&groups);
    println!("✅ 成功编译");
    println!("\n[生成的 where 子句]:\n{}", where_clause);

    // 4. 操作符映射演示
    println!("\n[步骤 3]: 操作符映射演示...");
    for (op, value) in [
        ("contains", json!("plan")),
        ("btw", json!("1,9,7")),
        ("not", json!("closed")),
        ("无效操作符", json!("x")),
    ] {
        let mapped = map_operator_and_value(op, Some(&value));
        println!("  {} {:?} -> {} {:?}", op, value, mapped.op, mapped.values);
    }

    // 5. 字段取值归一化演示
    demonstrate_field_value_shapes()?;

    Ok(())
}

fn demonstrate_field_value_shapes() -> Result<()> {
    println!("\n--- 字段取值形态归一化演示 ---");

    // 同一逻辑条目的四种历史编码
    let shapes = [
        json!([{"field": "Title", "value": "Release Plan"}]),
        json!({"field": "Title", "value": "Release Plan"}),
        json!({"fieldValues": {"field": "Title", "value": "Release Plan"}}),
        json!({"fieldValues": [{"field": "Title", "value": "Release Plan"}]}),
    ];

    for (i, shape) in shapes.iter().enumerate() {
        let param: FieldValuesParam = serde_json::from_value(shape.clone())?;
        let fields = normalize_field_entries(Some(&param));
        println!("形态 {}: {} -> {}", i + 1, shape, json!(fields));
    }

    Ok(())
}
