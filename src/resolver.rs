//! Identifier resolution: metadata loaders plus the probe-then-match-by-name
//! strategy shared by bases and tables.
//!
//! Resolution never fails. A candidate that neither probes successfully nor
//! matches a display name passes through unchanged, and the subsequent data
//! request surfaces the backend's own "not found" error.

use log::debug;
use serde_json::Value;

use crate::client::{ApiTransport, NocoDbClient};
use crate::error::ConnectorError;
use crate::filter::EntityRef;

fn list_items(response: &Value) -> &[Value] {
    response
        .get("list")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn str_prop<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str).filter(|s| !s.is_empty()))
}

/// Read one metadata listing item; display name falls back through the given
/// name keys to the id itself.
fn entity_from_item(item: &Value, name_keys: &[&str]) -> Option<EntityRef> {
    let id = str_prop(item, &["id"])?.to_string();
    let name = str_prop(item, name_keys).unwrap_or(&id).to_string();
    Some(EntityRef { id, name })
}

fn collect_entities(response: &Value, name_keys: &[&str]) -> Vec<EntityRef> {
    list_items(response)
        .iter()
        .filter_map(|item| entity_from_item(item, name_keys))
        .collect()
}

/// List workspaces. OSS instances without the workspace API fall back to the
/// default `nc` workspace.
pub fn load_workspaces<T: ApiTransport>(client: &NocoDbClient<T>) -> Vec<EntityRef> {
    match client.api_request("GET", "/api/v3/meta/workspaces", None, &[]) {
        Ok(response) => {
            let results = collect_entities(&response, &["title"]);
            if results.is_empty() {
                default_workspaces()
            } else {
                results
            }
        }
        Err(err) => {
            debug!("workspace listing unavailable, assuming OSS default: {err}");
            default_workspaces()
        }
    }
}

fn default_workspaces() -> Vec<EntityRef> {
    vec![EntityRef {
        id: "nc".to_string(),
        name: "Default Workspace (nc)".to_string(),
    }]
}

/// List bases: the workspace-scoped v3 endpoint when a workspace id is given
/// (failures ignored), then the v1 projects listing.
pub fn load_bases<T: ApiTransport>(
    client: &NocoDbClient<T>,
    workspace_id: &str,
) -> Result<Vec<EntityRef>, ConnectorError> {
    if !workspace_id.is_empty() {
        let endpoint = format!("/api/v3/meta/workspaces/{workspace_id}/bases");
        match client.api_request("GET", &endpoint, None, &[]) {
            Ok(response) => return Ok(collect_entities(&response, &["title"])),
            Err(err) => {
                debug!("workspace-scoped base listing failed, falling back to projects: {err}")
            }
        }
    }
    let response = client.api_request("GET", "/api/v1/db/meta/projects", None, &[])?;
    Ok(collect_entities(&response, &["title"]))
}

/// List tables of a base: v3 first, then the v1 meta endpoint when v3 fails
/// or returns nothing.
pub fn load_tables<T: ApiTransport>(
    client: &NocoDbClient<T>,
    base_id: &str,
) -> Result<Vec<EntityRef>, ConnectorError> {
    if base_id.is_empty() {
        return Ok(Vec::new());
    }
    let endpoint = format!("/api/v3/meta/bases/{base_id}/tables");
    match client.api_request("GET", &endpoint, None, &[]) {
        Ok(response) => {
            let tables = collect_entities(&response, &["title", "table_name"]);
            if !tables.is_empty() {
                return Ok(tables);
            }
        }
        Err(err) => debug!("v3 table listing for base {base_id} failed: {err}"),
    }
    let endpoint = format!("/api/v1/db/meta/projects/{base_id}/tables");
    let response = client.api_request("GET", &endpoint, None, &[])?;
    Ok(collect_entities(&response, &["title", "table_name"]))
}

/// Probe the candidate id directly; if the probe fails, list the entities and
/// match display names case-insensitively. No match returns the candidate
/// unchanged.
fn resolve_entity_id<T, F>(
    client: &NocoDbClient<T>,
    candidate: &str,
    probe_endpoint: &str,
    list: F,
) -> String
where
    T: ApiTransport,
    F: FnOnce() -> Result<Vec<EntityRef>, ConnectorError>,
{
    if client
        .api_request("GET", probe_endpoint, None, &[])
        .is_ok()
    {
        return candidate.to_string();
    }
    match list() {
        Ok(items) => {
            let wanted = candidate.to_lowercase();
            if let Some(found) = items.iter().find(|i| i.name.to_lowercase() == wanted) {
                return found.id.clone();
            }
        }
        Err(err) => debug!("name lookup for {candidate} failed: {err}"),
    }
    candidate.to_string()
}

/// Resolve a base identifier to its canonical id, accepting a display name.
pub fn ensure_base_id<T: ApiTransport>(
    client: &NocoDbClient<T>,
    base_id: &str,
    workspace_id: &str,
) -> String {
    if base_id.is_empty() {
        return String::new();
    }
    let probe = format!("/api/v1/db/meta/projects/{base_id}");
    resolve_entity_id(client, base_id, &probe, || load_bases(client, workspace_id))
}

/// Resolve a table identifier to its canonical id, accepting a display name.
/// Without a base id there is nothing to probe or list against.
pub fn ensure_table_id<T: ApiTransport>(
    client: &NocoDbClient<T>,
    base_id: &str,
    table_id: &str,
) -> String {
    if table_id.is_empty() || base_id.is_empty() {
        return table_id.to_string();
    }
    let probe = format!("/api/v3/meta/bases/{base_id}/tables/{table_id}");
    resolve_entity_id(client, table_id, &probe, || load_tables(client, base_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectorConfig;
    use serde_json::json;

    enum Script {
        Always(Value),
        Fail,
    }

    struct ScriptedTransport(Script);

    impl ApiTransport for ScriptedTransport {
        fn request(
            &self,
            _method: &str,
            _url: &str,
            _headers: &[(String, String)],
            _query: &[(String, String)],
            _body: Option<&Value>,
        ) -> Result<Value, ConnectorError> {
            match &self.0 {
                Script::Always(v) => Ok(v.clone()),
                Script::Fail => Err(ConnectorError::Transport("503".to_string())),
            }
        }
    }

    fn client(script: Script) -> NocoDbClient<ScriptedTransport> {
        NocoDbClient::with_transport(
            ConnectorConfig::with_token("https://nc.test", "tok"),
            ScriptedTransport(script),
        )
    }

    #[test]
    fn test_load_workspaces_falls_back_to_oss_default() {
        // 端点不可用（OSS 实例）时回退到默认工作区
        let workspaces = load_workspaces(&client(Script::Fail));
        assert_eq!(workspaces.len(), 1);
        assert_eq!(workspaces[0].id, "nc");

        // 空列表同样回退
        let workspaces = load_workspaces(&client(Script::Always(json!({"list": []}))));
        assert_eq!(workspaces[0].id, "nc");
    }

    #[test]
    fn test_load_workspaces_collects_entities() {
        let response = json!({"list": [
            {"id": "ws1", "title": "Main"},
            {"id": "ws2", "title": ""},
            {"title": "no id, skipped"}
        ]});
        let workspaces = load_workspaces(&client(Script::Always(response)));
        assert_eq!(workspaces.len(), 2);
        assert_eq!(workspaces[0].name, "Main");
        // 显示名为空时回退到 ID 本身
        assert_eq!(workspaces[1].name, "ws2");
    }
}
