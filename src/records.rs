//! Record operations: CRUD and count, the paginated read loop, relation
//! expansion and the sequential batch driver.

use log::debug;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::client::{ApiTransport, NocoDbClient};
use crate::error::ConnectorError;
use crate::filter::{ConditionGroup, LinkField, Logic};
use crate::params::{
    normalize_field_entries, normalize_filter_groups, resolve_id, RowParams,
};
use crate::resolver::{ensure_base_id, ensure_table_id};
use crate::where_compiler::{build_where, encode_sort};

/// The record operations this connector exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Create,
    Update,
    Delete,
    Get,
    GetAll,
    Count,
}

fn records_endpoint(base_id: &str, table_id: &str) -> String {
    format!("/api/v3/data/{base_id}/{table_id}/records")
}

/// Unwrap a write/read response into its record list: `records` when the
/// backend sends an array under that key, the raw response otherwise.
fn response_records(response: Value) -> Vec<Value> {
    match response {
        Value::Object(mut map) if map.get("records").map_or(false, Value::is_array) => {
            match map.remove("records") {
                Some(Value::Array(records)) => records,
                _ => Vec::new(),
            }
        }
        other => vec![other],
    }
}

/// Truthiness of the backend's next-page marker, which has shown up as a
/// URL string, a boolean and a number across versions.
fn has_next_page(response: &Value) -> bool {
    match response.get("next") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.0),
        Some(_) => true,
    }
}

/// Filter groups for read operations: the structured parameter first, the
/// legacy flat condition list (wrapped in one and-group) as fallback.
fn effective_filter_groups(params: &RowParams) -> Vec<ConditionGroup> {
    let groups = normalize_filter_groups(params.filter_groups.as_ref());
    if !groups.is_empty() {
        return groups;
    }
    match &params.filters {
        Some(legacy) if !legacy.conditions.is_empty() => vec![ConditionGroup {
            logic: Logic::And,
            conditions: legacy.conditions.clone(),
        }],
        _ => Vec::new(),
    }
}

/// Pick the link-typed columns out of a table metadata response.
fn pick_links(columns: &[Value]) -> Vec<LinkField> {
    columns
        .iter()
        .filter_map(|col| {
            let kind = col
                .get("uidt")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .or_else(|| col.get("type").and_then(Value::as_str))?;
            if kind != "LinkToAnotherRecord" && kind != "Links" {
                return None;
            }
            let id = col.get("id").and_then(Value::as_str)?.to_string();
            let title = col
                .get("title")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .or_else(|| {
                    col.get("column_name")
                        .and_then(Value::as_str)
                        .filter(|s| !s.is_empty())
                })
                .unwrap_or(id.as_str())
                .to_string();
            Some(LinkField { id, title })
        })
        .collect()
}

fn record_id_of(record: &Value) -> Option<String> {
    match record.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn wrap_item_error(err: ConnectorError, index: usize) -> ConnectorError {
    match err {
        ConnectorError::Validation(msg) => {
            ConnectorError::Validation(format!("item {index}: {msg}"))
        }
        ConnectorError::Transport(msg) => {
            ConnectorError::Transport(format!("item {index}: {msg}"))
        }
        other => other,
    }
}

/// The record API over one configured client.
pub struct RecordsApi<'a, T: ApiTransport> {
    client: &'a NocoDbClient<T>,
}

impl<'a, T: ApiTransport> RecordsApi<'a, T> {
    pub fn new(client: &'a NocoDbClient<T>) -> Self {
        Self { client }
    }

    /// Process a batch strictly sequentially, one item running to completion
    /// (including all of its pagination and expansion round-trips) before the
    /// next starts.
    ///
    /// With `continue_on_fail`, a failed item becomes an
    /// `{"error": …, "item": index}` record and the batch proceeds; otherwise
    /// the first error aborts, wrapped with the item index. Configuration
    /// errors are always fatal.
    pub fn execute_batch(
        &self,
        operation: Operation,
        items: &[RowParams],
        continue_on_fail: bool,
    ) -> Result<Vec<Value>, ConnectorError> {
        let mut output = Vec::new();
        for (index, params) in items.iter().enumerate() {
            match self.execute(operation, params) {
                Ok(mut records) => output.append(&mut records),
                Err(err @ ConnectorError::Config(_)) => return Err(err),
                Err(err) if continue_on_fail => {
                    output.push(json!({ "error": err.to_string(), "item": index }));
                }
                Err(err) => return Err(wrap_item_error(err, index)),
            }
        }
        Ok(output)
    }

    /// Run one operation for one item's parameters.
    pub fn execute(
        &self,
        operation: Operation,
        params: &RowParams,
    ) -> Result<Vec<Value>, ConnectorError> {
        let workspace_id = resolve_id(params.workspace_id.as_ref());
        let base_id = ensure_base_id(
            self.client,
            &resolve_id(params.base_id.as_ref()),
            &workspace_id,
        );
        let table_id = ensure_table_id(self.client, &base_id, &resolve_id(params.table_id.as_ref()));

        match operation {
            Operation::Create => self.create(&base_id, &table_id, params),
            Operation::Update => self.update(&base_id, &table_id, params),
            Operation::Delete => self.delete(&base_id, &table_id, params),
            Operation::Get => self.get(&base_id, &table_id, params),
            Operation::GetAll => self.get_all(&base_id, &table_id, params),
            Operation::Count => self.count(&base_id, &table_id, params),
        }
    }

    fn create(
        &self,
        base_id: &str,
        table_id: &str,
        params: &RowParams,
    ) -> Result<Vec<Value>, ConnectorError> {
        let fields = normalize_field_entries(params.fields_collection.as_ref());
        if fields.is_empty() {
            return Err(ConnectorError::Validation(
                "please add at least one field for create".to_string(),
            ));
        }
        let payload = json!([{ "fields": fields }]);
        let response = self.client.api_request(
            "POST",
            &records_endpoint(base_id, table_id),
            Some(&payload),
            &[],
        )?;
        Ok(response_records(response))
    }

    fn update(
        &self,
        base_id: &str,
        table_id: &str,
        params: &RowParams,
    ) -> Result<Vec<Value>, ConnectorError> {
        let fields = normalize_field_entries(params.fields_collection.as_ref());
        if fields.is_empty() {
            return Err(ConnectorError::Validation(
                "please add at least one field for update".to_string(),
            ));
        }
        let record_id = resolve_id(params.record_id.as_ref());
        if record_id.is_empty() {
            return Err(ConnectorError::Validation(
                "record id is required for update".to_string(),
            ));
        }
        let payload = json!([{ "fields": fields, "id": record_id }]);
        let response = self.client.api_request(
            "PATCH",
            &records_endpoint(base_id, table_id),
            Some(&payload),
            &[],
        )?;
        Ok(response_records(response))
    }

    fn delete(
        &self,
        base_id: &str,
        table_id: &str,
        params: &RowParams,
    ) -> Result<Vec<Value>, ConnectorError> {
        let record_id = resolve_id(params.record_id.as_ref());
        let payload = json!([{ "id": record_id }]);
        let response = self.client.api_request(
            "DELETE",
            &records_endpoint(base_id, table_id),
            Some(&payload),
            &[],
        )?;
        Ok(vec![response])
    }

    fn get(
        &self,
        base_id: &str,
        table_id: &str,
        params: &RowParams,
    ) -> Result<Vec<Value>, ConnectorError> {
        let record_id = resolve_id(params.record_id.as_ref());
        let options = &params.record_options;

        let mut links = Vec::new();
        let mut query: Vec<(String, String)> = Vec::new();
        if options.expand_relations {
            links = self.load_link_fields(base_id, table_id);
            if !links.is_empty() {
                query.push(("include".to_string(), link_titles(&links)));
            }
        }
        if !options.fields.is_empty() {
            query.push(("fields".to_string(), options.fields.join(",")));
        }

        let endpoint = format!("{}/{}", records_endpoint(base_id, table_id), record_id);
        let response = self.client.api_request("GET", &endpoint, None, &query)?;

        if links.is_empty() {
            return Ok(vec![response]);
        }
        let mut records = response_records(response);
        self.expand_links(base_id, table_id, &mut records, &links);
        Ok(records)
    }

    fn get_all(
        &self,
        base_id: &str,
        table_id: &str,
        params: &RowParams,
    ) -> Result<Vec<Value>, ConnectorError> {
        let options = &params.record_options;
        let filter_groups = effective_filter_groups(params);

        let mut links = Vec::new();
        let mut base_query: Vec<(String, String)> = Vec::new();
        if options.expand_relations {
            links = self.load_link_fields(base_id, table_id);
            if !links.is_empty() {
                base_query.push(("include".to_string(), link_titles(&links)));
            }
        }
        if !options.fields.is_empty() {
            base_query.push(("fields".to_string(), options.fields.join(",")));
        }
        if let Some(sort) = options
            .sort
            .as_ref()
            .and_then(|s| encode_sort(&s.sort_fields))
        {
            base_query.push(("sort".to_string(), sort));
        }
        let where_clause = build_where(&filter_groups);
        if !where_clause.is_empty() {
            base_query.push(("where".to_string(), where_clause));
        }

        let limit = params.limit;
        let mut page = options.page.filter(|p| *p > 0).unwrap_or(1);
        let page_size = options.page_size.filter(|p| *p > 0).unwrap_or_else(|| {
            if params.return_all {
                100
            } else {
                let requested = if limit == 0 { 25 } else { limit };
                requested.min(1000)
            }
        });

        let mut records: Vec<Value> = Vec::new();
        let mut has_more = true;
        while has_more {
            let mut query = base_query.clone();
            query.push(("page".to_string(), page.to_string()));
            query.push(("pageSize".to_string(), page_size.to_string()));
            let response = self.client.api_request(
                "GET",
                &records_endpoint(base_id, table_id),
                None,
                &query,
            )?;

            has_more = has_next_page(&response);
            let mut page_records = match response {
                Value::Object(mut map) => match map.remove("records") {
                    Some(Value::Array(page_records)) => page_records,
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            };
            if !links.is_empty() && !page_records.is_empty() {
                self.expand_links(base_id, table_id, &mut page_records, &links);
            }
            records.append(&mut page_records);
            page += 1;

            if !params.return_all && records.len() as u64 >= limit {
                break;
            }
        }
        if !params.return_all && records.len() as u64 > limit {
            records.truncate(limit as usize);
        }
        Ok(records)
    }

    fn count(
        &self,
        base_id: &str,
        table_id: &str,
        params: &RowParams,
    ) -> Result<Vec<Value>, ConnectorError> {
        let filter_groups = effective_filter_groups(params);
        let mut query: Vec<(String, String)> = Vec::new();
        let where_clause = build_where(&filter_groups);
        if !where_clause.is_empty() {
            query.push(("where".to_string(), where_clause));
        }
        let endpoint = format!("/api/v3/data/{base_id}/{table_id}/count");
        let response = self.client.api_request("GET", &endpoint, None, &query)?;
        Ok(vec![response])
    }

    /// Probe the metadata endpoint variants in their fixed order (newer
    /// versioned endpoint first) and return the first non-empty set of
    /// link-typed columns.
    fn load_link_fields(&self, base_id: &str, table_id: &str) -> Vec<LinkField> {
        let endpoints = [
            format!("/api/v3/meta/bases/{base_id}/tables/{table_id}"),
            format!("/api/v3/meta/tables/{table_id}"),
            format!("/api/v1/db/meta/tables/{table_id}"),
        ];
        for endpoint in &endpoints {
            match self.client.api_request("GET", endpoint, None, &[]) {
                Ok(response) => {
                    let columns = response
                        .get("fields")
                        .and_then(Value::as_array)
                        .or_else(|| response.get("columns").and_then(Value::as_array));
                    let links = pick_links(columns.map(Vec::as_slice).unwrap_or(&[]));
                    if !links.is_empty() {
                        debug!(
                            "link discovery via {endpoint} found {} link fields",
                            links.len()
                        );
                        return links;
                    }
                }
                Err(err) => debug!("link discovery via {endpoint} failed: {err}"),
            }
        }
        Vec::new()
    }

    /// Best-effort relation expansion: fetch each link's related records per
    /// record and merge them under the link's display title, dropping a
    /// pre-existing raw-id key when the title differs. Individual failures
    /// are swallowed so the record still comes back with its other data.
    fn expand_links(
        &self,
        base_id: &str,
        table_id: &str,
        records: &mut [Value],
        links: &[LinkField],
    ) {
        for record in records.iter_mut() {
            let Some(record_id) = record_id_of(record) else {
                continue;
            };
            for link in links {
                let endpoint =
                    format!("/api/v3/data/{base_id}/{table_id}/links/{}/{record_id}", link.id);
                let payload = match self.client.api_request("GET", &endpoint, None, &[]) {
                    Ok(Value::Object(mut map)) if map.contains_key("records") => {
                        map.remove("records").unwrap_or(Value::Null)
                    }
                    Ok(other) => other,
                    Err(err) => {
                        debug!(
                            "expansion of link {} on record {record_id} failed: {err}",
                            link.id
                        );
                        continue;
                    }
                };

                let Some(record_obj) = record.as_object_mut() else {
                    continue;
                };
                let fields = record_obj
                    .entry("fields")
                    .or_insert_with(|| Value::Object(Map::new()));
                if !fields.is_object() {
                    *fields = Value::Object(Map::new());
                }
                if let Some(fields) = fields.as_object_mut() {
                    fields.insert(link.title.clone(), payload);
                    if link.title != link.id {
                        fields.remove(&link.id);
                    }
                }
            }
        }
    }
}

fn link_titles(links: &[LinkField]) -> String {
    links
        .iter()
        .map(|l| l.title.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Condition;
    use crate::params::IdParam;

    #[test]
    fn test_response_records_unwraps_records_array() {
        let response = json!({"records": [{"id": "1"}, {"id": "2"}], "next": null});
        let records = response_records(response);
        assert_eq!(records.len(), 2);

        // 没有 records 数组时原样返回
        let response = json!({"id": "1", "fields": {}});
        let records = response_records(response.clone());
        assert_eq!(records, vec![response]);
    }

    #[test]
    fn test_has_next_page_truthiness() {
        assert!(has_next_page(&json!({"next": "/api/v3/...?page=2"})));
        assert!(has_next_page(&json!({"next": true})));
        assert!(has_next_page(&json!({"next": 2})));
        assert!(!has_next_page(&json!({"next": ""})));
        assert!(!has_next_page(&json!({"next": false})));
        assert!(!has_next_page(&json!({"next": null})));
        assert!(!has_next_page(&json!({})));
    }

    #[test]
    fn test_pick_links_filters_by_column_kind() {
        let columns = vec![
            json!({"id": "c1", "title": "Name", "uidt": "SingleLineText"}),
            json!({"id": "c2", "title": "Projects", "uidt": "LinkToAnotherRecord"}),
            json!({"id": "c3", "column_name": "tasks", "type": "Links"}),
            json!({"id": "c4", "uidt": "Links"}),
        ];
        let links = pick_links(&columns);
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].title, "Projects");
        // title 缺省回退到 column_name，再回退到 id
        assert_eq!(links[1].title, "tasks");
        assert_eq!(links[2].title, "c4");
    }

    #[test]
    fn test_effective_filter_groups_legacy_fallback() {
        let legacy = Condition {
            field: Some(IdParam::from("a")),
            operator: Some("eq".to_string()),
            value: Some(json!("1")),
        };
        let params = RowParams {
            filters: Some(crate::params::LegacyFilters {
                conditions: vec![legacy.clone()],
            }),
            ..RowParams::default()
        };
        let groups = effective_filter_groups(&params);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].logic, Logic::And);
        assert_eq!(groups[0].conditions, vec![legacy.clone()]);

        // 结构化参数优先于旧版参数
        let params = RowParams {
            filter_groups: serde_json::from_value(json!([
                {"logic": "or", "conditions": [{"field": "b", "value": "2"}]}
            ]))
            .ok(),
            filters: Some(crate::params::LegacyFilters {
                conditions: vec![legacy],
            }),
            ..RowParams::default()
        };
        let groups = effective_filter_groups(&params);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].logic, Logic::Or);
    }
}
