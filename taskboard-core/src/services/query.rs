//! Query plan building - dynamic list-endpoint parameters
//!
//! Translates loosely-typed filter/sort/pagination query parameters into a
//! bounded [`QueryPlan`]. Parsing is total: a malformed sub-parameter never
//! fails the request, it degrades to that parameter's default. Callers rely
//! on this permissiveness, so it must be preserved.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

/// Which entity collection a plan targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Task,
    User,
}

/// Whether the plan fetches documents or counts them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Fetch,
    Count,
}

/// Sort direction for one sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Field projection applied to returned documents
///
/// Inclusion wins when a projection object mixes truthy and falsy values;
/// the `id` field is always retained in inclusion mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    All,
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl Projection {
    /// Apply the projection to a serialized document
    pub fn apply(&self, doc: JsonValue) -> JsonValue {
        let JsonValue::Object(mut fields) = doc else {
            return doc;
        };
        match self {
            Self::All => JsonValue::Object(fields),
            Self::Include(keep) => {
                fields.retain(|key, _| key == "id" || keep.iter().any(|k| k == key));
                JsonValue::Object(fields)
            }
            Self::Exclude(drop) => {
                fields.retain(|key, _| !drop.iter().any(|k| k == key));
                JsonValue::Object(fields)
            }
        }
    }
}

/// A bounded, validated description of one list query
///
/// The filter is a set of top-level field equality predicates; operator
/// objects are compared literally. This deliberately bounds the feature
/// set instead of passing raw untyped structures through to the store.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub filter: Vec<(String, JsonValue)>,
    pub projection: Projection,
    pub sort: Vec<(String, SortDirection)>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub mode: QueryMode,
}

impl QueryPlan {
    /// True when the document satisfies every equality predicate
    pub fn matches(&self, doc: &JsonValue) -> bool {
        self.filter.iter().all(|(field, expected)| {
            doc.get(field).unwrap_or(&JsonValue::Null) == expected
        })
    }

    /// Filter, sort and page a serialized collection, leaving projection
    /// to the caller (count mode needs the bounded set un-projected).
    pub fn select_documents(&self, docs: Vec<JsonValue>) -> Vec<JsonValue> {
        let mut selected: Vec<JsonValue> =
            docs.into_iter().filter(|d| self.matches(d)).collect();

        if !self.sort.is_empty() {
            selected.sort_by(|a, b| self.compare(a, b));
        }

        let skip = self.skip.map_or(0, |s| s.max(0)) as usize;
        let mut selected: Vec<JsonValue> = selected.into_iter().skip(skip).collect();
        if let Some(limit) = self.limit {
            selected.truncate(limit.max(0) as usize);
        }
        selected
    }

    /// Execute the plan over a serialized collection, projection included
    pub fn run(&self, docs: Vec<JsonValue>) -> Vec<JsonValue> {
        self.select_documents(docs)
            .into_iter()
            .map(|d| self.projection.apply(d))
            .collect()
    }

    /// Count mode: filter, then apply the skip/limit bounds to the count
    pub fn run_count(&self, docs: Vec<JsonValue>) -> u64 {
        self.select_documents(docs).len() as u64
    }

    fn compare(&self, a: &JsonValue, b: &JsonValue) -> Ordering {
        for (field, direction) in &self.sort {
            let left = a.get(field).unwrap_or(&JsonValue::Null);
            let right = b.get(field).unwrap_or(&JsonValue::Null);
            let ord = compare_values(left, right);
            let ord = match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

/// Total order over JSON values for sorting: null < bool < number < string
/// < array < object; numbers compare as f64, arrays and objects by their
/// JSON text.
fn compare_values(a: &JsonValue, b: &JsonValue) -> Ordering {
    fn rank(v: &JsonValue) -> u8 {
        match v {
            JsonValue::Null => 0,
            JsonValue::Bool(_) => 1,
            JsonValue::Number(_) => 2,
            JsonValue::String(_) => 3,
            JsonValue::Array(_) => 4,
            JsonValue::Object(_) => 5,
        }
    }
    match (a, b) {
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        (JsonValue::Number(x), JsonValue::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        _ if rank(a) != rank(b) => rank(a).cmp(&rank(b)),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Raw list-endpoint query parameters, as received on the wire
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub r#where: Option<String>,
    pub select: Option<String>,
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub skip: Option<String>,
    pub limit: Option<String>,
    pub count: Option<String>,
}

impl ListParams {
    /// Build params from decoded query-string pairs; later keys win
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let value = value.into();
            match key.as_ref() {
                "where" => params.r#where = Some(value),
                "select" => params.select = Some(value),
                "filter" => params.filter = Some(value),
                "sort" => params.sort = Some(value),
                "skip" => params.skip = Some(value),
                "limit" => params.limit = Some(value),
                "count" => params.count = Some(value),
                _ => {}
            }
        }
        params
    }
}

/// Outcome of a list operation: documents or a bounded count
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ListResult {
    Count(u64),
    Documents(Vec<JsonValue>),
}

/// Builds [`QueryPlan`] values from raw parameters
#[derive(Debug, Clone)]
pub struct QueryPlanBuilder {
    default_task_limit: i64,
}

impl QueryPlanBuilder {
    pub fn new(default_task_limit: i64) -> Self {
        Self { default_task_limit }
    }

    /// Parse raw parameters into a plan. Never fails: each malformed
    /// sub-parameter independently falls back to its default.
    pub fn build(&self, kind: EntityKind, params: &ListParams) -> QueryPlan {
        let filter = parse_object(params.r#where.as_deref())
            .unwrap_or_default()
            .into_iter()
            .collect();

        // `select` is consulted first; when absent or unparseable the
        // legacy `filter` parameter is consulted instead.
        let projection_obj = parse_object(params.select.as_deref())
            .or_else(|| parse_object(params.filter.as_deref()))
            .unwrap_or_default();
        let projection = build_projection(&projection_obj);

        let sort = parse_object(params.sort.as_deref())
            .unwrap_or_default()
            .into_iter()
            .map(|(field, value)| (field, sort_direction(&value)))
            .collect();

        let skip = parse_numeric(params.skip.as_deref());

        // Only a fully omitted limit triggers the Task default; an
        // explicit 0 (or any parseable value) is preserved literally.
        let limit = match (&params.limit, kind) {
            (None, EntityKind::Task) => Some(self.default_task_limit),
            (raw, _) => parse_numeric(raw.as_deref()),
        };

        let mode = if params
            .count
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case("true"))
        {
            QueryMode::Count
        } else {
            QueryMode::Fetch
        };

        QueryPlan {
            filter,
            projection,
            sort,
            skip,
            limit,
            mode,
        }
    }
}

/// Parse a JSON object parameter; absent, malformed or non-object input
/// yields None so the caller can pick the fallback.
fn parse_object(raw: Option<&str>) -> Option<Map<String, JsonValue>> {
    match serde_json::from_str(raw?) {
        Ok(JsonValue::Object(map)) => Some(map),
        _ => None,
    }
}

/// Parse a numeric parameter; unparseable or non-finite input is unset.
fn parse_numeric(raw: Option<&str>) -> Option<i64> {
    let value: f64 = raw?.trim().parse().ok()?;
    value.is_finite().then_some(value as i64)
}

fn build_projection(obj: &Map<String, JsonValue>) -> Projection {
    let mut include = Vec::new();
    let mut exclude = Vec::new();
    for (field, value) in obj {
        if is_truthy(value) {
            include.push(field.clone());
        } else {
            exclude.push(field.clone());
        }
    }
    if !include.is_empty() {
        Projection::Include(include)
    } else if !exclude.is_empty() {
        Projection::Exclude(exclude)
    } else {
        Projection::All
    }
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn sort_direction(value: &JsonValue) -> SortDirection {
    match value.as_f64() {
        Some(n) if n > 0.0 => SortDirection::Ascending,
        _ => SortDirection::Descending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builder() -> QueryPlanBuilder {
        QueryPlanBuilder::new(100)
    }

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        ListParams::from_pairs(pairs.iter().map(|(k, v)| (*k, v.to_string())))
    }

    #[test]
    fn test_empty_params_defaults() {
        let plan = builder().build(EntityKind::User, &ListParams::default());
        assert!(plan.filter.is_empty());
        assert_eq!(plan.projection, Projection::All);
        assert!(plan.sort.is_empty());
        assert_eq!(plan.skip, None);
        assert_eq!(plan.limit, None);
        assert_eq!(plan.mode, QueryMode::Fetch);
    }

    #[test]
    fn test_task_default_limit_only_when_omitted() {
        let plan = builder().build(EntityKind::Task, &ListParams::default());
        assert_eq!(plan.limit, Some(100));

        // Explicit zero is preserved, not replaced by the default
        let plan = builder().build(EntityKind::Task, &params(&[("limit", "0")]));
        assert_eq!(plan.limit, Some(0));

        // Present-but-malformed stays unset
        let plan = builder().build(EntityKind::Task, &params(&[("limit", "abc")]));
        assert_eq!(plan.limit, None);

        // Users get no default
        let plan = builder().build(EntityKind::User, &ListParams::default());
        assert_eq!(plan.limit, None);
    }

    #[test]
    fn test_malformed_where_degrades_to_no_filter() {
        let plan = builder().build(EntityKind::Task, &params(&[("where", "{not json")]));
        assert!(plan.filter.is_empty());

        // Non-object JSON also degrades
        let plan = builder().build(EntityKind::Task, &params(&[("where", "5")]));
        assert!(plan.filter.is_empty());
    }

    #[test]
    fn test_where_equality_filter() {
        let plan = builder().build(
            EntityKind::Task,
            &params(&[("where", r#"{"completed":false}"#)]),
        );
        assert_eq!(plan.filter, vec![("completed".to_string(), json!(false))]);
    }

    #[test]
    fn test_select_takes_precedence_over_filter() {
        let plan = builder().build(
            EntityKind::Task,
            &params(&[("select", r#"{"name":1}"#), ("filter", r#"{"completed":1}"#)]),
        );
        assert_eq!(plan.projection, Projection::Include(vec!["name".to_string()]));
    }

    #[test]
    fn test_malformed_select_falls_back_to_filter() {
        let plan = builder().build(
            EntityKind::Task,
            &params(&[("select", "{oops"), ("filter", r#"{"completed":1}"#)]),
        );
        assert_eq!(
            plan.projection,
            Projection::Include(vec!["completed".to_string()])
        );
    }

    #[test]
    fn test_exclusion_projection() {
        let plan = builder().build(
            EntityKind::User,
            &params(&[("select", r#"{"pendingTasks":0}"#)]),
        );
        assert_eq!(
            plan.projection,
            Projection::Exclude(vec!["pendingTasks".to_string()])
        );
    }

    #[test]
    fn test_projection_apply() {
        let doc = json!({"id": "t1", "name": "A", "completed": false});

        let inc = Projection::Include(vec!["name".to_string()]);
        assert_eq!(inc.apply(doc.clone()), json!({"id": "t1", "name": "A"}));

        let exc = Projection::Exclude(vec!["completed".to_string()]);
        assert_eq!(exc.apply(doc.clone()), json!({"id": "t1", "name": "A"}));

        assert_eq!(Projection::All.apply(doc.clone()), doc);
    }

    #[test]
    fn test_sort_directions() {
        let plan = builder().build(
            EntityKind::Task,
            &params(&[("sort", r#"{"name":1,"deadline":-1}"#)]),
        );
        assert!(plan
            .sort
            .contains(&("name".to_string(), SortDirection::Ascending)));
        assert!(plan
            .sort
            .contains(&("deadline".to_string(), SortDirection::Descending)));
    }

    #[test]
    fn test_skip_limit_parsing() {
        let plan = builder().build(EntityKind::User, &params(&[("skip", "5"), ("limit", "10")]));
        assert_eq!(plan.skip, Some(5));
        assert_eq!(plan.limit, Some(10));

        let plan = builder().build(EntityKind::User, &params(&[("skip", "NaN")]));
        assert_eq!(plan.skip, None);
    }

    #[test]
    fn test_count_flag() {
        for raw in ["true", "TRUE", "True"] {
            let plan = builder().build(EntityKind::User, &params(&[("count", raw)]));
            assert_eq!(plan.mode, QueryMode::Count);
        }
        let plan = builder().build(EntityKind::User, &params(&[("count", "yes")]));
        assert_eq!(plan.mode, QueryMode::Fetch);
    }

    #[test]
    fn test_run_filters_sorts_and_pages() {
        let docs = vec![
            json!({"id": "1", "name": "c", "completed": false}),
            json!({"id": "2", "name": "a", "completed": false}),
            json!({"id": "3", "name": "b", "completed": true}),
            json!({"id": "4", "name": "b", "completed": false}),
        ];
        let plan = builder().build(
            EntityKind::Task,
            &params(&[
                ("where", r#"{"completed":false}"#),
                ("sort", r#"{"name":1}"#),
                ("skip", "1"),
                ("limit", "1"),
            ]),
        );
        let out = plan.run(docs);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], json!("4"));
    }

    #[test]
    fn test_count_honors_bounds() {
        let docs: Vec<JsonValue> = (0..10).map(|i| json!({"id": i.to_string()})).collect();

        let plan = builder().build(EntityKind::User, &params(&[("count", "true")]));
        assert_eq!(plan.run_count(docs.clone()), 10);

        let plan = builder().build(
            EntityKind::User,
            &params(&[("count", "true"), ("skip", "4"), ("limit", "3")]),
        );
        assert_eq!(plan.run_count(docs), 3);
    }
}
