//! Uniform query-result envelope and the operation registry every CLI
//! subcommand is listed under.
//!
//! Grounded on `query.rs`'s `QueryResponse`/`QueryResult` pair: a thin
//! envelope (root/query/top_k) wrapping a typed payload. This generalizes
//! that shape to every analytical operation (hotspots, cycles, coupling,
//! risk, trends, search, ...): `found`, the domain payload flattened in,
//! and a `summary` string for the terminal adapter — so a failure (no
//! graph on disk, target file not in the graph) degrades to a record
//! instead of an error propagating across the query boundary.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct QueryRecord<T: Serialize> {
    pub found: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    pub summary: String,
}

impl<T: Serialize> QueryRecord<T> {
    pub fn found(data: T, summary: impl Into<String>) -> Self {
        Self {
            found: true,
            data: Some(data),
            summary: summary.into(),
        }
    }

    pub fn not_found(summary: impl Into<String>) -> Self {
        Self {
            found: false,
            data: None,
            summary: summary.into(),
        }
    }

    /// No graph has been persisted yet for this root; every CLI operation
    /// that reads the store before doing its own work returns this.
    pub fn not_initialized() -> Self {
        Self::not_found("no graph on disk for this root; run `scan` first")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    String,
    Integer,
    Float,
    Boolean,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
    pub description: &'static str,
}

impl ArgSpec {
    pub const fn required(name: &'static str, kind: ArgKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
        }
    }

    pub const fn optional(name: &'static str, kind: ArgKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub args: &'static [ArgSpec],
}

/// Every analytical operation the CLI and external-protocol adapter
/// expose, described declaratively rather than dispatched through a
/// dynamic feature map: a fixed table of names/args the caller looks up,
/// with the concrete handler resolved by a direct match in `cli.rs`.
pub fn operation_registry() -> &'static [OperationSpec] {
    const FILE_ARG: ArgSpec = ArgSpec::required("file", ArgKind::String, "relative path of the target file");
    const LIMIT_ARG: ArgSpec = ArgSpec::optional("limit", ArgKind::Integer, "maximum results to return");
    const WINDOW_ARG: ArgSpec = ArgSpec::optional("window", ArgKind::String, "day|week|month|all");
    const HORIZON_ARG: ArgSpec = ArgSpec::optional("horizon_days", ArgKind::Integer, "projection horizon in days");
    const QUERY_ARG: ArgSpec = ArgSpec::required("query", ArgKind::String, "search query text");

    static OPERATIONS: &[OperationSpec] = &[
        OperationSpec {
            name: "health",
            description: "overall codebase health score and summary counts",
            args: &[],
        },
        OperationSpec {
            name: "hotspots",
            description: "files ranked by combined complexity and churn",
            args: &[LIMIT_ARG],
        },
        OperationSpec {
            name: "cycles",
            description: "circular import dependencies between files",
            args: &[],
        },
        OperationSpec {
            name: "bus-factor",
            description: "ownership concentration and risk areas",
            args: &[],
        },
        OperationSpec {
            name: "coupling",
            description: "files that historically change together with a target file",
            args: &[FILE_ARG],
        },
        OperationSpec {
            name: "impact",
            description: "direct and indirect dependents of a target file",
            args: &[FILE_ARG],
        },
        OperationSpec {
            name: "risk",
            description: "multi-factor risk score for a target file",
            args: &[FILE_ARG],
        },
        OperationSpec {
            name: "velocity",
            description: "regression over recent complexity and hotspot counts",
            args: &[],
        },
        OperationSpec {
            name: "trajectory",
            description: "forward-projected health score with confidence bands",
            args: &[HORIZON_ARG],
        },
        OperationSpec {
            name: "drift",
            description: "symbols whose signature or location changed since the last snapshot",
            args: &[],
        },
        OperationSpec {
            name: "breaking-changes",
            description: "exported symbols removed or changed since the last snapshot",
            args: &[],
        },
        OperationSpec {
            name: "predict",
            description: "files most likely to need attention next, from trend and risk signals",
            args: &[LIMIT_ARG],
        },
        OperationSpec {
            name: "standup",
            description: "human-readable summary of recent changes for a daily standup",
            args: &[],
        },
        OperationSpec {
            name: "trends",
            description: "trend direction and change percent over a window",
            args: &[WINDOW_ARG],
        },
        OperationSpec {
            name: "search",
            description: "keyword, semantic, or hybrid search over the graph",
            args: &[QUERY_ARG],
        },
        OperationSpec {
            name: "ask",
            description: "natural-language query dispatched to the closest matching operation",
            args: &[QUERY_ARG],
        },
    ];
    OPERATIONS
}

pub fn lookup_operation(name: &str) -> Option<&'static OperationSpec> {
    operation_registry().iter().find(|op| op.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn found_record_carries_flattened_data_and_summary() {
        #[derive(Serialize)]
        struct Payload {
            value: u32,
        }
        let record = QueryRecord::found(Payload { value: 7 }, "ok");
        assert!(record.found);
        assert_eq!(record.summary, "ok");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["value"], 7);
        assert_eq!(json["found"], true);
    }

    #[test]
    fn not_found_record_has_no_flattened_fields() {
        let record: QueryRecord<()> = QueryRecord::not_found("missing");
        assert!(!record.found);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["summary"], "missing");
    }

    #[test]
    fn every_registered_operation_has_a_unique_name() {
        let ops = operation_registry();
        let mut names: Vec<&str> = ops.iter().map(|o| o.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ops.len());
    }

    #[test]
    fn lookup_operation_finds_known_operation() {
        assert!(lookup_operation("hotspots").is_some());
        assert!(lookup_operation("not-a-real-operation").is_none());
    }
}
