use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::catalog::Tables;
use crate::graph::{EdgeKind, KnowledgeGraph, NodeKey};
use crate::types::TableKind;

const MAX_FINDINGS: usize = 32;

/// Indicates the severity level of a verification finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifySeverity {
    /// Allowed state worth knowing about, such as a model with no technology.
    Warning,
    /// Broken integrity between tables or between tables and graph.
    Error,
}

/// A single issue discovered during verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerifyFinding {
    /// How serious the issue is.
    pub severity: VerifySeverity,
    /// Human-readable description.
    pub message: String,
}

/// Row and graph counts observed while verifying.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VerifyCounts {
    /// Series rows.
    pub series: usize,
    /// Tech rows.
    pub techs: usize,
    /// Model rows.
    pub models: usize,
    /// Association rows.
    pub associations: usize,
    /// Graph nodes.
    pub nodes: usize,
    /// Graph edges.
    pub edges: usize,
}

/// Result of [`Store::verify`](super::Store::verify).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// True when no error-level finding was recorded.
    pub success: bool,
    /// Issues found, capped at a few dozen.
    pub findings: Vec<VerifyFinding>,
    /// What was examined.
    pub counts: VerifyCounts,
}

struct Findings(Vec<VerifyFinding>);

impl Findings {
    fn push(&mut self, severity: VerifySeverity, message: String) {
        if self.0.len() < MAX_FINDINGS {
            self.0.push(VerifyFinding { severity, message });
        }
    }

    fn error(&mut self, message: String) {
        self.push(VerifySeverity::Error, message);
    }

    fn warning(&mut self, message: String) {
        self.push(VerifySeverity::Warning, message);
    }
}

pub(crate) fn verify(tables: &Tables, graph: &KnowledgeGraph) -> VerifyReport {
    let mut findings = Findings(Vec::new());
    let counts = VerifyCounts {
        series: tables.len(TableKind::Series),
        techs: tables.len(TableKind::Tech),
        models: tables.len(TableKind::Model),
        associations: tables.len(TableKind::ModelTech),
        nodes: graph.node_count(),
        edges: graph.edge_count(),
    };

    let mut bound_models = FxHashSet::default();
    let mut seen_pairs = FxHashSet::default();
    for row in tables.associations() {
        bound_models.insert(row.model_id);
        if !seen_pairs.insert((row.model_id, row.tech_id)) {
            findings.error(format!(
                "duplicate association {} for model {} and tech {}",
                row.id, row.model_id, row.tech_id
            ));
        }
        if tables.model(row.model_id).is_none() {
            findings.error(format!(
                "association {} references missing model {}",
                row.id, row.model_id
            ));
        }
        if tables.tech(row.tech_id).is_none() {
            findings.error(format!(
                "association {} references missing tech {}",
                row.id, row.tech_id
            ));
        }
    }

    for series in tables.all_series() {
        let key = NodeKey::series(series.id);
        match graph.node(key) {
            Some(node) if node.label == series.name => {}
            Some(node) => findings.error(format!(
                "node {key} is labelled '{}' but the series is named '{}'",
                node.label, series.name
            )),
            None => findings.error(format!("series {} has no graph node", series.id)),
        }
    }
    for tech in tables.all_techs() {
        if !graph.contains(NodeKey::tech(tech.id)) {
            findings.error(format!("tech {} has no graph node", tech.id));
        }
    }
    for model in tables.all_models() {
        let key = NodeKey::model(model.id);
        if tables.series(model.series_id).is_none() {
            findings.error(format!(
                "model {} references missing series {}",
                model.id, model.series_id
            ));
        }
        if !graph.contains(key) {
            findings.error(format!("model {} has no graph node", model.id));
            continue;
        }
        let owners = graph.neighbors_by_type(key, EdgeKind::BelongsTo);
        if owners != [NodeKey::series(model.series_id)] {
            findings.error(format!(
                "model {} should have exactly one belongs_to edge to series {}, found {}",
                model.id,
                model.series_id,
                owners.len()
            ));
        }
        if !bound_models.contains(&model.id) {
            findings.warning(format!("model {} ('{}') has no technology", model.id, model.name));
        }
    }

    let expected_nodes = counts.series + counts.techs + counts.models + 1;
    if counts.nodes != expected_nodes {
        findings.error(format!(
            "graph has {} nodes, expected {expected_nodes}",
            counts.nodes
        ));
    }
    let expected_edges = counts.series + counts.models + counts.associations;
    if counts.edges != expected_edges {
        findings.error(format!(
            "graph has {} edges, expected {expected_edges}",
            counts.edges
        ));
    }

    let findings = findings.0;
    VerifyReport {
        success: findings
            .iter()
            .all(|finding| finding.severity != VerifySeverity::Error),
        findings,
        counts,
    }
}
