use crate::graph::{Graph, Node, NodeConfig, NodeKind};
use crate::resolver::UpstreamResolver;
use ahash::AHashSet;
use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Something wrong, or suspicious, about a workflow graph.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueKind {
    MissingStart,
    MultipleStarts { count: usize },
    MissingEnd,
    DanglingEdge { edge_id: String, missing: String },
    SelfLoop { edge_id: String },
    DuplicateEdge { edge_id: String },
    InputsOnStart,
    OutputsOnEnd,
    DuplicateOutput { name: String },
    UnboundInput { name: String },
    MalformedBinding { name: String, reference: String },
    UnreachableBinding { name: String, reference: String },
    TemperatureOutOfRange { value: f64 },
    MissingKnowledgeBase,
    MissingTool,
}

impl IssueKind {
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::MissingEnd
            | IssueKind::SelfLoop { .. }
            | IssueKind::DuplicateEdge { .. }
            | IssueKind::UnboundInput { .. }
            | IssueKind::MissingKnowledgeBase
            | IssueKind::MissingTool => Severity::Warning,
            IssueKind::MissingStart
            | IssueKind::MultipleStarts { .. }
            | IssueKind::DanglingEdge { .. }
            | IssueKind::InputsOnStart
            | IssueKind::OutputsOnEnd
            | IssueKind::DuplicateOutput { .. }
            | IssueKind::MalformedBinding { .. }
            | IssueKind::UnreachableBinding { .. }
            | IssueKind::TemperatureOutOfRange { .. } => Severity::Error,
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::MissingStart => write!(f, "the workflow has no start node"),
            IssueKind::MultipleStarts { count } => {
                write!(f, "the workflow has {} start nodes", count)
            }
            IssueKind::MissingEnd => write!(f, "the workflow has no end node"),
            IssueKind::DanglingEdge { edge_id, missing } => {
                write!(f, "edge '{}' references unknown node '{}'", edge_id, missing)
            }
            IssueKind::SelfLoop { edge_id } => write!(f, "edge '{}' connects a node to itself", edge_id),
            IssueKind::DuplicateEdge { edge_id } => {
                write!(f, "edge '{}' duplicates an existing connection", edge_id)
            }
            IssueKind::InputsOnStart => write!(f, "start nodes take no input parameters"),
            IssueKind::OutputsOnEnd => write!(f, "end nodes produce no output parameters"),
            IssueKind::DuplicateOutput { name } => {
                write!(f, "output parameter '{}' is declared more than once", name)
            }
            IssueKind::UnboundInput { name } => {
                write!(f, "input parameter '{}' is not bound to a source", name)
            }
            IssueKind::MalformedBinding { name, reference } => write!(
                f,
                "input parameter '{}' has a malformed source '{}'",
                name, reference
            ),
            IssueKind::UnreachableBinding { name, reference } => write!(
                f,
                "input parameter '{}' is bound to '{}', which is not produced upstream",
                name, reference
            ),
            IssueKind::TemperatureOutOfRange { value } => {
                write!(f, "temperature {} is outside 0..=2", value)
            }
            IssueKind::MissingKnowledgeBase => write!(f, "no knowledge base selected"),
            IssueKind::MissingTool => write!(f, "no tool selected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub node_id: Option<String>,
    pub kind: IssueKind,
}

impl Issue {
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity() {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.node_id {
            Some(node_id) => write!(f, "{} [{}]: {}", level, node_id, self.kind),
            None => write!(f, "{}: {}", level, self.kind),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    /// True when there are no errors. Warnings do not block a save.
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity() == Severity::Warning)
    }

    /// Issues attached to one node.
    pub fn for_node<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Issue> + 'a {
        self.issues
            .iter()
            .filter(move |i| i.node_id.as_deref() == Some(node_id))
    }

    fn push(&mut self, node_id: Option<&str>, kind: IssueKind) {
        self.issues.push(Issue {
            node_id: node_id.map(str::to_string),
            kind,
        });
    }
}

/// Checks a graph for structural and binding problems.
pub fn validate(graph: &Graph) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_terminals(graph, &mut report);
    check_edges(graph, &mut report);

    let resolver = UpstreamResolver::new(graph);
    for node in graph.nodes() {
        check_params(node, &mut report);
        check_config(node, &mut report);
        check_bindings(node, &resolver, &mut report);
    }
    report
}

fn check_terminals(graph: &Graph, report: &mut ValidationReport) {
    let starts = graph
        .nodes()
        .iter()
        .filter(|n| n.kind() == NodeKind::Start)
        .count();
    match starts {
        0 => report.push(None, IssueKind::MissingStart),
        1 => {}
        count => report.push(None, IssueKind::MultipleStarts { count }),
    }
    if !graph.nodes().iter().any(|n| n.kind() == NodeKind::End) {
        report.push(None, IssueKind::MissingEnd);
    }
}

fn check_edges(graph: &Graph, report: &mut ValidationReport) {
    let mut seen = AHashSet::new();
    for edge in graph.edges() {
        for endpoint in [&edge.source, &edge.target] {
            if !graph.contains(endpoint) {
                report.push(
                    None,
                    IssueKind::DanglingEdge {
                        edge_id: edge.id.clone(),
                        missing: endpoint.clone(),
                    },
                );
            }
        }
        if edge.is_self_loop() {
            report.push(
                Some(&edge.source),
                IssueKind::SelfLoop {
                    edge_id: edge.id.clone(),
                },
            );
        }
        let key = (
            &edge.source,
            &edge.target,
            &edge.source_handle,
            &edge.target_handle,
        );
        if !seen.insert(key) {
            report.push(
                None,
                IssueKind::DuplicateEdge {
                    edge_id: edge.id.clone(),
                },
            );
        }
    }
}

fn check_params(node: &Node, report: &mut ValidationReport) {
    let kind = node.kind();
    if !kind.accepts_inputs() && !node.data.input_params.is_empty() {
        report.push(Some(&node.id), IssueKind::InputsOnStart);
    }
    if kind == NodeKind::End && !node.data.output_params.is_empty() {
        report.push(Some(&node.id), IssueKind::OutputsOnEnd);
    }
    for name in node.data.output_params.iter().map(|p| &p.name).duplicates() {
        report.push(
            Some(&node.id),
            IssueKind::DuplicateOutput { name: name.clone() },
        );
    }
}

fn check_config(node: &Node, report: &mut ValidationReport) {
    match &node.data.config {
        NodeConfig::Llm(llm) => {
            if !(0.0..=2.0).contains(&llm.temperature) {
                report.push(
                    Some(&node.id),
                    IssueKind::TemperatureOutOfRange {
                        value: llm.temperature,
                    },
                );
            }
        }
        NodeConfig::Knowledge { knowledge_base_id } => {
            if knowledge_base_id.is_none() {
                report.push(Some(&node.id), IssueKind::MissingKnowledgeBase);
            }
        }
        NodeConfig::Tool { tool_name } => {
            if tool_name.is_none() {
                report.push(Some(&node.id), IssueKind::MissingTool);
            }
        }
        NodeConfig::Start { .. }
        | NodeConfig::End { .. }
        | NodeConfig::Mcp { .. }
        | NodeConfig::DocParser { .. }
        | NodeConfig::Vision
        | NodeConfig::Intent => {}
    }
}

fn check_bindings(node: &Node, resolver: &UpstreamResolver<'_>, report: &mut ValidationReport) {
    if node.data.input_params.is_empty() {
        return;
    }
    let available: AHashSet<String> = resolver
        .variables_for(&node.id)
        .into_iter()
        .map(|v| v.value)
        .collect();

    for input in &node.data.input_params {
        let reference = input.value_source.clone().unwrap_or_default();
        let kind = match input.source() {
            None => IssueKind::UnboundInput {
                name: input.name.clone(),
            },
            Some(None) => IssueKind::MalformedBinding {
                name: input.name.clone(),
                reference,
            },
            Some(Some(source)) if !available.contains(&source.to_string()) => {
                IssueKind::UnreachableBinding {
                    name: input.name.clone(),
                    reference,
                }
            }
            Some(Some(_)) => continue,
        };
        report.push(Some(&node.id), kind);
    }
}
