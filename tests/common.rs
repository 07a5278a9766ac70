//! Common test utilities for building workflow graphs and flow JSON.
use flowstudio::prelude::*;

/// A node of `kind` whose label is its id and whose outputs are exactly `outputs`.
#[allow(dead_code)]
pub fn node(id: &str, kind: NodeKind, outputs: &[(&str, &str)]) -> Node {
    Node::new(id, kind, id, Position::default()).with_outputs(
        outputs
            .iter()
            .map(|(name, ty)| OutputParam::new(name, ParamType::from(*ty), ""))
            .collect(),
    )
}

/// A graph from nodes and `(source, target)` pairs.
#[allow(dead_code)]
pub fn graph(nodes: Vec<Node>, edges: &[(&str, &str)]) -> Graph {
    let edges = edges
        .iter()
        .map(|(source, target)| Edge::new(source, target))
        .collect();
    Graph::from_parts(nodes, edges).expect("fixture node ids are unique")
}

/// `start(q:string) -> llm1(text:string) -> end`, with the start node labeled "Start".
#[allow(dead_code)]
pub fn create_linear_graph() -> Graph {
    let mut start = node("start", NodeKind::Start, &[("q", "string")]);
    start.data.label = "Start".to_string();
    let mut llm = node("llm1", NodeKind::Llm, &[("text", "string")]);
    llm.data.label = "Summarizer".to_string();
    graph(
        vec![start, llm, node("end", NodeKind::End, &[])],
        &[("start", "llm1"), ("llm1", "end")],
    )
}

/// `A -> B`, `A -> C`, `B -> D`, `C -> D`.
#[allow(dead_code)]
pub fn create_diamond_graph() -> Graph {
    graph(
        vec![
            node("A", NodeKind::Start, &[("a", "string")]),
            node("B", NodeKind::Llm, &[("b", "string")]),
            node("C", NodeKind::Tool, &[("c", "number")]),
            node("D", NodeKind::End, &[]),
        ],
        &[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")],
    )
}

/// A flow as the canvas saves it, with "common" placeholders and string temperatures.
#[allow(dead_code)]
pub const CANVAS_FLOW_JSON: &str = r##"{
  "nodes": [
    {
      "id": "start-node",
      "type": "start",
      "position": {"x": 250, "y": 50},
      "data": {
        "label": "Start",
        "output_params": [{"name": "rawQuery", "type": "string", "desc": "User input"}]
      }
    },
    {
      "id": "node_0",
      "type": "common",
      "position": {"x": 250, "y": 200},
      "data": {
        "label": "Answer",
        "originalType": "llm",
        "model": "qwen-plus",
        "temperature": "0.3",
        "system_prompt": "Be brief.",
        "output_params": [
          {"name": "text", "type": "string"},
          {"name": "usage", "type": "object"}
        ],
        "input_params": [{"name": "question", "value_source": "start-node.output.rawQuery"}],
        "color": "#1677ff"
      }
    },
    {
      "id": "end-node",
      "type": "end",
      "position": {"x": 250, "y": 400},
      "data": {"label": "End", "reply_template": "{{node_0.output.text}}"}
    }
  ],
  "edges": [
    {"id": "e1", "source": "start-node", "target": "node_0"},
    {"source": "node_0", "target": "end-node", "sourceHandle": "out", "targetHandle": "in"}
  ]
}"##;
