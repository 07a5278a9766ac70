use super::node::{Node, NodeKind, Position};
use super::params::{OutputParam, ParamType};

pub const START_NODE_ID: &str = "start-node";
pub const END_NODE_ID: &str = "end-node";

/// The variables every run provides through the start node.
pub(crate) fn start_outputs() -> Vec<OutputParam> {
    vec![
        OutputParam::new("rawQuery", ParamType::String, "Text entered by the user"),
        OutputParam::new("fileNames", ParamType::StringList, "Names of uploaded files"),
        OutputParam::new("fileUrls", ParamType::StringList, "Object storage paths of uploaded files"),
        OutputParam::new("request_id", ParamType::String, "Id of this request"),
        OutputParam::new("conversion_id", ParamType::String, "Conversation id"),
    ]
}

/// The two nodes a brand new workflow starts with.
pub fn starter_nodes() -> [Node; 2] {
    [
        Node::new(START_NODE_ID, NodeKind::Start, "Start", Position::new(250.0, 50.0)),
        Node::new(END_NODE_ID, NodeKind::End, "End", Position::new(250.0, 400.0)),
    ]
}
