pub mod call_graph;
pub mod topology;

pub use call_graph::CallGraph;
pub use topology::{missing_method_calls, orphans, MissingCall, Topology};
