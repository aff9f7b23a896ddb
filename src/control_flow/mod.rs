mod control_flow;
mod options;

pub use control_flow::{control_flow, ControlFlow};
pub use options::{ConditionFn, ConditionOption, ControlFlowOptions};
