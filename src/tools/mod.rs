//! Tool system for function calling.

pub mod arguments;
pub mod builtin;
pub mod dynamic;
pub mod tool;
pub mod types;
pub mod validation;

pub use arguments::ToolArguments;
pub use dynamic::RemoteTool;
pub use tool::{FunctionTool, Tool};
pub use types::{ParameterBuilder, ToolDescriptor, ToolParameters};
pub use validation::validate_arguments;
