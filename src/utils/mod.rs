//! Small helpers shared by the pipeline and the client.

pub mod tool_call_assembler;

pub use tool_call_assembler::ToolCallAssembler;
