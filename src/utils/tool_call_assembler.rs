use std::collections::BTreeMap;

use crate::types::events::ToolCallDelta;
use crate::types::tool::ToolCall;

/// Collects streamed tool-call fragments into final [`ToolCall`]s.
///
/// Fragments are keyed by their `index`. The first fragment for an index
/// creates the entry (id and function name); later fragments only append
/// argument text, in arrival order.
#[derive(Debug, Default)]
pub struct ToolCallAssembler {
    tool_calls: BTreeMap<u32, ToolCall>,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_delta(&mut self, delta: &ToolCallDelta) {
        let function = delta.function.as_ref();
        let tc = self.tool_calls.entry(delta.index).or_insert_with(|| ToolCall {
            id: delta.id.clone().unwrap_or_default(),
            name: function
                .and_then(|f| f.name.clone())
                .unwrap_or_default(),
            arguments: String::new(),
        });
        if let Some(args) = function.and_then(|f| f.arguments.as_deref()) {
            tc.arguments.push_str(args);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tool_calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tool_calls.len()
    }

    /// Assembled calls ordered by index.
    pub fn finalize(self) -> Vec<ToolCall> {
        self.tool_calls.into_values().collect()
    }
}
