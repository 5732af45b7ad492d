use rmcp::model::{CallToolResult, Content};
use tracing::warn;

pub(crate) fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

/// Error-flagged result. The message is also logged since the client may not
/// surface it.
pub(crate) fn error_result(tool: &str, message: impl Into<String>) -> CallToolResult {
    let message = message.into();
    warn!(tool, error = %message, "tool call failed");
    CallToolResult::error(vec![Content::text(message)])
}

#[cfg(test)]
pub(crate) fn result_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|content| content.as_text())
        .map(|text| text.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
