//! Built-in function tools.
//!
//! ```rust,no_run
//! use toolmesh::tools::builtin::write_file_tool;
//!
//! let tool = write_file_tool();
//! assert_eq!(tool.name(), "write_file");
//! ```

use std::sync::Arc;

use crate::error::ToolmeshError;
use crate::tools::tool::{FunctionTool, Tool};
use crate::tools::types::ToolParameters;

const WRITE_FILE: &str = "write_file";

/// Create the `write_file` tool, which writes text to a local file.
///
/// Creates parent directories when they do not exist. Returns the written
/// byte count and the path.
pub fn write_file_tool() -> Arc<dyn Tool> {
    Arc::new(FunctionTool::from_json(
        WRITE_FILE,
        "Write content to a file on the local file system, creating parent directories if needed",
        ToolParameters::object()
            .string("path", "Path to the file to write", true)
            .string("content", "Content to write to the file", true)
            .build(),
        |args| async move {
            let path = args.get_str("path")?;
            let content = args.get_str("content")?;

            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        ToolmeshError::tool_execution(
                            WRITE_FILE,
                            format!("failed to create directories for {path}: {e}"),
                        )
                    })?;
                }
            }

            tokio::fs::write(path, content)
                .await
                .map_err(|e| ToolmeshError::tool_execution(WRITE_FILE, format!("{path}: {e}")))?;

            tracing::debug!(path, bytes = content.len(), "Wrote file");

            Ok(serde_json::json!({
                "success": true,
                "path": path,
                "bytes_written": content.len(),
            }))
        },
    ))
}
