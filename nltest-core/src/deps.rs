//! Startup check for external tools.

use std::path::PathBuf;

use which::which;

use crate::error::BuildError;
use crate::platform::InstallTask;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredTool {
    pub name: String,
    pub install_hint: String,
}

impl RequiredTool {
    pub fn new(name: impl Into<String>, install_hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            install_hint: install_hint.into(),
        }
    }
}

/// Tools an install task shells out to.
pub fn required_tools(task: InstallTask) -> Vec<RequiredTool> {
    let hint = match task {
        InstallTask::InstallLinux => "(sudo) apt install cmake  # or your distribution's package",
        InstallTask::InstallOsx => "brew install cmake",
        InstallTask::InstallWindows => "winget install Kitware.CMake",
    };
    vec![RequiredTool::new(crate::cmake::CMAKE, hint)]
}

/// Resolve every tool on `PATH`, failing on the first one that is missing.
pub fn check_tools(tools: &[RequiredTool]) -> Result<Vec<PathBuf>, BuildError> {
    let mut found = Vec::with_capacity(tools.len());
    for tool in tools {
        match which(&tool.name) {
            Ok(path) => {
                tracing::debug!(tool = %tool.name, path = %path.display(), "found");
                found.push(path);
            }
            Err(_) => {
                return Err(BuildError::MissingDependency {
                    tool: tool.name.clone(),
                    hint: tool.install_hint.clone(),
                });
            }
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_is_named_in_error() {
        let tools = [RequiredTool::new(
            "nltest-definitely-not-installed",
            "cargo install nothing",
        )];
        let err = check_tools(&tools).unwrap_err();
        assert_eq!(
            err,
            BuildError::MissingDependency {
                tool: "nltest-definitely-not-installed".to_string(),
                hint: "cargo install nothing".to_string(),
            }
        );
        assert!(err.to_string().contains("cargo install nothing"));
    }

    #[test]
    fn every_task_needs_cmake() {
        for task in InstallTask::ALL {
            assert!(required_tools(task).iter().any(|t| t.name == "cmake"));
        }
    }

    #[test]
    fn empty_list_always_passes() {
        assert!(check_tools(&[]).expect("nothing to check").is_empty());
    }
}
