//! Toolbox layout: which files land where.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// One copy step. Paths are relative: `source` to the project root,
/// `destination` to the toolbox directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRule {
    pub source: PathBuf,
    /// File name glob; ignored for recursive rules.
    #[serde(default)]
    pub pattern: Option<String>,
    pub destination: PathBuf,
    /// Copy the whole `source` tree instead of matching files.
    #[serde(default)]
    pub recursive: bool,
}

impl CopyRule {
    pub fn files(source: &str, pattern: &str, destination: &str) -> Self {
        Self {
            source: PathBuf::from(source),
            pattern: Some(pattern.to_string()),
            destination: PathBuf::from(destination),
            recursive: false,
        }
    }

    pub fn tree(source: &str, destination: &str) -> Self {
        Self {
            source: PathBuf::from(source),
            pattern: None,
            destination: PathBuf::from(destination),
            recursive: true,
        }
    }
}

/// A license (or other root-level) file copied verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootFile {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Everything the populator needs to rebuild the staging tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolboxManifest {
    /// Directory wiped and recreated on every run.
    pub staging_root: PathBuf,
    /// Created under the toolbox directory after the wipe.
    #[serde(default)]
    pub directories: Vec<PathBuf>,
    /// `(directory, glob)` pairs of stale build outputs to delete.
    #[serde(default)]
    pub stale_artifacts: Vec<StaleArtifacts>,
    #[serde(default)]
    pub rules: Vec<CopyRule>,
    #[serde(default)]
    pub root_files: Vec<RootFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleArtifacts {
    pub directory: PathBuf,
    pub pattern: String,
}

impl Default for ToolboxManifest {
    fn default() -> Self {
        let utils = "submodules/Utils/src";
        Self {
            staging_root: PathBuf::from("src"),
            directories: [
                "src",
                "src/Utils/fmt",
                "src/Utils/zstream",
                "src/Utils/Eigen",
                "src/Utils/mingw-std-threads",
                "src/tests",
            ]
            .into_iter()
            .map(PathBuf::from)
            .collect(),
            stale_artifacts: vec![StaleArtifacts {
                directory: PathBuf::from("bin"),
                pattern: "*.mex*".to_string(),
            }],
            rules: vec![
                CopyRule::files("src", "*.cc", "src"),
                CopyRule::files("src", "*.h*", "src"),
                CopyRule::files("src/tests", "*.cxx", "src/tests"),
                CopyRule::files(utils, "*.cc", "src"),
                CopyRule::files(utils, "*.h*", "src"),
                CopyRule::files(&format!("{utils}/Utils"), "*.h*", "src/Utils"),
                CopyRule::files(&format!("{utils}/Utils"), "*.c*", "src/Utils"),
                CopyRule::files(&format!("{utils}/Utils/fmt"), "*.h*", "src/Utils/fmt"),
                CopyRule::files(&format!("{utils}/Utils/fmt"), "*.c*", "src/Utils/fmt"),
                CopyRule::files(&format!("{utils}/Utils/zstream"), "*.h*", "src/Utils/zstream"),
                CopyRule::files(
                    &format!("{utils}/Utils/mingw-std-threads"),
                    "*.h*",
                    "src/Utils/mingw-std-threads",
                ),
                CopyRule::tree(&format!("{utils}/Eigen"), "src/Utils/Eigen"),
            ],
            root_files: ["license.txt", "license_3rd.txt"]
                .into_iter()
                .map(|name| RootFile {
                    source: PathBuf::from(name),
                    destination: PathBuf::from(name),
                })
                .collect(),
        }
    }
}

impl ToolboxManifest {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let manifest: ToolboxManifest = toml::from_str(raw).context("parsing toolbox manifest")?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("in {}", path.display()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serializing toolbox manifest")
    }

    /// Reject layouts that could escape the toolbox or have no pattern.
    ///
    /// Created directories and rule destinations must sit under
    /// `staging_root`, which is the only tree wiped between runs.
    pub fn validate(&self) -> Result<()> {
        ensure_relative(&self.staging_root)?;
        if self.staging_root.as_os_str().is_empty() {
            return Err(anyhow!("staging_root must not be empty"));
        }
        for dir in &self.directories {
            ensure_relative(dir)?;
            self.ensure_staged(dir)?;
        }
        for stale in &self.stale_artifacts {
            ensure_relative(&stale.directory)?;
        }
        for rule in &self.rules {
            ensure_relative(&rule.source)?;
            ensure_relative(&rule.destination)?;
            self.ensure_staged(&rule.destination)?;
            if !rule.recursive && rule.pattern.is_none() {
                return Err(anyhow!(
                    "rule for {} needs a pattern or recursive = true",
                    rule.source.display()
                ));
            }
        }
        for file in &self.root_files {
            ensure_relative(&file.source)?;
            ensure_relative(&file.destination)?;
        }
        Ok(())
    }

    fn ensure_staged(&self, path: &Path) -> Result<()> {
        if !path.starts_with(&self.staging_root) {
            return Err(anyhow!(
                "{} is outside staging_root {}",
                path.display(),
                self.staging_root.display()
            ));
        }
        Ok(())
    }
}

fn ensure_relative(path: &Path) -> Result<()> {
    use std::path::Component;

    let escapes = path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(anyhow!(
            "manifest paths must be relative and stay inside their base: {}",
            path.display()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_valid() {
        let manifest = ToolboxManifest::default();
        manifest.validate().expect("valid");
        assert_eq!(manifest.rules.len(), 12);
        assert_eq!(manifest.rules.iter().filter(|r| r.recursive).count(), 1);
    }

    #[test]
    fn toml_round_trip_keeps_rules() {
        let manifest = ToolboxManifest::default();
        let text = manifest.to_toml_string().expect("serialize");
        let parsed = ToolboxManifest::from_toml_str(&text).expect("parse");
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn parses_minimal_manifest() {
        let raw = r#"
staging_root = "src"

[[rules]]
source = "src"
pattern = "*.cc"
destination = "src"
"#;
        let manifest = ToolboxManifest::from_toml_str(raw).expect("parse");
        assert_eq!(manifest.rules, vec![CopyRule::files("src", "*.cc", "src")]);
        assert!(manifest.root_files.is_empty());
    }

    #[test]
    fn rejects_parent_components() {
        let raw = r#"
staging_root = "src"

[[rules]]
source = "../outside"
pattern = "*"
destination = "src"
"#;
        assert!(ToolboxManifest::from_toml_str(raw).is_err());
    }

    #[test]
    fn rejects_destination_outside_staging_root() {
        let raw = r#"
staging_root = "src"

[[rules]]
source = "src"
pattern = "*.cc"
destination = "other"
"#;
        let err = ToolboxManifest::from_toml_str(raw).unwrap_err();
        assert!(format!("{err:#}").contains("outside staging_root"));

        let raw = r#"
staging_root = "src"
directories = ["src/tests", "srcx"]
"#;
        assert!(ToolboxManifest::from_toml_str(raw).is_err());
    }

    #[test]
    fn rejects_rule_without_pattern() {
        let raw = r#"
staging_root = "src"

[[rules]]
source = "src"
destination = "src"
"#;
        let err = ToolboxManifest::from_toml_str(raw).unwrap_err();
        assert!(err.to_string().contains("needs a pattern"));
    }
}
