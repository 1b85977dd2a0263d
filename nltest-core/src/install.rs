//! Install tasks as ordered CMake plans.

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::cmake::CmakeInvocation;
use crate::error::BuildError;
use crate::generator::{win_vs, BitWidth};
use crate::platform::InstallTask;

pub const DEFAULT_VS_YEAR: &str = "2019";
pub const DEFAULT_BUILD_TYPE: &str = "Release";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOptions {
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub bits: BitWidth,
    /// Visual Studio year token; only read by `install_windows`.
    pub year: String,
    pub build_type: String,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            build_dir: PathBuf::from("build"),
            bits: BitWidth::X64,
            year: DEFAULT_VS_YEAR.to_string(),
            build_type: DEFAULT_BUILD_TYPE.to_string(),
        }
    }
}

/// Configure step followed by a build of the `install` target.
pub fn plan(task: InstallTask, opts: &InstallOptions) -> Result<Vec<CmakeInvocation>> {
    let configure = match task {
        InstallTask::InstallLinux | InstallTask::InstallOsx => CmakeInvocation::new()
            .source_dir(&opts.source_dir)
            .build_dir(&opts.build_dir)
            .define("CMAKE_BUILD_TYPE", &opts.build_type),
        InstallTask::InstallWindows => win_vs(opts.bits, &opts.year)
            .ok_or_else(|| BuildError::UnsupportedToolchainYear {
                year: opts.year.clone(),
            })?
            .source_dir(&opts.source_dir)
            .build_dir(&opts.build_dir),
    };

    let build = CmakeInvocation::new()
        .build(&opts.build_dir)
        .config(opts.build_type.clone())
        .target("install");

    Ok(vec![configure, build])
}

/// Run each step in order, stopping at the first failure.
///
/// With `dry_run` nothing is spawned; the rendered steps are returned so the
/// caller can print them.
pub fn execute(task: InstallTask, steps: &[CmakeInvocation], dry_run: bool) -> Result<Vec<String>> {
    tracing::info!(%task, steps = steps.len(), dry_run, "starting install task");
    let mut rendered = Vec::with_capacity(steps.len());
    for step in steps {
        if !dry_run {
            step.run()?;
        }
        rendered.push(step.to_string());
    }
    tracing::info!(%task, "install task finished");
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_plan_uses_default_generator() {
        let steps = plan(InstallTask::InstallOsx, &InstallOptions::default()).expect("plan");
        assert_eq!(steps.len(), 2);
        assert!(!steps[0].has_arg("-G"));
        assert!(steps[0].has_arg("-DCMAKE_BUILD_TYPE=Release"));
        assert_eq!(
            steps[1].to_string(),
            "cmake --build build --config Release --target install"
        );
    }

    #[test]
    fn windows_plan_starts_with_generator() {
        let opts = InstallOptions {
            year: "2015".to_string(),
            ..InstallOptions::default()
        };
        let steps = plan(InstallTask::InstallWindows, &opts).expect("plan");
        assert_eq!(
            steps[0].to_string(),
            r#"cmake -G "Visual Studio 14 2015 Win64" -DBITS=x64 -DYEAR=2015 -S . -B build"#
        );
    }

    #[test]
    fn windows_plan_rejects_unknown_year() {
        let opts = InstallOptions {
            year: "2005".to_string(),
            ..InstallOptions::default()
        };
        let err = plan(InstallTask::InstallWindows, &opts).unwrap_err();
        assert_eq!(
            err.downcast_ref::<BuildError>(),
            Some(&BuildError::UnsupportedToolchainYear {
                year: "2005".to_string()
            })
        );
    }

    #[test]
    fn dry_run_spawns_nothing() {
        let steps = vec![CmakeInvocation::new().arg("--definitely-not-a-flag")];
        let rendered = execute(InstallTask::InstallLinux, &steps, true).expect("dry run");
        assert_eq!(rendered, ["cmake --definitely-not-a-flag"]);
    }
}
