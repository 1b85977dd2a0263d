//! Host classification and default install task selection.

use std::env;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::Serialize;

/// Environment variable that replaces the detected host identifier.
pub const HOST_OVERRIDE_VAR: &str = "NLTEST_HOST_PLATFORM";

const WINDOWS_FAMILY: [&str; 6] = ["cygwin", "mswin", "mingw", "bccwin", "wince", "emx"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Linux,
    MacOS,
    Windows,
}

/// Named install targets, one per supported host family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InstallTask {
    #[serde(rename = "install_linux")]
    InstallLinux,
    #[serde(rename = "install_osx")]
    InstallOsx,
    #[serde(rename = "install_windows")]
    InstallWindows,
}

impl InstallTask {
    pub const ALL: [InstallTask; 3] = [
        InstallTask::InstallLinux,
        InstallTask::InstallOsx,
        InstallTask::InstallWindows,
    ];

    pub fn name(self) -> &'static str {
        match self {
            InstallTask::InstallLinux => "install_linux",
            InstallTask::InstallOsx => "install_osx",
            InstallTask::InstallWindows => "install_windows",
        }
    }
}

impl fmt::Display for InstallTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InstallTask {
    type Err = anyhow::Error;

    /// Accepts both the full task name (`install_osx`) and the short form (`osx`).
    fn from_str(raw: &str) -> Result<Self> {
        let lowered = raw.trim().to_ascii_lowercase();
        let short = lowered.strip_prefix("install_").unwrap_or(&lowered);
        match short {
            "linux" => Ok(InstallTask::InstallLinux),
            "osx" | "macos" | "darwin" => Ok(InstallTask::InstallOsx),
            "windows" | "win" => Ok(InstallTask::InstallWindows),
            _ => Err(anyhow!("unknown install task: {raw}")),
        }
    }
}

/// Classify a host identifier such as `x86_64-linux` or `x64-mingw32`.
///
/// Matching is a case-sensitive substring search, like the identifiers
/// Ruby reports in `RUBY_PLATFORM`; anything that is neither Windows-family
/// nor Darwin is treated as Linux.
pub fn classify(identifier: &str) -> PlatformKind {
    if WINDOWS_FAMILY.iter().any(|pat| identifier.contains(pat)) {
        PlatformKind::Windows
    } else if identifier.contains("darwin") {
        PlatformKind::MacOS
    } else {
        PlatformKind::Linux
    }
}

/// Default install task for a host family.
///
/// The Windows-family and fallback arms are swapped relative to their
/// names: Windows hosts get `install_linux` and everything unrecognised gets
/// `install_windows`. Existing build scripts depend on this mapping, so it
/// is kept as-is until someone confirms which side is intended.
pub fn default_task(kind: PlatformKind) -> InstallTask {
    match kind {
        PlatformKind::Windows => InstallTask::InstallLinux,
        PlatformKind::MacOS => InstallTask::InstallOsx,
        PlatformKind::Linux => InstallTask::InstallWindows,
    }
}

/// Result of classifying the host once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostPlatform {
    pub identifier: String,
    pub kind: PlatformKind,
    pub default_task: InstallTask,
}

impl HostPlatform {
    pub fn from_identifier(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let kind = classify(&identifier);
        Self {
            default_task: default_task(kind),
            kind,
            identifier,
        }
    }

    /// Classify the running host, honouring [`HOST_OVERRIDE_VAR`].
    pub fn detect() -> Self {
        match env::var(HOST_OVERRIDE_VAR) {
            Ok(raw) if !raw.trim().is_empty() => Self::from_identifier(raw.trim()),
            _ => Self::from_identifier(native_identifier()),
        }
    }
}

/// Build an `<arch>-<os>` identifier for the running process.
pub fn native_identifier() -> String {
    let arch = env::consts::ARCH;
    match env::consts::OS {
        "windows" => {
            let arch = if arch == "x86_64" { "x64" } else { arch };
            format!("{arch}-mingw32")
        }
        "macos" => format!("{arch}-darwin"),
        os => format!("{arch}-{os}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn darwin_selects_osx() {
        let host = HostPlatform::from_identifier("x86_64-darwin21");
        assert_eq!(host.kind, PlatformKind::MacOS);
        assert_eq!(host.default_task, InstallTask::InstallOsx);
    }

    // Pinned to the historical mapping; see `default_task`.
    #[test]
    fn windows_family_selects_linux_task() {
        for id in ["x86_64-cygwin", "i386-mswin32", "x64-mingw32", "bccwin32", "wince", "emx"] {
            let host = HostPlatform::from_identifier(id);
            assert_eq!(host.kind, PlatformKind::Windows, "{id}");
            assert_eq!(host.default_task, InstallTask::InstallLinux, "{id}");
        }
    }

    #[test]
    fn unknown_hosts_fall_back_to_windows_task() {
        for id in ["x86_64-linux", "aarch64-freebsd", ""] {
            assert_eq!(
                HostPlatform::from_identifier(id).default_task,
                InstallTask::InstallWindows
            );
        }
    }

    #[test]
    fn classification_is_case_sensitive() {
        assert_eq!(classify("x64-mingw-ucrt"), PlatformKind::Windows);
        assert_eq!(classify("X64-MINGW-UCRT"), PlatformKind::Linux);
        assert_eq!(classify("arm64-Darwin"), PlatformKind::Linux);
    }

    #[test]
    fn parses_task_names() {
        assert_eq!("install_osx".parse::<InstallTask>().unwrap(), InstallTask::InstallOsx);
        assert_eq!("Windows".parse::<InstallTask>().unwrap(), InstallTask::InstallWindows);
        assert_eq!("linux".parse::<InstallTask>().unwrap(), InstallTask::InstallLinux);
        assert!("install_beos".parse::<InstallTask>().is_err());
    }

    #[test]
    fn native_identifier_classifies_like_the_build_target() {
        let kind = classify(&native_identifier());
        if cfg!(target_os = "windows") {
            assert_eq!(kind, PlatformKind::Windows);
        } else if cfg!(target_os = "macos") {
            assert_eq!(kind, PlatformKind::MacOS);
        } else {
            assert_eq!(kind, PlatformKind::Linux);
        }
    }
}
