//! nltest-core: build plumbing for the nonlinear systems test suite
//!
//! Three small, independent pieces that the `nltest` CLI strings together:
//!
//! **Dispatch**: classify the host and pick the default install task
//! - [`platform::classify`] maps identifiers such as `x86_64-darwin` or
//!   `x64-mingw32` onto a [`platform::PlatformKind`]
//! - [`platform::HostPlatform`] carries the decision as a plain value
//!
//! **Toolchains**: turn a bit width and a Visual Studio year into CMake
//! arguments
//! - [`generator::win_vs`] knows the 2010..2019 generator names
//! - [`cmake::CmakeInvocation`] keeps arguments as tokens, never as a
//!   concatenated shell string
//! - [`install::plan`] expands a task into configure + install steps
//!
//! **Staging**: rebuild the MATLAB toolbox source tree
//! - [`manifest::ToolboxManifest`] lists what is copied where
//! - [`populate::Populator`] wipes and refills the tree in a fixed order
//!
//! ```rust,no_run
//! use nltest_core::generator::{win_vs, BitWidth};
//! use nltest_core::platform::HostPlatform;
//! use nltest_core::populate::Populator;
//!
//! let host = HostPlatform::detect();
//! println!("default task: {}", host.default_task);
//!
//! if let Some(cmd) = win_vs(BitWidth::X64, "2019") {
//!     println!("{cmd}");
//! }
//!
//! let report = Populator::for_toolbox("toolbox").run()?;
//! println!("copied {} files", report.copied_files());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cmake;
pub mod deps;
pub mod discovery;
pub mod error;
pub mod generator;
pub mod install;
pub mod manifest;
pub mod output;
pub mod platform;
pub mod populate;

pub use error::BuildError;
