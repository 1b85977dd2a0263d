//! Visual Studio generator selection for CMake.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::Serialize;

use crate::cmake::CmakeInvocation;
use crate::error::BuildError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BitWidth {
    X86,
    X64,
}

impl BitWidth {
    /// Token passed to CMake as `-DBITS=`.
    pub fn token(self) -> &'static str {
        match self {
            BitWidth::X86 => "x86",
            BitWidth::X64 => "x64",
        }
    }
}

impl fmt::Display for BitWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for BitWidth {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "x64" | "64" | "win64" | "amd64" | "x86_64" => Ok(BitWidth::X64),
            "x86" | "32" | "win32" | "i386" | "i686" => Ok(BitWidth::X86),
            _ => Err(anyhow!("unknown bit width: {raw} (expected x86 or x64)")),
        }
    }
}

/// Visual Studio releases with a known CMake generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum VsYear {
    Vs2010,
    Vs2012,
    Vs2013,
    Vs2015,
    Vs2017,
    Vs2019,
}

impl VsYear {
    pub const ALL: [VsYear; 6] = [
        VsYear::Vs2010,
        VsYear::Vs2012,
        VsYear::Vs2013,
        VsYear::Vs2015,
        VsYear::Vs2017,
        VsYear::Vs2019,
    ];

    pub fn year(self) -> u16 {
        match self {
            VsYear::Vs2010 => 2010,
            VsYear::Vs2012 => 2012,
            VsYear::Vs2013 => 2013,
            VsYear::Vs2015 => 2015,
            VsYear::Vs2017 => 2017,
            VsYear::Vs2019 => 2019,
        }
    }

    /// Internal product version (`14` for 2015, and so on).
    pub fn product_version(self) -> u8 {
        match self {
            VsYear::Vs2010 => 10,
            VsYear::Vs2012 => 11,
            VsYear::Vs2013 => 12,
            VsYear::Vs2015 => 14,
            VsYear::Vs2017 => 15,
            VsYear::Vs2019 => 16,
        }
    }

    pub fn generator_name(self) -> String {
        format!("Visual Studio {} {}", self.product_version(), self.year())
    }

    /// From 2019 on the architecture moved out of the generator name into `-A`.
    pub fn uses_platform_flag(self) -> bool {
        self >= VsYear::Vs2019
    }
}

impl fmt::Display for VsYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.year())
    }
}

impl FromStr for VsYear {
    type Err = BuildError;

    fn from_str(raw: &str) -> Result<Self, BuildError> {
        let token = raw.trim();
        VsYear::ALL
            .into_iter()
            .find(|y| y.year().to_string() == token)
            .ok_or_else(|| BuildError::UnsupportedToolchainYear {
                year: token.to_string(),
            })
    }
}

/// A bit width paired with a raw year token, as read from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorRequest {
    pub bits: BitWidth,
    pub year: String,
}

impl GeneratorRequest {
    pub fn new(bits: BitWidth, year: impl Into<String>) -> Self {
        Self {
            bits,
            year: year.into(),
        }
    }

    pub fn build(&self) -> Option<CmakeInvocation> {
        win_vs(self.bits, &self.year)
    }
}

/// CMake configure invocation for a Visual Studio toolchain.
///
/// Returns `None` and logs a single warning when the year is not supported;
/// the caller decides whether that aborts the larger build.
pub fn win_vs(bits: BitWidth, year: &str) -> Option<CmakeInvocation> {
    let vs = match year.parse::<VsYear>() {
        Ok(vs) => vs,
        Err(_) => {
            tracing::warn!("Visual Studio year {year} not supported!");
            return None;
        }
    };

    let inv = CmakeInvocation::new();
    let inv = if vs.uses_platform_flag() {
        let platform = match bits {
            BitWidth::X64 => "x64",
            BitWidth::X86 => "Win32",
        };
        inv.generator(vs.generator_name()).arch(platform)
    } else {
        let name = match bits {
            BitWidth::X64 => format!("{} Win64", vs.generator_name()),
            BitWidth::X86 => vs.generator_name(),
        };
        inv.generator(name)
    };

    Some(inv.define("BITS", bits).define("YEAR", vs.year()))
}
