//! Host platform model
//!
//! The orchestrator builds for the host it runs on. The platform decides the
//! cmake generator, tool file suffixes, the OS/arch classifier of published
//! artifacts and the default compiler/linker options of definition files.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PlatformError;

/// Host operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Os {
    Windows,
    MacOs,
    Linux,
}

impl Os {
    /// Parses an OS name as reported by `std::env::consts::OS`
    pub fn parse(name: &str) -> Result<Self, PlatformError> {
        match name.to_lowercase().as_str() {
            "windows" => Ok(Os::Windows),
            "macos" | "mac" | "darwin" => Ok(Os::MacOs),
            "linux" => Ok(Os::Linux),
            other => Err(PlatformError::UnsupportedOs(other.to_string())),
        }
    }

    /// OS name used in published artifact ids
    pub fn publish_name(&self) -> &'static str {
        match self {
            Os::Windows => "mingw",
            Os::MacOs => "macos",
            Os::Linux => "linux",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Os::Windows => write!(f, "windows"),
            Os::MacOs => write!(f, "macos"),
            Os::Linux => write!(f, "linux"),
        }
    }
}

/// Host CPU architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Arch {
    X64,
    Arm64,
    X86,
}

impl Arch {
    /// Parses an architecture name as reported by `std::env::consts::ARCH`
    pub fn parse(name: &str) -> Result<Self, PlatformError> {
        match name.to_lowercase().as_str() {
            "amd64" | "x86_64" | "x64" => Ok(Arch::X64),
            "aarch64" | "arm" | "arm64" => Ok(Arch::Arm64),
            "x86" => Ok(Arch::X86),
            other => Err(PlatformError::UnsupportedArch(other.to_string())),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::X64 => write!(f, "x64"),
            Arch::Arm64 => write!(f, "arm64"),
            Arch::X86 => write!(f, "x86"),
        }
    }
}

/// Operating system and architecture pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detects the platform this process runs on
    pub fn host() -> Result<Self, PlatformError> {
        Ok(Self {
            os: Os::parse(std::env::consts::OS)?,
            arch: Arch::parse(std::env::consts::ARCH)?,
        })
    }

    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// Artifact classifier, e.g. `linux-x64` or `mingw-arm64`
    pub fn classifier(&self) -> String {
        format!("{}-{}", self.os.publish_name(), self.arch)
    }

    /// Compiler options added to every definition file
    pub fn compiler_opts(&self) -> &'static str {
        match self.os {
            Os::Windows => "-DWIN32 -D_WINDOWS -D__MINGW32__ -D__MINGW64__",
            Os::MacOs => "-I/usr/local/include -I/usr/include -I/opt/homebrew/include",
            Os::Linux => "-I/usr/include -I/usr/local/include -I/usr/include/x86_64-linux-gnu",
        }
    }

    /// Linker options added to every definition file
    pub fn linker_opts(&self) -> &'static str {
        match self.os {
            Os::Windows => "-DWIN32 -D_WINDOWS -D__MINGW32__ -D__MINGW64__",
            Os::MacOs => "-lpthread -ldl -lm",
            Os::Linux => "-lpthread -ldl -lm -lrt",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}
