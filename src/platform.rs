//! Platform identification for release artifact selection.
//!
//! The release pipeline ships prebuilt OpenCode binaries per `<os>-<arch>`
//! combination, so the updater has to map the running host to one of the
//! canonical platform identifiers used in release asset names. Resolution is
//! a pure mapping with no failure mode: a host the mapping does not recognize
//! yields [`Os::Unknown`] / [`Arch::Unknown`], which downstream code treats
//! as "skip the release pipeline", never as an error.
//!
//! # Examples
//!
//! ```rust,no_run
//! use agentation_update::platform;
//!
//! let platform = platform::resolve();
//! println!("release artifacts for: {platform}"); // e.g. "linux-x64"
//! ```

use std::fmt;

/// Operating system axis of a [`PlatformId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// macOS hosts.
    Darwin,
    /// Linux hosts.
    Linux,
    /// Windows hosts, including MSYS2/MinGW/Cygwin environments.
    Windows,
    /// Anything the mapping does not recognize. Valid output, not an error.
    Unknown,
}

impl Os {
    /// Maps a host OS name to the canonical release identifier.
    ///
    /// Accepts both `uname -s` style names (`Darwin`, `Linux`, `MINGW64_NT-10.0`)
    /// and the Rust `std::env::consts::OS` spellings (`macos`, `linux`,
    /// `windows`), so the same table serves runtime resolution and tests.
    #[must_use]
    pub fn from_host_name(name: &str) -> Self {
        match name {
            "Darwin" | "macos" => Self::Darwin,
            "Linux" | "linux" => Self::Linux,
            "windows" => Self::Windows,
            other
                if other.starts_with("MINGW")
                    || other.starts_with("MSYS")
                    || other.starts_with("CYGWIN") =>
            {
                Self::Windows
            }
            _ => Self::Unknown,
        }
    }

    /// Canonical lowercase identifier used in artifact names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Darwin => "darwin",
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Unknown => "unknown",
        }
    }
}

/// CPU architecture axis of a [`PlatformId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    /// 64-bit x86 (`x86_64` / `amd64`).
    X64,
    /// 64-bit ARM (`arm64` / `aarch64`).
    Arm64,
    /// Anything the mapping does not recognize. Valid output, not an error.
    Unknown,
}

impl Arch {
    /// Maps a host machine name (`uname -m` or `std::env::consts::ARCH`) to
    /// the canonical release identifier.
    #[must_use]
    pub fn from_host_name(name: &str) -> Self {
        match name {
            "x86_64" | "amd64" => Self::X64,
            "arm64" | "aarch64" => Self::Arm64,
            _ => Self::Unknown,
        }
    }

    /// Canonical lowercase identifier used in artifact names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
            Self::Unknown => "unknown",
        }
    }
}

/// Canonical platform identifier, serialized as `"<os>-<arch>"`.
///
/// Computed once per run by [`resolve`] and passed into the release pipeline.
/// Immutable by construction; the two axes are independent, and either may be
/// `Unknown` on hosts the release feed does not cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformId {
    /// Operating system component.
    pub os: Os,
    /// CPU architecture component.
    pub arch: Arch,
}

impl PlatformId {
    /// Builds a platform identifier from raw host OS and machine names.
    #[must_use]
    pub fn from_host(os_name: &str, arch_name: &str) -> Self {
        Self {
            os: Os::from_host_name(os_name),
            arch: Arch::from_host_name(arch_name),
        }
    }

    /// `true` if either axis is unrecognized.
    ///
    /// The release pipeline must treat this as "skip, do not fail": there is
    /// no artifact to download, but the host is not broken.
    #[must_use]
    pub const fn is_unknown(self) -> bool {
        matches!(self.os, Os::Unknown) || matches!(self.arch, Arch::Unknown)
    }

    /// `true` for the one known combination that never ships a prebuilt
    /// binary: Intel macOS. Callers skip with a build-from-source hint
    /// instead of attempting a download that cannot exist.
    #[must_use]
    pub const fn is_unsupported(self) -> bool {
        matches!(self.os, Os::Darwin) && matches!(self.arch, Arch::X64)
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

/// Resolves the platform identifier for the running host.
///
/// Pure introspection over `std::env::consts`; no side effects and no failure
/// mode. Unrecognized hosts come back with `Unknown` axes rather than errors.
#[must_use]
pub fn resolve() -> PlatformId {
    PlatformId::from_host(std::env::consts::OS, std::env::consts::ARCH)
}
