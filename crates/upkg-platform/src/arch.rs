//! Architecture detection.

use crate::{Error, Result};

/// CPU architecture types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86,
    X86_64,
    ARM,
    ARM64,
    Unknown,
}

impl From<&str> for Arch {
    fn from(s: &str) -> Self {
        match s {
            "i386" | "i686" | "x86" => Arch::X86,
            "x86_64" | "amd64" => Arch::X86_64,
            "arm" | "armv7l" => Arch::ARM,
            "aarch64" | "arm64" => Arch::ARM64,
            _ => Arch::Unknown,
        }
    }
}

impl Arch {
    /// Name the artifact service expects in its `arch` query parameter.
    pub fn release_name(self) -> Result<&'static str> {
        match self {
            Arch::X86 => Ok("x86"),
            Arch::X86_64 => Ok("x86_64"),
            Arch::ARM => Ok("arm"),
            Arch::ARM64 => Ok("arm64"),
            Arch::Unknown => Err(Error::UnsupportedArch(sysinfo::System::cpu_arch())),
        }
    }
}

/// Detect current architecture.
pub fn detect() -> Arch {
    let cpu_arch = sysinfo::System::cpu_arch();
    Arch::from(cpu_arch.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_from_str() {
        assert_eq!(Arch::from("x86_64"), Arch::X86_64);
        assert_eq!(Arch::from("amd64"), Arch::X86_64);
        assert_eq!(Arch::from("aarch64"), Arch::ARM64);
        assert_eq!(Arch::from("arm64"), Arch::ARM64);
        assert_eq!(Arch::from("armv7l"), Arch::ARM);
        assert_eq!(Arch::from("i686"), Arch::X86);
        assert_eq!(Arch::from("riscv64"), Arch::Unknown);
    }

    #[test]
    fn test_release_name() {
        assert_eq!(Arch::X86_64.release_name().unwrap(), "x86_64");
        assert_eq!(Arch::ARM64.release_name().unwrap(), "arm64");
        assert!(matches!(
            Arch::Unknown.release_name(),
            Err(Error::UnsupportedArch(_))
        ));
    }

    #[test]
    #[cfg(target_arch = "x86_64")]
    fn test_detect_x86_64() {
        assert_eq!(detect(), Arch::X86_64);
    }
}
