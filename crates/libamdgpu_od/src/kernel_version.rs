use std::fmt;

/// `major.minor` of the running kernel, as reported by `uname -r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KernelVersion {
    pub major: u32,
    pub minor: u32,
}

impl KernelVersion {
    /// OverDrive tables and `pp_dpm_*` are usable from here on.
    pub const MIN_SUPPORTED: Self = Self::new(4, 8);
    /// `gpu_busy_percent`
    pub const GPU_BUSY: Self = Self::new(4, 19);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// e.g. "6.8.0-45-generic", "4.19.0"
    pub fn parse(release: &str) -> Option<Self> {
        let mut split = release.trim().split(|c: char| !c.is_ascii_digit());
        let major = split.next()?.parse().ok()?;
        let minor = split.next()?.parse().ok()?;

        Some(Self { major, minor })
    }

    pub fn supports_gpu_busy(&self) -> bool {
        *self >= Self::GPU_BUSY
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_release() {
        assert_eq!(KernelVersion::parse("6.8.0-45-generic"), Some(KernelVersion::new(6, 8)));
        assert_eq!(KernelVersion::parse("4.19.0"), Some(KernelVersion::new(4, 19)));
        assert_eq!(KernelVersion::parse("5.15.153.1-microsoft-standard-WSL2"), Some(KernelVersion::new(5, 15)));
        assert_eq!(KernelVersion::parse("6"), None);
        assert_eq!(KernelVersion::parse("linux"), None);
    }

    #[test]
    fn ordering() {
        assert!(KernelVersion::new(4, 9) < KernelVersion::new(4, 19));
        assert!(KernelVersion::new(5, 0) > KernelVersion::new(4, 19));
        assert!(!KernelVersion::new(4, 18).supports_gpu_busy());
        assert!(KernelVersion::new(4, 19).supports_gpu_busy());
        assert!(KernelVersion::new(4, 7) < KernelVersion::MIN_SUPPORTED);
    }
}
