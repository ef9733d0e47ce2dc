//! Runtime version detection (spec.md §6): parses a version string of the
//! form `goX.Y[.Z | betaN | rcN]`, or a development marker (prefix
//! `devel`), into a comparable `(major, minor, patch, beta, rc)` tuple.
//! Development builds compare greater-or-equal to every released version.

use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PreRelease {
    /// A final release: "go1.5", "go1.5.2".
    Final,
    Beta(u32),
    Rc(u32),
}

impl PreRelease {
    /// Ordering key: betas sort before rcs, which sort before final, for a
    /// given (major, minor, patch).
    fn rank(self) -> (u8, u32) {
        match self {
            PreRelease::Beta(n) => (0, n),
            PreRelease::Rc(n) => (1, n),
            PreRelease::Final => (2, 0),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RuntimeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pre: PreRelease,
    /// A `devel ...` build; compares greater-or-equal to every released
    /// version regardless of the numeric fields parsed alongside it.
    pub devel: bool,
}

impl RuntimeVersion {
    pub fn parse(s: &str) -> Option<RuntimeVersion> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("devel") {
            // "devel +abcdef1 ..." or similar; the numeric fields are not
            // meaningful, only the devel flag is.
            let _ = rest;
            return Some(RuntimeVersion {
                major: u32::MAX,
                minor: u32::MAX,
                patch: u32::MAX,
                pre: PreRelease::Final,
                devel: true,
            });
        }

        let rest = s.strip_prefix("go")?;
        let (numeric_part, pre) = if let Some(idx) = rest.find("beta") {
            let n: u32 = rest[idx + 4..].parse().unwrap_or(0);
            (&rest[..idx], PreRelease::Beta(n))
        } else if let Some(idx) = rest.find("rc") {
            let n: u32 = rest[idx + 2..].parse().unwrap_or(0);
            (&rest[..idx], PreRelease::Rc(n))
        } else {
            (rest, PreRelease::Final)
        };

        let mut parts = numeric_part.split('.');
        let major: u32 = parts.next()?.parse().ok()?;
        let minor: u32 = parts.next().unwrap_or("0").parse().ok()?;
        let patch: u32 = parts.next().unwrap_or("0").parse().ok()?;

        Some(RuntimeVersion {
            major,
            minor,
            patch,
            pre,
            devel: false,
        })
    }
}

impl Ord for RuntimeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.devel, other.devel) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => (self.major, self.minor, self.patch, self.pre.rank()).cmp(&(
                other.major,
                other.minor,
                other.patch,
                other.pre.rank(),
            )),
        }
    }
}

impl PartialOrd for RuntimeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go1_5_is_at_least_go1_4_2() {
        let a = RuntimeVersion::parse("go1.5").unwrap();
        let b = RuntimeVersion::parse("go1.4.2").unwrap();
        assert!(a >= b);
    }

    #[test]
    fn beta_sorts_before_final() {
        let beta = RuntimeVersion::parse("go1.5beta2").unwrap();
        let final_ = RuntimeVersion::parse("go1.5").unwrap();
        assert!(beta < final_);
    }

    #[test]
    fn devel_compares_greater_than_any_release() {
        let devel = RuntimeVersion::parse("devel +abc1234 Mon Jan 1").unwrap();
        let latest = RuntimeVersion::parse("go99.99.99").unwrap();
        assert!(devel >= latest);
    }

    #[test]
    fn rc_sorts_between_beta_and_final() {
        let beta = RuntimeVersion::parse("go1.20beta1").unwrap();
        let rc = RuntimeVersion::parse("go1.20rc1").unwrap();
        let final_ = RuntimeVersion::parse("go1.20").unwrap();
        assert!(beta < rc);
        assert!(rc < final_);
    }

    #[test]
    fn missing_patch_defaults_to_zero() {
        let v = RuntimeVersion::parse("go1.17").unwrap();
        assert_eq!(v.patch, 0);
    }
}
