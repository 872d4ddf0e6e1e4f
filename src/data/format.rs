use std::fmt;

// ---------------------------------------------------------------------------
// SpecFormat – named spectral data formats understood by the viewer
// ---------------------------------------------------------------------------

/// Spectral data format used to pick the right reader in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecFormat {
    ApogeeVisit,
    ApogeeStar,
    SdssSpec,
    /// Astra `mwmStar` / `mwmVisit` files; every extension is read.
    SdssVMwm,
}

impl SpecFormat {
    /// The loader name the visualization session expects.
    pub fn name(&self) -> &'static str {
        match self {
            SpecFormat::ApogeeVisit => "APOGEE apVisit",
            SpecFormat::ApogeeStar => "APOGEE apStar",
            SpecFormat::SdssSpec => "SDSS-III/IV spec",
            SpecFormat::SdssVMwm => "SDSS-V mwm",
        }
    }
}

impl fmt::Display for SpecFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Classification table
// ---------------------------------------------------------------------------

/// Path patterns checked in order; the first match wins, so the more
/// specific instrument/pipeline patterns come first.
const FORMAT_PATTERNS: &[(&str, SpecFormat)] = &[
    ("*apogee/*/dr17/visit*", SpecFormat::ApogeeVisit),
    ("*apogee/*/dr17/stars*", SpecFormat::ApogeeStar),
    ("*dr17/eboss/spectro*", SpecFormat::SdssSpec),
    ("*astra/*/mwmStar*", SpecFormat::SdssVMwm),
    ("*astra/*/mwmVisit*", SpecFormat::SdssVMwm),
];

/// Label substrings marking a file with several visits/exposures.
const MULTI_VISIT_MARKERS: &[&str] = &["mwmVisit", "apVisit"];

/// Classify a file location by path pattern. `None` lets the session
/// fall back to its own format auto-detection.
pub fn classify(location: &str) -> Option<SpecFormat> {
    FORMAT_PATTERNS
        .iter()
        .find(|(pattern, _)| glob_match(pattern, location))
        .map(|(_, format)| *format)
}

/// Whether a data label names a multi-visit file that must be loaded as a list.
pub fn is_multi_visit(label: &str) -> bool {
    MULTI_VISIT_MARKERS.iter().any(|m| label.contains(m))
}

/// Shell-style wildcard match over the whole string.
///
/// `*` matches any run of characters (path separators included) and `?`
/// matches exactly one character; everything else is literal.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0usize, 0usize);
    // Position of the last `*` seen and the text index it is anchored to.
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        match p.get(pi) {
            Some('*') => {
                backtrack = Some((pi, ti));
                pi += 1;
            }
            Some(&c) if c == '?' || c == t[ti] => {
                pi += 1;
                ti += 1;
            }
            _ => match backtrack {
                Some((star, anchored)) => {
                    pi = star + 1;
                    ti = anchored + 1;
                    backtrack = Some((star, anchored + 1));
                }
                None => return false,
            },
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_paths() {
        assert_eq!(
            classify("/sas/apogee/x/dr17/visit/y.fits"),
            Some(SpecFormat::ApogeeVisit)
        );
        assert_eq!(
            classify("/sas/apogee/x/dr17/stars/y.fits"),
            Some(SpecFormat::ApogeeStar)
        );
        assert_eq!(
            classify("/sas/dr17/eboss/spectro/z.fits"),
            Some(SpecFormat::SdssSpec)
        );
        assert_eq!(
            classify("/sas/astra/x/mwmStar-y.fits"),
            Some(SpecFormat::SdssVMwm)
        );
        assert_eq!(
            classify("/sas/astra/0.5.0/spectra/mwmVisit-0.5.0-123.fits"),
            Some(SpecFormat::SdssVMwm)
        );
        assert_eq!(classify("unrelated/path.fits"), None);
    }

    #[test]
    fn test_format_names() {
        assert_eq!(SpecFormat::ApogeeVisit.name(), "APOGEE apVisit");
        assert_eq!(SpecFormat::ApogeeStar.to_string(), "APOGEE apStar");
        assert_eq!(SpecFormat::SdssSpec.name(), "SDSS-III/IV spec");
        assert_eq!(SpecFormat::SdssVMwm.name(), "SDSS-V mwm");
    }

    #[test]
    fn test_first_pattern_wins() {
        // Satisfies both the apVisit and the eboss pattern.
        let path = "/apogee/a/dr17/visit/dr17/eboss/spectro/x.fits";
        assert_eq!(classify(path), Some(SpecFormat::ApogeeVisit));
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*", ""));
        assert!(glob_match("a*c", "abbbc"));
        assert!(glob_match("a*c", "a/b/c"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
        assert!(!glob_match("abc", "abcd"));
        assert!(glob_match("*b*b*", "abxxb"));
        assert!(!glob_match("*astra/*/mwmStar*", "astra/mwmStar.fits"));
    }

    #[test]
    fn test_multi_visit_markers() {
        assert!(is_multi_visit("mwmVisit-0.5.0-27021597917837494"));
        assert!(is_multi_visit("apVisit-dr17-1234"));
        assert!(!is_multi_visit("mwmStar-0.5.0-27021597917837494"));
        assert!(!is_multi_visit("apStar-dr17-1234"));
    }
}
