//! PEP 440 style version identifiers.
//!
//! Parsing is case-insensitive and keeps the original punctuation, so that
//! `Version::parse(s)?.to_string() == s` for any accepted `s` without a
//! leading `v` or a zero epoch. [Version::normalize] produces the canonical
//! spelling and [Version::update] applies bump specifiers such as `post` or
//! `minor.dev`.

use crate::domain::segment::{Segment, SegmentNumber};
use crate::error::{Result, ScmverError};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?xi)
        \A
        v?
        (?: (?P<epoch>[0-9]+) ! )?
        (?P<release> [0-9]+ (?:\.[0-9]+)* )
        (?:
            (?P<pre_sep>[-._])?
            (?P<pre_s> alpha | a | beta | b | preview | pre | rc | c )
            (?P<pre_opt_sep>[-._])?
            (?P<pre_n>[0-9]*)
        )?
        (?:
            (?:
                (?P<post_sep>[-._])?
                (?P<post_s> post | rev | r )
                (?P<post_opt_sep>[-._])?
                (?P<post_n>[0-9]*)
            )
            |
            (?: - (?P<post_implicit>[0-9]+) )
        )?
        (?:
            (?P<dev_sep>[-._])?
            (?P<dev_s> dev )
            (?P<dev_opt_sep>[-._])?
            (?P<dev_n>[0-9]*)
        )?
        (?: \+ (?P<local> [a-z0-9] (?: [-_.a-z0-9]* [a-z0-9] )? ) )?
        \z",
    )
    .unwrap()
});

/// Release component addressed by a bump specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleasePart {
    Major,
    Minor,
    Micro,
}

impl ReleasePart {
    fn index(self) -> usize {
        match self {
            ReleasePart::Major => 0,
            ReleasePart::Minor => 1,
            ReleasePart::Micro => 2,
        }
    }
}

impl FromStr for ReleasePart {
    type Err = ScmverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "major" => Ok(ReleasePart::Major),
            "minor" => Ok(ReleasePart::Minor),
            "micro" | "patch" => Ok(ReleasePart::Micro),
            _ => Err(ScmverError::version("invalid segment specifier")),
        }
    }
}

/// What [Version::update] changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpSpec {
    /// Empty specifier, leaves the version alone
    Keep,
    Release(ReleasePart),
    Pre,
    Post,
    Dev,
    /// `major.dev`, `minor.dev`, `micro.dev`, `patch.dev`
    ReleaseDev(ReleasePart),
}

impl FromStr for BumpSpec {
    type Err = ScmverError;

    fn from_str(s: &str) -> Result<Self> {
        let spec = s.trim().to_lowercase();
        match spec.as_str() {
            "" => Ok(BumpSpec::Keep),
            "pre" => Ok(BumpSpec::Pre),
            "post" => Ok(BumpSpec::Post),
            "dev" => Ok(BumpSpec::Dev),
            other => {
                if let Some(part) = other.strip_suffix(".dev") {
                    Ok(BumpSpec::ReleaseDev(part.parse()?))
                } else {
                    other.parse().map(BumpSpec::Release).map_err(|_| {
                        ScmverError::version(format!("unknown version specifier: '{}'", s))
                    })
                }
            }
        }
    }
}

/// A parsed version identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<Segment>,
    post: Option<Segment>,
    dev: Option<Segment>,
    local: Option<String>,
}

impl Version {
    /// Parse a version string such as `1!2.0rc1.post3.dev4+ubuntu.1`
    pub fn parse(text: &str) -> Result<Self> {
        text.parse()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn local(&self) -> Option<&str> {
        self.local.as_deref()
    }

    pub fn pre_segment(&self) -> Option<&Segment> {
        self.pre.as_ref()
    }

    pub fn post_segment(&self) -> Option<&Segment> {
        self.post.as_ref()
    }

    pub fn dev_segment(&self) -> Option<&Segment> {
        self.dev.as_ref()
    }

    /// Pre-release stage label and number
    pub fn pre(&self) -> Option<(&str, SegmentNumber)> {
        self.pre.as_ref().map(|s| (s.label.as_str(), s.number))
    }

    /// Post-release label and number; the label is `None` for `1.0-1`
    pub fn post(&self) -> Option<(Option<&str>, SegmentNumber)> {
        self.post.as_ref().map(|s| {
            let label = if s.is_implicit() {
                None
            } else {
                Some(s.label.as_str())
            };
            (label, s.number)
        })
    }

    /// Development release label and number
    pub fn dev(&self) -> Option<(&str, SegmentNumber)> {
        self.dev.as_ref().map(|s| (s.label.as_str(), s.number))
    }

    /// Returns the PEP 440 canonical form of this version.
    ///
    /// - `1.0-alpha` becomes `1.0a0`
    /// - `1.0-1` becomes `1.0.post1`
    /// - `1.0+2019-02-10` becomes `1.0+2019.2.10`
    pub fn normalize(&self) -> Version {
        let pre = self.pre.as_ref().map(|s| {
            let lower = s.label.to_lowercase();
            let label = canonical_pre_label(&lower);
            Segment::new(
                "",
                label,
                "",
                SegmentNumber::Numbered(s.number.value_or_zero()),
            )
        });
        let post = self.post.as_ref().map(|s| {
            Segment::new(
                ".",
                "post",
                "",
                SegmentNumber::Numbered(s.number.value_or_zero()),
            )
        });
        let dev = self.dev.as_ref().map(|s| {
            Segment::new(
                ".",
                "dev",
                "",
                SegmentNumber::Numbered(s.number.value_or_zero()),
            )
        });
        let local = self.local.as_ref().map(|l| {
            local_parts(&l.to_lowercase())
                .map(|part| {
                    if part.bytes().all(|b| b.is_ascii_digit()) {
                        let trimmed = part.trim_start_matches('0');
                        if trimmed.is_empty() {
                            "0".to_string()
                        } else {
                            trimmed.to_string()
                        }
                    } else {
                        part.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(".")
        });

        Version {
            epoch: self.epoch,
            release: self.release.clone(),
            pre,
            post,
            dev,
            local,
        }
    }

    /// Applies a bump specifier (`major`, `minor`, `micro`/`patch`, `pre`,
    /// `post`, `dev` or `<release>.dev`) with the given amount.
    ///
    /// Fails when the version has a local label, when `pre`/`dev` target a
    /// missing segment, or when `<release>.dev` gets a negative value.
    pub fn update(&mut self, spec: &str, value: i64) -> Result<()> {
        if self.local.is_some() {
            return Err(ScmverError::version("local version identifiers exists"));
        }
        self.apply(spec.parse()?, value)
    }

    /// Typed variant of [Version::update]
    pub fn apply(&mut self, spec: BumpSpec, value: i64) -> Result<()> {
        if self.local.is_some() {
            return Err(ScmverError::version("local version identifiers exists"));
        }

        match spec {
            BumpSpec::Keep => {}
            BumpSpec::Release(part) => self.bump_release(part.index(), value),
            BumpSpec::Pre => {
                let seg = self.pre.take().ok_or_else(|| {
                    ScmverError::version("pre-release segment does not exist")
                })?;
                let number = seg.number.bumped(value);
                self.pre = Some(seg.with_number(number));
            }
            BumpSpec::Dev => {
                let seg = self.dev.take().ok_or_else(|| {
                    ScmverError::version("development release segment does not exist")
                })?;
                let number = seg.number.bumped(value);
                self.dev = Some(seg.with_number(number));
            }
            BumpSpec::Post => {
                self.post = match self.post.take() {
                    Some(seg) if seg.is_implicit() => {
                        let number = seg.number.bumped_clamped(value);
                        Some(seg.with_number(number))
                    }
                    Some(seg) => {
                        let number = seg.number.bumped(value);
                        Some(seg.with_number(number))
                    }
                    None if value >= 0 => Some(Segment::new(
                        ".",
                        "post",
                        "",
                        SegmentNumber::fresh(value),
                    )),
                    None => None,
                };
            }
            BumpSpec::ReleaseDev(part) => {
                if value < 0 {
                    return Err(ScmverError::version("invalid value"));
                }
                let index = part.index();
                for component in self.release.iter_mut().skip(index + 1) {
                    *component = 0;
                }
                self.bump_release(index, 1);
                self.dev = Some(Segment::new(".", "dev", "", SegmentNumber::fresh(value)));
            }
        }
        Ok(())
    }

    /// Compares two versions by PEP 440 precedence.
    ///
    /// Unlike `==`, this ignores spelling: `1.0` and `1.0.0` compare equal,
    /// and `1.0.dev0 < 1.0a0 < 1.0 < 1.0.post0`.
    pub fn cmp_precedence(&self, other: &Version) -> Ordering {
        self.precedence_key().cmp(&other.precedence_key())
    }

    fn bump_release(&mut self, index: usize, value: i64) {
        while self.release.len() < index {
            self.release.push(0);
        }
        match self.release.get_mut(index) {
            Some(n) => *n = clamp_add(*n, value),
            None => self.release.push(clamp_add(0, value)),
        }
        self.pre = None;
        self.post = None;
        self.dev = None;
    }

    fn precedence_key(&self) -> PrecedenceKey {
        let mut release = self.release.clone();
        while release.len() > 1 && release.last() == Some(&0) {
            release.pop();
        }

        let pre = match &self.pre {
            None if self.post.is_none() && self.dev.is_some() => Bound::Min,
            None => Bound::Max,
            Some(s) => {
                let rank = match canonical_pre_label(&s.label.to_lowercase()) {
                    "a" => 0,
                    "b" => 1,
                    _ => 2,
                };
                Bound::Value((rank, s.number.value_or_zero()))
            }
        };
        let post = match &self.post {
            None => Bound::Min,
            Some(s) => Bound::Value(s.number.value_or_zero()),
        };
        let dev = match &self.dev {
            None => Bound::Max,
            Some(s) => Bound::Value(s.number.value_or_zero()),
        };
        let local = match &self.local {
            None => Bound::Min,
            Some(l) => Bound::Value(
                local_parts(&l.to_lowercase())
                    .map(|part| match part.parse::<u64>() {
                        Ok(n) => LocalPart::Number(n),
                        Err(_) => LocalPart::Text(part.to_string()),
                    })
                    .collect(),
            ),
        };

        PrecedenceKey {
            epoch: self.epoch,
            release,
            pre,
            post,
            dev,
            local,
        }
    }
}

impl FromStr for Version {
    type Err = ScmverError;

    fn from_str(text: &str) -> Result<Self> {
        let caps = VERSION_RE
            .captures(text.trim())
            .ok_or_else(|| ScmverError::parse(format!("{:?}", text)))?;

        let epoch = match caps.name("epoch") {
            Some(m) => parse_number(m.as_str(), text)?,
            None => 0,
        };
        let release = caps["release"]
            .split('.')
            .map(|n| parse_number(n, text))
            .collect::<Result<Vec<_>>>()?;

        let post = match caps.name("post_implicit") {
            Some(m) => Some(Segment::implicit_post(parse_number(m.as_str(), text)?)),
            None => segment(&caps, "post", text)?,
        };

        Ok(Version {
            epoch,
            release,
            pre: segment(&caps, "pre", text)?,
            post,
            dev: segment(&caps, "dev", text)?,
            local: caps.name("local").map(|m| m.as_str().to_string()),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", release.join("."))?;
        for seg in [&self.pre, &self.post, &self.dev].into_iter().flatten() {
            write!(f, "{}", seg)?;
        }
        if let Some(local) = &self.local {
            write!(f, "+{}", local)?;
        }
        Ok(())
    }
}

fn segment(caps: &Captures<'_>, group: &str, text: &str) -> Result<Option<Segment>> {
    let label = match caps.name(&format!("{}_s", group)) {
        Some(m) => m.as_str(),
        None => return Ok(None),
    };
    let sep = caps
        .name(&format!("{}_sep", group))
        .map_or("", |m| m.as_str());
    let opt_sep = caps
        .name(&format!("{}_opt_sep", group))
        .map_or("", |m| m.as_str());
    let number = match caps.name(&format!("{}_n", group)).map(|m| m.as_str()) {
        Some(n) if !n.is_empty() => SegmentNumber::Numbered(parse_number(n, text)?),
        _ => SegmentNumber::Unnumbered,
    };
    Ok(Some(Segment::new(sep, label, opt_sep, number)))
}

fn parse_number(digits: &str, text: &str) -> Result<u64> {
    digits
        .parse()
        .map_err(|_| ScmverError::parse(format!("{:?} (number out of range)", text)))
}

fn canonical_pre_label(label: &str) -> &str {
    match label {
        "alpha" => "a",
        "beta" => "b",
        "c" | "pre" | "preview" => "rc",
        other => other,
    }
}

fn local_parts(local: &str) -> impl Iterator<Item = &str> {
    local.split(['-', '_', '.'])
}

fn clamp_add(n: u64, value: i64) -> u64 {
    (n as i64).saturating_add(value).max(0) as u64
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Bound<T> {
    Min,
    Value(T),
    Max,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum LocalPart {
    Text(String),
    Number(u64),
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct PrecedenceKey {
    epoch: u64,
    release: Vec<u64>,
    pre: Bound<(u8, u64)>,
    post: Bound<u64>,
    dev: Bound<u64>,
    local: Bound<Vec<LocalPart>>,
}
