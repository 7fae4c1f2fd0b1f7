//! Path fragments, parameter validators and the matcher compiler.

use std::fmt::{self, Display, Formatter};

use fnv::FnvHashMap;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::{error::BuildError, Config, Result};

static PARAM_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+$").unwrap());

/// Matches the optional `.type` suffix.
const TYPE_SUFFIX: &str = r"\.\w+";

/// A regular expression that a path parameter must match in full.
///
/// The source may not contain capturing groups, use `(?:...)` instead. Each
/// parameter owns exactly one capture in the compiled matcher.
#[derive(Debug, Clone)]
pub struct Validator {
    source: String,
}

impl Validator {
    /// Create a validator from a regular expression source.
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        if source.is_empty() {
            return Err(BuildError::InvalidArgument(
                "validator must not be empty".to_string(),
            ));
        }

        let re = Regex::new(&format!("^(?:{})$", source)).map_err(|err| {
            BuildError::InvalidArgument(format!("invalid validator `{}`: {}", source, err))
        })?;
        if re.captures_len() > 1 {
            return Err(BuildError::InvalidArgument(format!(
                "validator `{}` must not contain capturing groups",
                source
            )));
        }

        Ok(Self { source })
    }

    /// One or more ASCII digits.
    pub fn digits() -> Self {
        Self {
            source: r"\d+".to_string(),
        }
    }

    /// One or more word characters.
    pub fn word() -> Self {
        Self {
            source: r"\w+".to_string(),
        }
    }

    /// Any non-empty segment.
    pub fn segment() -> Self {
        Self {
            source: "[^/]+".to_string(),
        }
    }

    /// Returns the regular expression source.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for Validator {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Validator {}

/// One segment of a resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// A literal segment, matched case-insensitively.
    Static(String),
    /// A named parameter.
    Param {
        /// Parameter name.
        name: String,
        /// Accepted values.
        validator: Validator,
    },
}

impl Fragment {
    /// Returns the parameter name if this is a parameter fragment.
    pub fn param_name(&self) -> Option<&str> {
        match self {
            Fragment::Param { name, .. } => Some(name.as_str()),
            Fragment::Static(_) => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Fragment::Static(segment) => regex::escape(segment),
            Fragment::Param { validator, .. } => format!("((?:{}))", validator.as_str()),
        }
    }
}

impl Display for Fragment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Fragment::Static(segment) => f.write_str(segment),
            Fragment::Param { name, .. } => write!(f, ":{}", name),
        }
    }
}

/// A declared path parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    /// Accepted values.
    pub validator: Validator,
    /// The capture ordinal of this parameter in the compiled matcher.
    pub index: Option<usize>,
    /// The position among the path segments after the base path and version.
    pub segment: Option<usize>,
}

/// Declared parameters, keyed by name.
pub type ParamMap = FnvHashMap<String, ParamSpec>;

/// Appends a literal segment.
pub fn append_static(fragments: &mut Vec<Fragment>, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(BuildError::InvalidArgument(
            "path segment must be a non-empty string".to_string(),
        ));
    }
    if segment.contains('/') {
        return Err(BuildError::InvalidArgument(format!(
            "path segment `{}` must not contain `/`",
            segment
        )));
    }
    fragments.push(Fragment::Static(segment.to_string()));
    Ok(())
}

/// Declares a parameter whose position is not known yet.
pub fn declare_param(params: &mut ParamMap, name: &str, validator: Validator) -> Result<()> {
    if !PARAM_NAME.is_match(name) {
        return Err(BuildError::InvalidArgument(format!(
            "invalid parameter name `{}`",
            name
        )));
    }
    if params.contains_key(name) {
        return Err(BuildError::DuplicateParam(name.to_string()));
    }
    params.insert(
        name.to_string(),
        ParamSpec {
            validator,
            index: None,
            segment: None,
        },
    );
    Ok(())
}

/// Parses `template` onto the end of `fragments` and resolves the position
/// of every `:name` token it contains.
///
/// Positions count over the whole accumulated sequence, so a token placed
/// after `/products/:id` gets capture index `1`.
pub fn resolve_param_indices(
    template: &str,
    fragments: &mut Vec<Fragment>,
    params: &mut ParamMap,
) -> Result<()> {
    let pieces: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();
    if pieces.is_empty() {
        return Err(BuildError::InvalidArgument(format!(
            "template `{}` has no segments",
            template
        )));
    }

    let mut captures = fragments
        .iter()
        .filter(|fragment| fragment.param_name().is_some())
        .count();

    for piece in pieces {
        let name = match piece.strip_prefix(':') {
            Some(name) => name,
            None => {
                append_static(fragments, piece)?;
                continue;
            }
        };

        if !PARAM_NAME.is_match(name) {
            return Err(BuildError::InvalidArgument(format!(
                "invalid parameter token `{}` in `{}`",
                piece, template
            )));
        }

        let spec = params
            .get_mut(name)
            .ok_or_else(|| BuildError::UnknownParam(name.to_string()))?;
        if spec.index.is_some() {
            return Err(BuildError::DuplicateParam(name.to_string()));
        }
        spec.index = Some(captures);
        spec.segment = Some(fragments.len());
        fragments.push(Fragment::Param {
            name: name.to_string(),
            validator: spec.validator.clone(),
        });
        captures += 1;
    }

    Ok(())
}

/// Compiles the fragments under `config` into an anchored matcher.
pub fn compile(fragments: &[Fragment], config: &Config) -> Result<Matcher> {
    let mut segments = Vec::with_capacity(fragments.len() + 2);
    if let Some(base_path) = &config.base_path {
        segments.push(regex::escape(base_path));
    }
    if let Some(version) = &config.version {
        segments.push(regex::escape(version));
    }
    segments.extend(fragments.iter().map(Fragment::render));

    let mut pattern = String::from("^/");
    pattern.push_str(&segments.join("/"));
    if config.type_suffix {
        pattern.push_str(TYPE_SUFFIX);
    }
    pattern.push('$');

    let regex = RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|err| BuildError::InvalidArgument(format!("invalid path pattern: {}", err)))?;
    Ok(Matcher { regex })
}

/// An anchored, case-insensitive whole-path matcher.
#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
}

impl Matcher {
    /// Returns the pattern source.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Returns `true` if the whole `path` matches.
    #[inline]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Returns the number of parameter captures.
    #[inline]
    pub fn captures_len(&self) -> usize {
        self.regex.captures_len() - 1
    }

    /// Returns the captured parameter values in order, or `None` if `path`
    /// does not match.
    pub fn captures<'a>(&self, path: &'a str) -> Option<Vec<Option<&'a str>>> {
        self.regex.captures(path).map(|caps| {
            caps.iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str()))
                .collect()
        })
    }
}

impl Display for Matcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
