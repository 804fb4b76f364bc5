//! Argument construction for TauDEM tools.
//!
//! Every file path a tool reads or writes is derived here from the session;
//! stage builders never join project paths themselves. Tokens stay structured
//! so they can be handed to the process launcher without a shell, and render
//! as `" -flag value"` for logs.
use crate::session::Session;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

/// Raster extension used when a role does not name one.
pub const DEFAULT_EXT: &str = "tif";

/// Extension of outlet point files.
pub const SHAPE_EXT: &str = "shp";

/// Value following a flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Path(PathBuf),
    Literal(String),
}

/// One `-flag [value]` pair on a tool command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgToken {
    flag: String,
    value: Option<ArgValue>,
}

impl ArgToken {
    /// A bare switch such as `-nc`.
    pub fn switch(flag: &str) -> Self {
        Self {
            flag: flag.to_string(),
            value: None,
        }
    }

    pub fn path(flag: &str, path: PathBuf) -> Self {
        Self {
            flag: flag.to_string(),
            value: Some(ArgValue::Path(path)),
        }
    }

    pub fn literal(flag: &str, value: impl ToString) -> Self {
        Self {
            flag: flag.to_string(),
            value: Some(ArgValue::Literal(value.to_string())),
        }
    }

    pub fn flag(&self) -> &str {
        &self.flag
    }

    pub fn value(&self) -> Option<&ArgValue> {
        self.value.as_ref()
    }

    /// Process arguments for this token, flag first.
    pub fn to_os_args(&self) -> Vec<OsString> {
        let mut out = vec![OsString::from(format!("-{}", self.flag))];
        match &self.value {
            Some(ArgValue::Path(path)) => out.push(path.clone().into_os_string()),
            Some(ArgValue::Literal(text)) => out.push(OsString::from(text)),
            None => {}
        }
        out
    }

    /// Lossy string arguments, used for command-line provenance.
    pub fn to_display_args(&self) -> Vec<String> {
        self.to_os_args()
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for ArgToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " -{}", self.flag)?;
        match &self.value {
            Some(ArgValue::Path(path)) => write!(f, " {}", path.display()),
            Some(ArgValue::Literal(text)) => write!(f, " {text}"),
            None => Ok(()),
        }
    }
}

/// Ordered argument tokens for one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgList {
    tokens: Vec<ArgToken>,
}

impl ArgList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: ArgToken) {
        self.tokens.push(token);
    }

    /// Push the token when present; absent optional arguments add nothing.
    pub fn push_opt(&mut self, token: Option<ArgToken>) {
        if let Some(token) = token {
            self.tokens.push(token);
        }
    }

    pub fn tokens(&self) -> &[ArgToken] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Flags in command-line order.
    pub fn flags(&self) -> Vec<&str> {
        self.tokens.iter().map(ArgToken::flag).collect()
    }

    pub fn to_os_args(&self) -> Vec<OsString> {
        self.tokens.iter().flat_map(ArgToken::to_os_args).collect()
    }

    pub fn to_display_args(&self) -> Vec<String> {
        self.tokens
            .iter()
            .flat_map(ArgToken::to_display_args)
            .collect()
    }
}

impl fmt::Display for ArgList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

/// Start a file argument for `role`.
///
/// Defaults: suffix equals the role, extension `tif`, basename is the DEM
/// name. `file_arg(&session, "fel").build()` renders as
/// ` -fel {project}/{dem}fel.tif`.
pub fn file_arg<'a>(session: &'a Session, role: &'a str) -> FileArg<'a> {
    FileArg {
        session,
        role,
        suffix: None,
        ext: DEFAULT_EXT,
        basename: None,
    }
}

/// Builder for a project file argument; see [`file_arg`].
#[derive(Debug, Clone, Copy)]
pub struct FileArg<'a> {
    session: &'a Session,
    role: &'a str,
    suffix: Option<&'a str>,
    ext: &'a str,
    basename: Option<&'a str>,
}

impl<'a> FileArg<'a> {
    pub fn suffix(mut self, suffix: &'a str) -> Self {
        self.suffix = Some(suffix);
        self
    }

    pub fn ext(mut self, ext: &'a str) -> Self {
        self.ext = ext;
        self
    }

    /// Replace the DEM name as the file basename.
    pub fn basename(mut self, basename: &'a str) -> Self {
        self.basename = Some(basename);
        self
    }

    pub fn build(self) -> ArgToken {
        let basename = self.basename.unwrap_or(self.session.dem());
        let suffix = self.suffix.unwrap_or(self.role);
        let file_name = format!("{basename}{suffix}.{}", self.ext);
        ArgToken::path(self.role, self.session.project_dir().join(file_name))
    }
}

/// `-o {project}/{outlet}.shp`, or nothing when no outlet is given.
pub fn outlet_arg(session: &Session, outlet: Option<&str>) -> Option<ArgToken> {
    outlet.map(|name| {
        ArgToken::path(
            "o",
            session
                .project_dir()
                .join(format!("{name}.{SHAPE_EXT}")),
        )
    })
}
