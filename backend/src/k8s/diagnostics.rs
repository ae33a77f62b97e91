//! Warnings collected while projecting a container spec onto Kubernetes objects
//!
//! Invalid input is filtered silently as far as success/failure goes; the
//! reasons end up here so callers can surface them.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Bind entry is not `source:dest[:mode]`
    MalformedBind(String),
    /// Bind source does not resolve on the local filesystem
    UnresolvableBind { bind: String, reason: String },
    /// Network alias is not a valid DNS label
    InvalidAlias(String),
    /// Port key is not `port[/proto]` with a valid port number
    InvalidPort(String),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedBind(bind) => write!(f, "malformed bind {:?}", bind),
            Diagnostic::UnresolvableBind { bind, reason } => {
                write!(f, "skipping bind {:?}: {}", bind, reason)
            }
            Diagnostic::InvalidAlias(alias) => {
                write!(f, "ignoring network alias {:?}: not a valid DNS label", alias)
            }
            Diagnostic::InvalidPort(port) => write!(f, "ignoring invalid port {:?}", port),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}
