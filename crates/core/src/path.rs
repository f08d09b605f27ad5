//! Structural paths into values.
//!
//! Paths are carried as data on every validation error and rendered only
//! at presentation time, e.g. `users[0].addresses['home'].zip`.

use std::fmt;

use crate::error::{CtyError, ErrorKind};
use crate::values::Value;

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Object attribute access.
    Attr(String),
    /// List or tuple index.
    Index(usize),
    /// Map key access.
    Key(String),
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Attr(name) => write!(f, ".{}", name),
            PathStep::Index(i) => write!(f, "[{}]", i),
            PathStep::Key(k) => write!(f, "['{}']", k),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    pub fn root() -> Self {
        Path::default()
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn attr(mut self, name: impl Into<String>) -> Self {
        self.steps.push(PathStep::Attr(name.into()));
        self
    }

    pub fn index(mut self, i: usize) -> Self {
        self.steps.push(PathStep::Index(i));
        self
    }

    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.steps.push(PathStep::Key(k.into()));
        self
    }

    /// Insert a step in front of the existing ones. Used when an error
    /// bubbles out of a child validator.
    pub fn prepend(&mut self, step: PathStep) {
        self.steps.insert(0, step);
    }

    /// Walk `value` along this path.
    ///
    /// Null and unknown intermediates yield null or unknown values of the
    /// addressed type, exactly like the per-step accessors on [`Value`].
    pub fn apply(&self, value: &Value) -> Result<Value, CtyError> {
        let mut current = value.clone();
        for (depth, step) in self.steps.iter().enumerate() {
            let next = match step {
                PathStep::Attr(name) => current.get_attr(name),
                PathStep::Index(i) => current.index(*i),
                PathStep::Key(k) => current.get_key(k),
            };
            current = next.map_err(|e| {
                let walked = Path {
                    steps: self.steps[..depth].to_vec(),
                };
                CtyError::new(e.kind(), e.message().to_string()).with_path(walked)
            })?;
        }
        Ok(current)
    }
}

impl From<Vec<PathStep>> for Path {
    fn from(steps: Vec<PathStep>) -> Self {
        Path { steps }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "(root)");
        }
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Attr(name) if i == 0 => write!(f, "{}", name)?,
                other => write!(f, "{}", other)?,
            }
        }
        Ok(())
    }
}

// Used when a path lookup fails on a value kind that has no such step.
pub(crate) fn step_error(step: &PathStep, message: impl Into<String>) -> CtyError {
    let kind = match step {
        PathStep::Attr(_) => ErrorKind::AttributeValidation,
        PathStep::Index(_) => ErrorKind::ListValidation,
        PathStep::Key(_) => ErrorKind::MapValidation,
    };
    CtyError::new(kind, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_path_display() {
        assert_eq!(Path::root().to_string(), "(root)");
    }

    #[test]
    fn mixed_path_display() {
        let p = Path::root().attr("users").index(1).key("name");
        assert_eq!(p.to_string(), "users[1]['name']");

        let p = Path::root()
            .attr("users")
            .index(0)
            .attr("addresses")
            .key("home")
            .attr("zip");
        assert_eq!(p.to_string(), "users[0].addresses['home'].zip");
    }

    #[test]
    fn leading_index_and_key() {
        assert_eq!(Path::root().index(0).attr("name").to_string(), "[0].name");
        assert_eq!(Path::root().key("config-key").to_string(), "['config-key']");
    }

    #[test]
    fn prepend_builds_outside_in() {
        let mut p = Path::root().attr("retries");
        p.prepend(PathStep::Index(1));
        p.prepend(PathStep::Attr("config".into()));
        assert_eq!(p.to_string(), "config[1].retries");
    }
}
