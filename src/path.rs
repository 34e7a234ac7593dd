//! Path descriptors: the dependency paths a trigger expression reads.
//!
//! A descriptor is a non-empty list of steps from the root context to a
//! watched value. A step marked [`StepKind::Collection`] says the property
//! holds a collection and the remaining steps apply to every member.
//!
//! The text form is dot separated, with `[]` after a collection step:
//! `"orders[].total"`.

use std::{fmt, str::FromStr};

use smallvec::SmallVec;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepKind {
    Property,
    Collection,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathStep {
    name: Box<str>,
    kind: StepKind,
}

impl PathStep {
    pub fn property(name: impl Into<Box<str>>) -> Self {
        Self {
            name: name.into(),
            kind: StepKind::Property,
        }
    }

    pub fn collection(name: impl Into<Box<str>>) -> Self {
        Self {
            name: name.into(),
            kind: StepKind::Collection,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }

    pub fn is_collection(&self) -> bool {
        self.kind == StepKind::Collection
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathDescriptor {
    steps: SmallVec<[PathStep; 4]>,
}

impl PathDescriptor {
    pub fn new(steps: impl IntoIterator<Item = PathStep>) -> Result<Self> {
        let steps: SmallVec<[PathStep; 4]> = steps.into_iter().collect();
        let path = Self { steps };
        if path.steps.is_empty() {
            return Err(Error::InvalidPath {
                path: String::new(),
                reason: "path has no steps",
            });
        }
        if let Some(step) = path.steps.iter().find(|step| !valid_name(&step.name)) {
            return Err(Error::InvalidPath {
                path: path.to_string(),
                reason: if step.name.is_empty() {
                    "empty property name"
                } else {
                    "property names may not contain `.`, `[`, `]` or whitespace"
                },
            });
        }
        Ok(path)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidPath {
            path: text.to_owned(),
            reason,
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(invalid("path has no steps"));
        }

        let mut steps = SmallVec::new();
        for segment in text.split('.') {
            let segment = segment.trim();
            let step = match segment.strip_suffix("[]") {
                Some(name) => PathStep::collection(name),
                None => PathStep::property(segment),
            };
            if step.name.is_empty() {
                return Err(invalid("empty property name"));
            }
            if !valid_name(&step.name) {
                return Err(invalid(
                    "property names may not contain `.`, `[`, `]` or whitespace",
                ));
            }
            steps.push(step);
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false: descriptors are validated non-empty on construction.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c == '.' || c == '[' || c == ']' || c.is_whitespace())
}

impl fmt::Display for PathDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&step.name)?;
            if step.is_collection() {
                f.write_str("[]")?;
            }
        }
        Ok(())
    }
}

impl FromStr for PathDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Anything that resolves to a list of dependency paths.
///
/// This is where an expression analyzer plugs in: whatever it produces only
/// has to convert into descriptors.
pub trait IntoPaths {
    fn into_paths(self) -> Result<Vec<PathDescriptor>>;
}

impl IntoPaths for PathDescriptor {
    fn into_paths(self) -> Result<Vec<PathDescriptor>> {
        Ok(vec![self])
    }
}

impl IntoPaths for &PathDescriptor {
    fn into_paths(self) -> Result<Vec<PathDescriptor>> {
        Ok(vec![self.clone()])
    }
}

impl IntoPaths for &str {
    fn into_paths(self) -> Result<Vec<PathDescriptor>> {
        Ok(vec![PathDescriptor::parse(self)?])
    }
}

impl IntoPaths for String {
    fn into_paths(self) -> Result<Vec<PathDescriptor>> {
        self.as_str().into_paths()
    }
}

impl IntoPaths for () {
    fn into_paths(self) -> Result<Vec<PathDescriptor>> {
        Ok(Vec::new())
    }
}

impl<T: IntoPaths> IntoPaths for Vec<T> {
    fn into_paths(self) -> Result<Vec<PathDescriptor>> {
        let mut paths = Vec::with_capacity(self.len());
        for item in self {
            paths.extend(item.into_paths()?);
        }
        Ok(paths)
    }
}

impl<T: IntoPaths, const N: usize> IntoPaths for [T; N] {
    fn into_paths(self) -> Result<Vec<PathDescriptor>> {
        Vec::from(self).into_paths()
    }
}

impl<T: IntoPaths + Clone> IntoPaths for &[T] {
    fn into_paths(self) -> Result<Vec<PathDescriptor>> {
        self.to_vec().into_paths()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_collection_steps() {
        let path = PathDescriptor::parse("orders[].customer.name").unwrap();
        assert_eq!(
            path.steps(),
            &[
                PathStep::collection("orders"),
                PathStep::property("customer"),
                PathStep::property("name"),
            ]
        );
        assert_eq!(path.steps()[0].kind(), StepKind::Collection);
        assert_eq!(path.steps()[1].kind(), StepKind::Property);
        assert_eq!(path.to_string(), "orders[].customer.name");
    }

    #[test]
    fn rejects_malformed_text() {
        for text in ["", "  ", "a..b", "a.", "[]", "a[0]", "a b"] {
            assert!(
                matches!(
                    PathDescriptor::parse(text),
                    Err(Error::InvalidPath { .. })
                ),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_empty_step_lists() {
        assert!(PathDescriptor::new(Vec::new()).is_err());
        assert!(PathDescriptor::new([PathStep::property("")]).is_err());
        assert!(PathDescriptor::new([PathStep::property("flag")]).is_ok());
    }

    #[test]
    fn collects_paths_from_lists() {
        let paths = ["flag", "nested.int"].into_paths().unwrap();
        assert_eq!(paths.len(), 2);
        assert!(["flag", ""].into_paths().is_err());
        assert!(().into_paths().unwrap().is_empty());
    }
}
