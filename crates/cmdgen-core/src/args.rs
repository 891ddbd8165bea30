//! Parameter objects to command-line tokens.
//!
//! Every workload kind lists its fields in one fixed order. Each field is
//! rendered whether or not it still holds its default, so a generated command
//! describes the whole configuration on its own.

use crate::error::{GenError, Result};
use crate::model::{TestDefinition, TestParams, WorkloadKind};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    /// `--name value`
    Long(&'static str),
    /// `-c value`
    Short(char),
    /// bare `value`
    Positional,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Str(String),
    UInt(u64),
    Int(i64),
    Bool(bool),
    Unset,
}

impl ArgValue {
    /// Text form of the value, or `None` when there is nothing to emit.
    pub fn render(&self) -> Option<String> {
        let text = match self {
            ArgValue::Str(v) => v.clone(),
            ArgValue::UInt(v) => v.to_string(),
            ArgValue::Int(v) => v.to_string(),
            ArgValue::Bool(v) => v.to_string(),
            ArgValue::Unset => return None,
        };
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Some(text) => f.write_str(&text),
            None => f.write_str("<unset>"),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_string())
    }
}

impl From<&String> for ArgValue {
    fn from(value: &String) -> Self {
        ArgValue::Str(value.clone())
    }
}

impl From<u32> for ArgValue {
    fn from(value: u32) -> Self {
        ArgValue::UInt(value.into())
    }
}

impl From<u64> for ArgValue {
    fn from(value: u64) -> Self {
        ArgValue::UInt(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl<T> From<Option<T>> for ArgValue
where
    T: Into<ArgValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ArgValue::Unset)
    }
}

/// One parameter field with its flag.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgField {
    pub name: &'static str,
    pub flag: Flag,
    pub value: ArgValue,
}

impl ArgField {
    pub fn long(name: &'static str, value: impl Into<ArgValue>) -> Self {
        Self {
            name,
            flag: Flag::Long(name),
            value: value.into(),
        }
    }

    pub fn short(name: &'static str, flag: char, value: impl Into<ArgValue>) -> Self {
        Self {
            name,
            flag: Flag::Short(flag),
            value: value.into(),
        }
    }

    pub fn positional(name: &'static str, value: impl Into<ArgValue>) -> Self {
        Self {
            name,
            flag: Flag::Positional,
            value: value.into(),
        }
    }

    fn render(&self, kind: WorkloadKind) -> Result<String> {
        let value = self.value.render().ok_or(GenError::UnformattableValue {
            kind,
            field: self.name,
        })?;
        Ok(match self.flag {
            Flag::Long(name) => format!("--{} {}", name, value),
            Flag::Short(c) => format!("-{} {}", c, value),
            Flag::Positional => value,
        })
    }
}

/// A workload kind's parameter object.
pub trait CmdArgs: Sized {
    const KIND: WorkloadKind;

    /// Borrow `Self` out of `params` if the tag matches.
    fn extract(params: &TestParams) -> Option<&Self>;

    /// All fields, in emission order.
    fn fields(&self) -> Vec<ArgField>;
}

/// Checked downcast of a definition's parameters to `A`.
pub fn checked_args<A: CmdArgs>(definition: &TestDefinition) -> Result<&A> {
    A::extract(&definition.params).ok_or(GenError::ConfigurationMismatch {
        expected: A::KIND,
        actual: definition.kind(),
    })
}

/// Render every field of `args` as one token each.
pub fn map_args<A: CmdArgs>(args: &A) -> Result<Vec<String>> {
    args.fields()
        .iter()
        .map(|field| field.render(A::KIND))
        .collect()
}

/// Value of a field that has no default.
pub fn required<'a>(kind: WorkloadKind, field: &'static str, value: Option<&'a str>) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(GenError::UnformattableValue { kind, field }),
    }
}
