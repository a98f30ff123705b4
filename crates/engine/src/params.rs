use crate::Value;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use rusqlite::Statement;

/// Prefixes SQLite accepts for named parameters, tried in order when the
/// caller gives a bare name.
const NAMED_PREFIXES: [&str; 3] = [":", "@", "$"];

/// Parameters bound to a statement before it runs.
///
/// Named parameters may be given with or without their prefix: `"id"`
/// matches `:id`, `@id` or `$id` in the statement text.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    #[default]
    None,
    Positional(Vec<Value>),
    Named(Vec<(String, Value)>),
}

impl Params {
    pub fn positional<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn named<K: Into<String>, V: Into<Value>>(values: impl IntoIterator<Item = (K, V)>) -> Self {
        Self::Named(values.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub(crate) fn bind(&self, statement: &mut Statement<'_>) -> Result<()> {
        let expected = statement.parameter_count();
        match self {
            Self::None if expected == 0 => Ok(()),
            Self::None => exn::bail!(ErrorKind::Parameters(format!("statement expects {expected} parameters, none given"))),
            Self::Positional(values) => {
                if values.len() != expected {
                    exn::bail!(ErrorKind::Parameters(format!(
                        "statement expects {expected} parameters, {} given",
                        values.len()
                    )));
                }
                for (index, value) in values.iter().enumerate() {
                    statement
                        .raw_bind_parameter(index + 1, value)
                        .or_raise(|| ErrorKind::Parameters(format!("binding parameter {}", index + 1)))?;
                }
                Ok(())
            },
            Self::Named(values) => {
                for (name, value) in values {
                    let index = Self::named_index(statement, name)?;
                    statement
                        .raw_bind_parameter(index, value)
                        .or_raise(|| ErrorKind::Parameters(format!("binding parameter {name}")))?;
                }
                Ok(())
            },
        }
    }

    fn named_index(statement: &Statement<'_>, name: &str) -> Result<usize> {
        let lookup = |candidate: &str| {
            statement
                .parameter_index(candidate)
                .or_raise(|| ErrorKind::Parameters(format!("looking up parameter {candidate}")))
        };
        if let Some(index) = lookup(name)? {
            return Ok(index);
        }
        if !NAMED_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
            for prefix in NAMED_PREFIXES {
                if let Some(index) = lookup(&format!("{prefix}{name}"))? {
                    return Ok(index);
                }
            }
        }
        exn::bail!(ErrorKind::Parameters(format!("no parameter named {name}")))
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }
}

impl From<Vec<(String, Value)>> for Params {
    fn from(values: Vec<(String, Value)>) -> Self {
        Self::Named(values)
    }
}
