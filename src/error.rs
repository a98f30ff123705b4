//! CLI Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not open `{_0}` backend")]
    Backend(#[error(not(source))] &'static str),
    #[display("`{_0}` backend support is not compiled in")]
    Disabled(#[error(not(source))] &'static str),
    #[display("invalid parameter: {_0}")]
    Param(#[error(not(source))] String),
    #[display("statement failed")]
    Statement,
    #[display("{_0} statement(s) failed")]
    Shell(#[error(not(source))] usize),
    #[display("no database loaded")]
    MissingDatabase,
    #[display("could not read input")]
    Input,
    #[display("could not write output")]
    Output,
}
