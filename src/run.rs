use crate::cli::{Cli, Command};
use crate::error::{Error, ErrorKind, Result};
use crate::open;
use exn::{OptionExt, ResultExt};
use sqlblob_config::Config;
use sqlblob_engine::{Params, Row, Value};
use sqlblob_handle::{CachedHandle, Persistence};
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let surface = config.handle.surface_persistence_errors;
    let mut handle = open::handle(&config).await?;
    match cli.command {
        Command::Query { sql, params, named } => {
            let params = parse_params(&params, &named)?;
            let rows = statement(&mut handle, &sql, &params, surface).await?;
            print_rows(&rows)?;
        },
        Command::Shell => shell(&mut handle, surface).await?,
        Command::Dump { out } => dump(&handle, &out).await?,
    }
    Ok(())
}

/// Run one statement, deciding whether a failed write-back fails it.
async fn statement(handle: &mut CachedHandle, sql: &str, params: &Params, surface: bool) -> Result<Vec<Row>> {
    let outcome = handle.execute(sql, params).await.or_raise(|| ErrorKind::Statement)?;
    if let Persistence::Failed(err) = outcome.persistence {
        if surface {
            return Err(err.raise(ErrorKind::Statement));
        }
        tracing::warn!(error = ?err, "Continuing with unpersisted changes");
    }
    Ok(outcome.rows)
}

async fn shell(handle: &mut CachedHandle, surface: bool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut failed = 0;
    while let Some(line) = lines.next_line().await.or_raise(|| ErrorKind::Input)? {
        let sql = line.trim();
        if sql.is_empty() || sql.starts_with("--") {
            continue;
        }
        match statement(handle, sql, &Params::None, surface).await {
            Ok(rows) => print_rows(&rows)?,
            Err(err) => {
                failed += 1;
                eprintln!("error: {err:?}");
            },
        }
    }
    if failed > 0 {
        exn::bail!(ErrorKind::Shell(failed));
    }
    Ok(())
}

async fn dump(handle: &CachedHandle, out: &Path) -> Result<()> {
    let image = handle
        .database()
        .ok_or_raise(|| ErrorKind::MissingDatabase)?
        .snapshot()
        .or_raise(|| ErrorKind::Output)?;
    tokio::fs::write(out, &image).await.or_raise(|| ErrorKind::Output)?;
    tracing::info!(bytes = image.len(), path = %out.display(), "Wrote snapshot");
    Ok(())
}

fn print_rows(rows: &[Row]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    for row in rows {
        serde_json::to_writer(&mut stdout, row).or_raise(|| ErrorKind::Output)?;
        writeln!(stdout).or_raise(|| ErrorKind::Output)?;
    }
    Ok(())
}

fn parse_params(positional: &[String], named: &[String]) -> Result<Params> {
    if !positional.is_empty() {
        return positional.iter().map(|raw| parse_value(raw.as_str())).collect::<Result<Vec<_>>>().map(Params::Positional);
    }
    if !named.is_empty() {
        let mut values = Vec::with_capacity(named.len());
        for pair in named {
            let (name, raw) = pair
                .split_once('=')
                .ok_or_else(|| Error::from(ErrorKind::Param(format!("expected NAME=JSON, got `{pair}`"))))?;
            values.push((name.to_string(), parse_value(raw)?));
        }
        return Ok(Params::Named(values));
    }
    Ok(Params::None)
}

/// Anything that is not valid JSON is taken as a plain string, so `-p abc`
/// works without quoting.
fn parse_value(raw: &str) -> Result<Value> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Ok(Value::from_json(&json)),
        Err(_) if !raw.is_empty() => Ok(Value::from(raw)),
        Err(_) => exn::bail!(ErrorKind::Param("empty value".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sqlblob_handle::Options;
    use sqlblob_storage::backend::MemoryBlob;
    use std::sync::Arc;

    #[rstest]
    #[case("1", Value::Integer(1))]
    #[case("1.5", Value::Real(1.5))]
    #[case("\"text\"", Value::from("text"))]
    #[case("bare", Value::from("bare"))]
    #[case("null", Value::Null)]
    #[case("true", Value::Integer(1))]
    #[case("[1,2]", Value::from("[1,2]"))]
    fn test_parse_value(#[case] raw: &str, #[case] expected: Value) {
        assert_eq!(parse_value(raw).unwrap(), expected);
    }

    #[test]
    fn test_parse_params() {
        assert_eq!(parse_params(&[], &[]).unwrap(), Params::None);
        assert_eq!(
            parse_params(&["1".to_string(), "x".to_string()], &[]).unwrap(),
            Params::positional([Value::Integer(1), Value::from("x")])
        );
        assert_eq!(
            parse_params(&[], &["id=7".to_string()]).unwrap(),
            Params::named([("id", Value::Integer(7))])
        );
        let err = parse_params(&[], &["id".to_string()]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Param(_)));
    }

    #[rstest]
    #[case(true, true)]
    #[case(false, false)]
    #[tokio::test]
    async fn test_persistence_failure_surfacing(#[case] surface: bool, #[case] fails: bool) {
        let blob = Arc::new(MemoryBlob::default());
        let mut handle = CachedHandle::from_blob(blob.clone(), Options::default()).await;
        blob.fail_store(true);
        let result = statement(&mut handle, "CREATE TABLE t (x)", &Params::None, surface).await;
        assert_eq!(result.is_err(), fails);
    }
}
