//! Keyword detection for transaction control and mutating statements.
//!
//! No SQL is parsed here. Statements are only inspected for a handful of
//! keywords, which is enough to decide when a snapshot has to be written.

use serde::{Deserialize, Serialize};

const BEGIN: &str = "BEGIN";
const ENDS: [&str; 2] = ["ROLLBACK", "COMMIT"];
const MUTATING: [&str; 7] = ["DELETE", "INSERT", "UPDATE", "CREATE", "ALTER", "COMMIT", "DROP"];

/// How statement text is searched for keywords.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Detection {
    /// Case-insensitive substring search over the raw statement text.
    ///
    /// Errs on the side of writing: `SELECT 'DROP'` counts as mutating, and
    /// a column named `begin_date` opens a transaction.
    #[default]
    Substring,
    /// Case-insensitive whole-word search, ignoring string literals, quoted
    /// identifiers and comments.
    ///
    /// Transaction control only counts as the leading word, so trigger
    /// bodies and `OR ROLLBACK` conflict clauses leave the state alone.
    /// `END` is a commit, `ROLLBACK TO <savepoint>` does not end the
    /// transaction and a bare `REPLACE` is mutating.
    Tokenized,
}

/// What a statement means for transaction state and persistence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub begins: bool,
    pub ends: bool,
    pub mutates: bool,
}

impl Detection {
    pub fn classify(self, statement: &str) -> Classification {
        match self {
            Self::Substring => {
                let upper = statement.to_ascii_uppercase();
                Classification {
                    begins: upper.contains(BEGIN),
                    ends: ENDS.iter().any(|kw| upper.contains(kw)),
                    mutates: MUTATING.iter().any(|kw| upper.contains(kw)),
                }
            },
            Self::Tokenized => {
                let words = words(statement);
                let has = |kw: &str| words.iter().any(|w| w == kw);
                let leading = |position: usize| words.get(position).map(String::as_str);
                let rollback = match (leading(0), leading(1), leading(2)) {
                    (Some("ROLLBACK"), Some("TO"), _) | (Some("ROLLBACK"), Some("TRANSACTION"), Some("TO")) => false,
                    (Some("ROLLBACK"), ..) => true,
                    _ => false,
                };
                let commit = matches!(leading(0), Some("COMMIT" | "END"));
                Classification {
                    begins: leading(0) == Some(BEGIN),
                    ends: commit || rollback,
                    mutates: commit || has("REPLACE") || MUTATING.iter().any(|kw| has(kw)),
                }
            },
        }
    }
}

/// Upper-cased bare words of a statement, skipping literals and comments.
fn words(statement: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut chars = statement.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_alphanumeric() || c == '_' {
            current.push(c.to_ascii_uppercase());
            continue;
        }
        if !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        match c {
            '\'' | '"' | '`' => skip_quoted(&mut chars, c),
            '[' => skip_quoted(&mut chars, ']'),
            '-' if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            },
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for c in chars.by_ref() {
                    if previous == '*' && c == '/' {
                        break;
                    }
                    previous = c;
                }
            },
            _ => {},
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Consume up to and including the closing quote. A doubled quote is an
/// escaped quote, not the end.
fn skip_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, close: char) {
    while let Some(c) = chars.next() {
        if c == close {
            if close != ']' && chars.peek() == Some(&close) {
                chars.next();
                continue;
            }
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn class(begins: bool, ends: bool, mutates: bool) -> Classification {
        Classification { begins, ends, mutates }
    }

    #[rstest]
    #[case("SELECT * FROM t", class(false, false, false))]
    #[case("select * from t", class(false, false, false))]
    #[case("BEGIN", class(true, false, false))]
    #[case("begin transaction", class(true, false, false))]
    #[case("COMMIT", class(false, true, true))]
    #[case("rollback", class(false, true, false))]
    #[case("INSERT INTO t VALUES (1)", class(false, false, true))]
    #[case("update t set x = 1", class(false, false, true))]
    #[case("DELETE FROM t", class(false, false, true))]
    #[case("CREATE TABLE t (x)", class(false, false, true))]
    #[case("ALTER TABLE t ADD COLUMN y", class(false, false, true))]
    #[case("DROP TABLE t", class(false, false, true))]
    // Substring matching: literals and identifiers count.
    #[case("SELECT 'DROP' AS word", class(false, false, true))]
    #[case("SELECT begin_date FROM t", class(true, false, false))]
    #[case("SELECT * FROM t WHERE updated_at > 0", class(false, false, true))]
    fn test_substring(#[case] statement: &str, #[case] expected: Classification) {
        assert_eq!(Detection::Substring.classify(statement), expected);
    }

    #[rstest]
    #[case("SELECT * FROM t", class(false, false, false))]
    #[case("BEGIN IMMEDIATE", class(true, false, false))]
    #[case("commit", class(false, true, true))]
    #[case("END TRANSACTION", class(false, true, true))]
    #[case("ROLLBACK", class(false, true, false))]
    #[case("ROLLBACK TO before_import", class(false, false, false))]
    #[case("ROLLBACK TRANSACTION TO SAVEPOINT sp", class(false, false, false))]
    #[case("insert into t values (1)", class(false, false, true))]
    #[case("REPLACE INTO t VALUES (1)", class(false, false, true))]
    #[case("SELECT 'DROP' AS word", class(false, false, false))]
    #[case("SELECT 'it''s a DROP' AS word", class(false, false, false))]
    #[case("SELECT begin_date FROM t", class(false, false, false))]
    #[case("SELECT \"delete\" FROM t", class(false, false, false))]
    #[case("SELECT [update] FROM t", class(false, false, false))]
    #[case("SELECT 1 -- DROP TABLE t", class(false, false, false))]
    #[case("SELECT /* INSERT */ 1", class(false, false, false))]
    #[case("WITH x AS (SELECT 1) INSERT INTO t SELECT * FROM x", class(false, false, true))]
    #[case("CREATE TRIGGER tr AFTER INSERT ON t BEGIN DELETE FROM u; END", class(false, false, true))]
    #[case("INSERT OR ROLLBACK INTO t VALUES (1)", class(false, false, true))]
    fn test_tokenized(#[case] statement: &str, #[case] expected: Classification) {
        assert_eq!(Detection::Tokenized.classify(statement), expected);
    }

    #[test]
    fn test_words() {
        assert_eq!(words("select a,b from 't' -- x\n where c"), ["SELECT", "A", "B", "FROM", "WHERE", "C"]);
    }
}
