//! Recognizing which object a statement declares from its leading tokens.

use sb_core::{BuildActionType, ObjectKind};
use sqlparser::tokenizer::Token;

/// Leading verb of a declaring statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Alter,
    Drop,
}

/// What a DDL statement declares.
///
/// Names are kept as their identifier parts (`["sales", "orders"]`) so the
/// caller can resolve them against a default schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementHeader {
    /// Statement verb
    pub verb: Verb,

    /// Kind of object named
    pub kind: ObjectKind,

    /// Objects named by the statement; several only for `DROP a, b`
    pub names: Vec<Vec<String>>,

    /// New name for `ALTER ... RENAME TO`
    pub renamed_to: Option<Vec<String>>,

    /// Table an index or trigger is attached to
    pub on_table: Option<Vec<String>>,
}

const CREATE_MODIFIERS: &[&str] = &[
    "TEMP",
    "TEMPORARY",
    "UNIQUE",
    "MATERIALIZED",
    "GLOBAL",
    "LOCAL",
    "UNLOGGED",
    "RECURSIVE",
    "PERSISTENT",
];

impl StatementHeader {
    /// Read the header of a statement. Returns `None` for statements that do
    /// not declare an object (DML, `COMMENT ON`, `SET`, ...).
    pub fn parse(tokens: &[Token]) -> Option<Self> {
        let mut cursor = Cursor { tokens, pos: 0 };

        match cursor.next_keyword()?.as_str() {
            "CREATE" => {
                if cursor.eat("OR") && !cursor.eat("REPLACE") {
                    return None;
                }
                while cursor
                    .peek_keyword()
                    .is_some_and(|kw| CREATE_MODIFIERS.contains(&kw.as_str()))
                {
                    cursor.pos += 1;
                }
                let kind = kind_from_keyword(&cursor.next_keyword()?)?;
                cursor.eat_all(&["IF", "NOT", "EXISTS"]);
                if cursor.peek_keyword().as_deref() == Some("ON") {
                    // unnamed index
                    return None;
                }
                let name = cursor.name()?;
                let on_table = match kind {
                    ObjectKind::Index | ObjectKind::Trigger => {
                        cursor.skip_to("ON")?;
                        cursor.name()
                    }
                    _ => None,
                };
                Some(Self {
                    verb: Verb::Create,
                    kind,
                    names: vec![name],
                    renamed_to: None,
                    on_table,
                })
            }
            "ALTER" => {
                let kind = kind_from_keyword(&cursor.next_keyword()?)?;
                cursor.eat_all(&["IF", "EXISTS"]);
                let name = cursor.name()?;
                let renamed_to = cursor.find_rename_target();
                Some(Self {
                    verb: Verb::Alter,
                    kind,
                    names: vec![name],
                    renamed_to,
                    on_table: None,
                })
            }
            "DROP" => {
                let kind = kind_from_keyword(&cursor.next_keyword()?)?;
                cursor.eat_all(&["IF", "EXISTS"]);
                let mut names = vec![cursor.name()?];
                while matches!(cursor.peek(), Some(Token::Comma)) {
                    cursor.pos += 1;
                    names.push(cursor.name()?);
                }
                Some(Self {
                    verb: Verb::Drop,
                    kind,
                    names,
                    renamed_to: None,
                    on_table: None,
                })
            }
            _ => None,
        }
    }

    /// Action the statement performs on its object
    pub fn action(&self) -> BuildActionType {
        match (self.verb, &self.renamed_to) {
            (Verb::Create, _) => BuildActionType::Create,
            (Verb::Alter, Some(_)) => BuildActionType::Rename,
            (Verb::Alter, None) => BuildActionType::Alter,
            (Verb::Drop, _) => BuildActionType::Drop,
        }
    }
}

fn kind_from_keyword(keyword: &str) -> Option<ObjectKind> {
    let kind = match keyword {
        "TABLE" => ObjectKind::Table,
        "VIEW" => ObjectKind::View,
        "FUNCTION" => ObjectKind::Function,
        "MACRO" => ObjectKind::Macro,
        "PROCEDURE" => ObjectKind::Procedure,
        "SEQUENCE" => ObjectKind::Sequence,
        "INDEX" => ObjectKind::Index,
        "SCHEMA" => ObjectKind::Schema,
        "TYPE" => ObjectKind::Type,
        "TRIGGER" => ObjectKind::Trigger,
        _ => return None,
    };
    Some(kind)
}

/// Keyword text of a token: uppercase for unquoted words, `None` otherwise
fn keyword(token: &Token) -> Option<String> {
    match token {
        Token::Word(word) if word.quote_style.is_none() => Some(word.value.to_uppercase()),
        _ => None,
    }
}

struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_keyword(&self) -> Option<String> {
        self.peek().and_then(keyword)
    }

    fn next_keyword(&mut self) -> Option<String> {
        let kw = self.peek_keyword()?;
        self.pos += 1;
        Some(kw)
    }

    fn eat(&mut self, expected: &str) -> bool {
        if self.peek_keyword().as_deref() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume the whole keyword sequence, or nothing
    fn eat_all(&mut self, expected: &[&str]) -> bool {
        let matched = expected.iter().enumerate().all(|(i, kw)| {
            self.tokens
                .get(self.pos + i)
                .and_then(keyword)
                .is_some_and(|k| k == *kw)
        });
        if matched {
            self.pos += expected.len();
        }
        matched
    }

    /// Advance past the next occurrence of `expected`
    fn skip_to(&mut self, expected: &str) -> Option<()> {
        let offset = self.tokens[self.pos..]
            .iter()
            .position(|t| keyword(t).as_deref() == Some(expected))?;
        self.pos += offset + 1;
        Some(())
    }

    /// Dotted identifier: `word ( . word )*`
    fn name(&mut self) -> Option<Vec<String>> {
        let mut parts = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Word(word)) => parts.push(word.value.clone()),
                _ => return None,
            }
            self.pos += 1;
            if !matches!(self.peek(), Some(Token::Period)) {
                return Some(parts);
            }
            self.pos += 1;
        }
    }

    /// `RENAME TO <name>` anywhere in the rest of the statement
    fn find_rename_target(&mut self) -> Option<Vec<String>> {
        while self.pos < self.tokens.len() {
            if self.eat_all(&["RENAME", "TO"]) {
                return self.name();
            }
            self.pos += 1;
        }
        None
    }
}

#[cfg(test)]
#[path = "header_test.rs"]
mod tests;
