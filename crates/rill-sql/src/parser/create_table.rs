//! CREATE TABLE parser using sqlparser primitives.
//!
//! Supported syntax:
//! ```sql
//! CREATE TABLE name (
//!     column1 TYPE [DEFAULT literal],
//!     column2 TYPE,
//!     PERIOD FOR SYSTEM_TIME
//! ) WITH ('key' = 'value', ...);
//! ```
//!
//! The column list is deliberately not lowered to an AST here: it is kept
//! as raw text, reconstructed token by token, because classification has to
//! see non-standard declarations (the temporal marker) exactly as written.
//! Lowering to typed columns is the connector's table parser's job.

use std::collections::HashMap;

use sqlparser::dialect::GenericDialect;
use sqlparser::keywords::Keyword;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;

use super::ParseError;

/// A parsed `CREATE TABLE` declaration.
#[derive(Debug, Clone)]
pub struct CreateTableStatement {
    /// Declared table name.
    pub name: String,
    /// Raw column list, exactly the text between the outer parentheses.
    pub fields_text: String,
    /// `WITH (...)` properties, keys as written.
    pub properties: HashMap<String, String>,
}

/// Parses a single `CREATE TABLE ... WITH (...)` statement.
///
/// # Errors
///
/// Returns `ParseError` if the statement syntax is invalid.
pub fn parse_create_table(sql: &str) -> Result<CreateTableStatement, ParseError> {
    let dialect = GenericDialect {};
    let mut parser = Parser::new(&dialect)
        .try_with_sql(sql)
        .map_err(ParseError::SqlParseError)?;

    parser
        .expect_keyword(Keyword::CREATE)
        .map_err(ParseError::SqlParseError)?;
    parser
        .expect_keyword(Keyword::TABLE)
        .map_err(ParseError::SqlParseError)?;

    let name = parser
        .parse_object_name(false)
        .map_err(ParseError::SqlParseError)?;

    parser
        .expect_token(&Token::LParen)
        .map_err(ParseError::SqlParseError)?;
    let fields_text = capture_column_list(&mut parser)?;
    if fields_text.is_empty() {
        return Err(ParseError::DeclarationError(format!(
            "table '{name}' declares no columns"
        )));
    }

    let properties = parse_with_options(&mut parser)?;

    parser.consume_token(&Token::SemiColon);
    let trailing = parser.peek_token();
    if !matches!(trailing.token, Token::EOF) {
        return Err(ParseError::DeclarationError(format!(
            "unexpected trailing tokens after declaration: {trailing}"
        )));
    }

    Ok(CreateTableStatement {
        name: name.to_string(),
        fields_text,
        properties,
    })
}

/// Consumes tokens up to the matching close paren and reconstructs the
/// column list text.
fn capture_column_list(parser: &mut Parser) -> Result<String, ParseError> {
    let mut text = String::new();
    let mut depth = 1usize;
    loop {
        let token = parser.next_token();
        match &token.token {
            Token::EOF => {
                return Err(ParseError::DeclarationError(
                    "unclosed column list".to_string(),
                ));
            }
            Token::LParen => {
                depth += 1;
                append_token(&mut text, &token.token);
            }
            Token::RParen => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                append_token(&mut text, &token.token);
            }
            other => append_token(&mut text, other),
        }
    }
    Ok(text)
}

/// Appends one token, spacing words apart but keeping punctuation tight so
/// `DECIMAL ( 10 , 2 )` reads back as `DECIMAL(10,2)`.
fn append_token(text: &mut String, token: &Token) {
    let tight = matches!(token, Token::Comma | Token::LParen | Token::RParen);
    if !text.is_empty() && !tight && !text.ends_with('(') {
        text.push(' ');
    }
    text.push_str(&token.to_string());
}

/// Parses `WITH ('key' = 'value', ...)` options.
///
/// Returns an empty map if no WITH clause is present. Handles
/// single-quoted, double-quoted, and unquoted keys and values.
fn parse_with_options(parser: &mut Parser) -> Result<HashMap<String, String>, ParseError> {
    let mut options = HashMap::new();

    if !parser.parse_keyword(Keyword::WITH) {
        return Ok(options);
    }

    parser
        .expect_token(&Token::LParen)
        .map_err(ParseError::SqlParseError)?;

    loop {
        if parser.consume_token(&Token::RParen) {
            break;
        }

        let key = parse_option_string(parser)?;
        parser
            .expect_token(&Token::Eq)
            .map_err(ParseError::SqlParseError)?;
        let value = parse_option_string(parser)?;
        options.insert(key, value);

        if !parser.consume_token(&Token::Comma) {
            parser
                .expect_token(&Token::RParen)
                .map_err(ParseError::SqlParseError)?;
            break;
        }
    }

    Ok(options)
}

/// Parses a WITH-options key or value: quoted strings, identifiers, and
/// numbers.
fn parse_option_string(parser: &mut Parser) -> Result<String, ParseError> {
    let token = parser.next_token();
    match token.token {
        Token::SingleQuotedString(s) | Token::DoubleQuotedString(s) => Ok(s),
        Token::Word(w) => Ok(w.value),
        Token::Number(n, _) => Ok(n),
        other => Err(ParseError::DeclarationError(format!(
            "expected string or identifier in WITH options, found {other}"
        ))),
    }
}
