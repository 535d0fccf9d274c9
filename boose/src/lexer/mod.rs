//! Expression lexer implementation using logos

mod token;

pub use token::Token;

use crate::error::{BooseError, Result};
use logos::Logos;

/// Tokenize an arithmetic expression
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push(token),
            Err(_) => {
                return Err(BooseError::expression(
                    source,
                    format!("unexpected input {:?} at offset {}", lexer.slice(), lexer.span().start),
                ));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_empty() {
        let tokens = tokenize("").unwrap();
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_tokenize_integer_literal() {
        let tokens = tokenize("42").unwrap();
        assert_eq!(tokens, vec![Token::IntLit(42)]);
    }

    #[test]
    fn test_tokenize_real_literals() {
        let tokens = tokenize("1.5 .25 2e3 6.").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::RealLit(1.5),
                Token::RealLit(0.25),
                Token::RealLit(2000.0),
                Token::RealLit(6.0)
            ]
        );
    }

    #[test]
    fn test_tokenize_operators() {
        let tokens = tokenize("+ - * / % ( )").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::Percent,
                Token::LParen,
                Token::RParen
            ]
        );
    }

    #[test]
    fn test_tokenize_identifiers_are_whole_words() {
        let tokens = tokenize("max+x").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("max".to_string()),
                Token::Plus,
                Token::Ident("x".to_string())
            ]
        );
    }

    #[test]
    fn test_tokenize_boolean_keywords() {
        let tokens = tokenize("true FALSE truest").unwrap();
        assert_eq!(
            tokens,
            vec![Token::True, Token::False, Token::Ident("truest".to_string())]
        );
    }

    #[test]
    fn test_tokenize_rejects_unknown_character() {
        let err = tokenize("3 $ 4").unwrap_err();
        assert!(matches!(err, BooseError::Expression { .. }));
    }
}
