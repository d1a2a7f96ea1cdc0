// Token sources for the parser. The parser only pulls tokens; where they
// come from (a prepared list, split text, a real lexer) is up to the caller.

use std::collections::VecDeque;

use thiserror::Error;

use crate::grammar::{SymbolId, SymbolSpace, END, END_NAME};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub symbol: SymbolId,
    pub text: String,
}

impl Token {
    pub fn new(symbol: SymbolId, text: impl Into<String>) -> Token {
        Token {
            symbol,
            text: text.into(),
        }
    }

    pub fn end() -> Token {
        Token::new(END, END_NAME)
    }

    pub fn is_end(&self) -> bool {
        self.symbol == END
    }
}

/// Blocking pull interface. Once exhausted, `advance` keeps returning the
/// end token.
pub trait TokenStream {
    fn has_more(&self) -> bool;
    fn advance(&mut self) -> Token;
}

impl<T: TokenStream + ?Sized> TokenStream for &mut T {
    fn has_more(&self) -> bool {
        (**self).has_more()
    }

    fn advance(&mut self) -> Token {
        (**self).advance()
    }
}

#[derive(Debug, Clone, Default)]
pub struct VecTokenStream {
    tokens: VecDeque<Token>,
}

impl VecTokenStream {
    /// A trailing end token in `tokens` is optional.
    pub fn new(tokens: Vec<Token>) -> VecTokenStream {
        let mut tokens: VecDeque<Token> = tokens.into();
        if tokens.back().is_some_and(|x| x.is_end()) {
            tokens.pop_back();
        }
        VecTokenStream { tokens }
    }

    /// Tokens carrying only symbol ids; the text is the id itself.
    pub fn from_symbols(symbols: &[SymbolId]) -> VecTokenStream {
        VecTokenStream::new(
            symbols
                .iter()
                .map(|x| Token::new(*x, x.to_string()))
                .collect(),
        )
    }
}

impl TokenStream for VecTokenStream {
    fn has_more(&self) -> bool {
        !self.tokens.is_empty()
    }

    fn advance(&mut self) -> Token {
        self.tokens.pop_front().unwrap_or_else(Token::end)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("`{word}` at word {position} is not a terminal")]
    UnknownWord { word: String, position: usize },
}

/// Splits text on whitespace; every word must be the name of a terminal.
/// The end terminal is implied by the end of the text and cannot be written.
pub struct WordScanner<'s> {
    symbols: &'s SymbolSpace,
}

impl<'s> WordScanner<'s> {
    pub fn new(symbols: &'s SymbolSpace) -> WordScanner<'s> {
        WordScanner { symbols }
    }

    pub fn scan(&self, input: &str) -> Result<VecTokenStream, ScanError> {
        let mut tokens = Vec::new();
        for (position, word) in input.split_whitespace().enumerate() {
            match self.symbols.lookup(word) {
                Some(symbol) if symbol != END && self.symbols.is_terminal(symbol) => {
                    tokens.push(Token::new(symbol, word));
                }
                _ => {
                    return Err(ScanError::UnknownWord {
                        word: word.to_string(),
                        position,
                    })
                }
            }
        }
        Ok(VecTokenStream::new(tokens))
    }
}

#[cfg(test)]
mod tests {
    use crate::grammar::SymbolSpace;

    use super::*;

    #[test]
    fn test_exhausted_stream_yields_end() {
        let mut stream = VecTokenStream::from_symbols(&[1, 2]);
        assert!(stream.has_more());
        assert_eq!(stream.advance().symbol, 1);
        assert_eq!(stream.advance().symbol, 2);
        assert!(!stream.has_more());
        assert!(stream.advance().is_end());
        assert!(stream.advance().is_end());
    }

    #[test]
    fn test_trailing_end_is_optional() {
        let stream = VecTokenStream::from_symbols(&[1, END]);
        assert_eq!(stream.tokens.len(), 1);
    }

    #[test]
    fn test_word_scanner() {
        let symbols = SymbolSpace::new(&["id", "plus"], &["S"]).unwrap();
        let scanner = WordScanner::new(&symbols);

        let mut stream = scanner.scan("  id plus\tid\n").unwrap();
        let mut words: Vec<Token> = Vec::new();
        while stream.has_more() {
            words.push(stream.advance());
        }
        assert_eq!(
            words,
            vec![
                Token::new(1, "id"),
                Token::new(2, "plus"),
                Token::new(1, "id")
            ]
        );

        assert_eq!(
            scanner.scan("id S").unwrap_err(),
            ScanError::UnknownWord {
                word: "S".to_string(),
                position: 1
            }
        );
        assert!(scanner.scan("id minus").is_err());
    }

    #[test]
    fn test_end_word_is_not_a_terminal() {
        let symbols = SymbolSpace::new(&["id", "plus"], &["S"]).unwrap();
        let scanner = WordScanner::new(&symbols);

        assert_eq!(
            scanner.scan("id $end plus plus").unwrap_err(),
            ScanError::UnknownWord {
                word: END_NAME.to_string(),
                position: 1
            }
        );
        assert!(scanner.scan("$end").is_err());
    }
}
