// Reader for the line-based grammar format:
//
// # comment
// %token id plus           terminals, in id order (after `$end`)
// Expr:                    a nonterminal head, `[A-Za-z_][A-Za-z0-9_]*:`
//     Expr plus Term       one production per line
//     %empty               epsilon production
//
// The first head is the start symbol.

use thiserror::Error;

use super::{Grammar, GrammarBuilder, GrammarError};

const EMPTY_MARKER: &str = "%empty";
const TOKEN_DIRECTIVE: &str = "%token";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("line {line}: production does not belong to any nonterminal")]
    ProductionWithoutHead { line: usize },
    #[error("line {line}: malformed nonterminal head `{text}`")]
    MalformedHead { line: usize, text: String },
    #[error("line {line}: `%empty` must be the only symbol of a production")]
    MisplacedEmpty { line: usize },
    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

enum Line<'a> {
    Blank,
    Tokens(Vec<&'a str>),
    Head(&'a str),
    Production(Vec<&'a str>),
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn classify(line_number: usize, raw_line: &str) -> Result<Line<'_>, LoadError> {
    let line = match raw_line.split_once('#') {
        Some((before, _)) => before,
        None => raw_line,
    };
    let line = line.trim();

    if line.is_empty() {
        return Ok(Line::Blank);
    }

    if let Some(rest) = line.strip_prefix(TOKEN_DIRECTIVE) {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return Ok(Line::Tokens(rest.split_whitespace().collect()));
        }
    }

    if let Some(head) = line.strip_suffix(':') {
        let head = head.trim();
        if !is_identifier(head) {
            return Err(LoadError::MalformedHead {
                line: line_number,
                text: line.to_string(),
            });
        }
        return Ok(Line::Head(head));
    }

    let symbols: Vec<&str> = line.split_whitespace().collect();
    if symbols.contains(&EMPTY_MARKER) {
        if symbols.len() != 1 {
            return Err(LoadError::MisplacedEmpty { line: line_number });
        }
        return Ok(Line::Production(Vec::new()));
    }

    Ok(Line::Production(symbols))
}

pub fn load_grammar(source: &str) -> Result<Grammar, LoadError> {
    let lines = source
        .lines()
        .enumerate()
        .map(|(i, x)| classify(i + 1, x).map(|c| (i + 1, c)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut builder = GrammarBuilder::new();

    // declare all terminals and heads first so productions can refer forward
    let mut terminals: Vec<&str> = Vec::new();
    for (_, line) in &lines {
        if let Line::Tokens(tokens) = line {
            terminals.extend(tokens.iter().copied());
        }
    }
    builder.terminals(&terminals);

    for (_, line) in &lines {
        match line {
            // a terminal used as a head is rejected when the grammar is built
            Line::Head(head) if !terminals.contains(head) => {
                builder.nonterminal(head);
            }
            _ => {}
        }
    }

    let mut current: Option<&str> = None;
    for (line_number, line) in &lines {
        match line {
            Line::Blank | Line::Tokens(_) => {}
            Line::Head(head) => current = Some(*head),
            Line::Production(rhs) => {
                let lhs = current.ok_or(LoadError::ProductionWithoutHead { line: *line_number })?;
                builder.production(lhs, rhs);
            }
        }
    }

    log::debug!("loaded grammar source with {} lines", lines.len());

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use crate::grammar::GrammarError;

    use super::{load_grammar, LoadError};

    const EXPRESSION: &str = r#"
# expression grammar
%token id plus
S:
    E
E:
    E plus T
    T
T:
    id
"#;

    #[test]
    fn test_load_expression() {
        let grammar = load_grammar(EXPRESSION).expect("grammar should load");
        let symbols = grammar.symbols();

        assert_eq!(symbols.lookup("$end"), Some(0));
        assert_eq!(symbols.lookup("id"), Some(1));
        assert_eq!(symbols.lookup("plus"), Some(2));
        assert_eq!(grammar.start(), symbols.n_terminals());
        assert_eq!(symbols.name(grammar.start()), "S");
        assert_eq!(grammar.productions().len(), 4);
        assert_eq!(
            grammar.display_production(crate::grammar::ProductionId::new(1)),
            "E -> E plus T"
        );
    }

    #[test]
    fn test_forward_reference_and_empty() {
        let grammar = load_grammar(
            "%token a\nList:\n  Item List\n  %empty\nItem:\n  a\n",
        )
        .unwrap();
        assert!(grammar.productions()[1].is_empty());
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            load_grammar("%token a\n  a\n").unwrap_err(),
            LoadError::ProductionWithoutHead { line: 2 }
        );
        assert_eq!(
            load_grammar("%token a\nS:\n  a b\n").unwrap_err(),
            LoadError::Grammar(GrammarError::UndefinedSymbol("b".to_string()))
        );
        assert_eq!(
            load_grammar("%token a\nS:\n  a\na:\n  a\n").unwrap_err(),
            LoadError::Grammar(GrammarError::TerminalAsHead("a".to_string()))
        );
        assert_eq!(
            load_grammar("%token a\nS:\n  a\nEmpty:\n").unwrap_err(),
            LoadError::Grammar(GrammarError::NoProductions("Empty".to_string()))
        );
        assert!(matches!(
            load_grammar("%token a\nS:\n  a %empty\n").unwrap_err(),
            LoadError::MisplacedEmpty { line: 3 }
        ));
        assert!(matches!(
            load_grammar("bad head:\n").unwrap_err(),
            LoadError::MalformedHead { line: 1, .. }
        ));
    }
}
