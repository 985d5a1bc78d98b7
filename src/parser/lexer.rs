//! Tokenizes the argument portion of a single statement line: quoted
//! strings, variable references, and bare words, with a trailing
//! `" #"` comment stripped first.

use std::path::Path;

use crate::ast::Argument;
use crate::error::ParseError;

/// Truncates `line` at an unquoted `" #"`, matching the grammar's rule that
/// a space followed by `#` outside any quoted string starts a trailing
/// comment. `#` inside quotes, or not preceded by whitespace, is literal.
pub fn strip_trailing_comment(line: &str) -> &str {
    let mut in_quote: Option<char> = None;
    let mut escape = false;
    let mut prev_is_space = false;

    for (idx, c) in line.char_indices() {
        if escape {
            escape = false;
            prev_is_space = false;
            continue;
        }
        match in_quote {
            Some(q) => {
                if c == '\\' {
                    escape = true;
                } else if c == q {
                    in_quote = None;
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    in_quote = Some(c);
                } else if c == '#' && prev_is_space {
                    return line[..idx - 1].trim_end();
                }
            }
        }
        prev_is_space = c == ' ';
    }
    line
}

/// Splits `rest` (everything after the statement prefix) into arguments.
pub fn tokenize(rest: &str, file: &Path, source_line: usize) -> Result<Vec<Argument>, ParseError> {
    let text = strip_trailing_comment(rest);
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    let mut args = Vec::new();

    while i < chars.len() {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        let c = chars[i];
        if c == '"' || c == '\'' {
            let quote = c;
            i += 1;
            let mut buf = String::new();
            let mut closed = false;
            while i < chars.len() {
                let ch = chars[i];
                if ch == '\\' && i + 1 < chars.len() {
                    match chars[i + 1] {
                        '"' => buf.push('"'),
                        '\'' => buf.push('\''),
                        '\\' => buf.push('\\'),
                        other => {
                            buf.push('\\');
                            buf.push(other);
                        }
                    }
                    i += 2;
                    continue;
                }
                if ch == quote {
                    i += 1;
                    closed = true;
                    break;
                }
                buf.push(ch);
                i += 1;
            }
            if !closed {
                return Err(ParseError::UnterminatedQuote {
                    file: file.to_path_buf(),
                    line: source_line,
                });
            }
            args.push(Argument::Literal(buf));
        } else if c == '@' {
            i += 1;
            let mut name = String::new();
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                name.push(chars[i]);
                i += 1;
            }
            args.push(Argument::VarRef(name));
        } else {
            let mut buf = String::new();
            while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '"' && chars[i] != '\''
            {
                buf.push(chars[i]);
                i += 1;
            }
            args.push(Argument::Literal(buf));
        }
    }

    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn toks(s: &str) -> Vec<Argument> {
        tokenize(s, &PathBuf::from("t.spec"), 1).unwrap()
    }

    #[test]
    fn splits_bare_words() {
        assert_eq!(
            toks("echo hello world"),
            vec![
                Argument::Literal("echo".into()),
                Argument::Literal("hello".into()),
                Argument::Literal("world".into()),
            ]
        );
    }

    #[test]
    fn double_quoted_with_escapes() {
        assert_eq!(
            toks(r#"stdout "say \"hi\"""#),
            vec![
                Argument::Literal("stdout".into()),
                Argument::Literal("say \"hi\"".into()),
            ]
        );
    }

    #[test]
    fn single_quoted_preserves_double_quotes() {
        assert_eq!(
            toks(r#"file 'a "b" c'"#),
            vec![
                Argument::Literal("file".into()),
                Argument::Literal("a \"b\" c".into()),
            ]
        );
    }

    #[test]
    fn var_ref_stops_at_non_word_char() {
        assert_eq!(
            toks("== @a \"x\""),
            vec![
                Argument::Literal("==".into()),
                Argument::VarRef("a".into()),
                Argument::Literal("x".into()),
            ]
        );
    }

    #[test]
    fn unterminated_quote_is_error() {
        let err = tokenize(r#"stdout "unterminated"#, &PathBuf::from("t.spec"), 3).unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedQuote { line: 3, .. }));
    }

    #[test]
    fn trailing_comment_is_stripped() {
        assert_eq!(strip_trailing_comment("echo hi # a comment"), "echo hi");
        assert_eq!(strip_trailing_comment(r#"stdout "a # b""#), r#"stdout "a # b""#);
        assert_eq!(strip_trailing_comment("echo a#b"), "echo a#b");
    }
}
