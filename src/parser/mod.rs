//! The spec-file parser: turns raw text into a [`crate::ast::SpecDocument`].
//!
//! Parsing happens in one left-to-right pass over the lines. Two small
//! pieces of state carry across lines within the current test case or
//! snippet: a pending Shell/Run statement (still accumulating its `$</$>`
//! script) and a pending Assertion/Action statement (still eligible to
//! receive a `..` content block). Both are flushed into the block's
//! statement list as soon as a line arrives that can't extend them.

pub mod lexer;

use std::path::Path;
use std::path::PathBuf;

use crate::ast::Argument;
use crate::ast::Polarity;
use crate::ast::ShellVerb;
use crate::ast::Snippet;
use crate::ast::SpecDocument;
use crate::ast::Statement;
use crate::ast::StatementKind;
use crate::ast::TestCase;
use crate::error::ParseError;

const ASSERTION_BLOCK_TARGETS: &[&str] = &["stdout", "stderr", "file"];
const ACTION_BLOCK_TARGETS: &[&str] = &["file"];

fn admits_content_block(kind: &StatementKind) -> bool {
    match kind {
        StatementKind::Assertion { target } => ASSERTION_BLOCK_TARGETS.contains(&target.as_str()),
        StatementKind::Action { target } => ACTION_BLOCK_TARGETS.contains(&target.as_str()),
        StatementKind::Shell { .. } => false,
    }
}

enum RawLine<'a> {
    Discard,
    TestHeader(&'a str),
    SnippetHeader(&'a str),
    ShellRun { polarity: Polarity, rest: &'a str },
    ShellExpect { rest: &'a str },
    ShellSend { rest: &'a str },
    Assertion { polarity: Polarity, rest: &'a str },
    Action { rest: &'a str },
    ContentLine(&'a str),
    Unknown,
}

fn classify(line: &str) -> RawLine<'_> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return RawLine::Discard;
    }
    if let Some(rest) = trimmed.strip_prefix(">@ ") {
        return RawLine::SnippetHeader(rest.trim());
    }
    if let Some(rest) = trimmed.strip_prefix("> ") {
        return RawLine::TestHeader(rest.trim());
    }
    if trimmed == ">" {
        return RawLine::TestHeader("");
    }
    if let Some(rest) = trimmed.strip_prefix("$.") {
        return RawLine::ShellRun {
            polarity: Polarity::Positive,
            rest,
        };
    }
    if let Some(rest) = trimmed.strip_prefix("$!") {
        return RawLine::ShellRun {
            polarity: Polarity::Negative,
            rest,
        };
    }
    if let Some(rest) = trimmed.strip_prefix("$<") {
        return RawLine::ShellExpect { rest };
    }
    if let Some(rest) = trimmed.strip_prefix("$>") {
        return RawLine::ShellSend { rest };
    }
    if let Some(rest) = trimmed.strip_prefix("?.") {
        return RawLine::Assertion {
            polarity: Polarity::Positive,
            rest,
        };
    }
    if let Some(rest) = trimmed.strip_prefix("?!") {
        return RawLine::Assertion {
            polarity: Polarity::Negative,
            rest,
        };
    }
    if let Some(rest) = trimmed.strip_prefix(":.") {
        return RawLine::Action { rest };
    }
    if let Some(rest) = trimmed.strip_prefix("..") {
        return RawLine::ContentLine(rest.strip_prefix(' ').unwrap_or(rest));
    }
    RawLine::Unknown
}

fn target_string(first: &Argument) -> String {
    match first {
        Argument::Literal(s) => s.clone(),
        Argument::VarRef(s) if s.is_empty() => "@".to_string(),
        Argument::VarRef(s) => format!("@{s}"),
    }
}

/// Which kind of block (test case or snippet) statements currently belong
/// to, so the parser can reject dangling statements and duplicate names.
enum Block {
    Test(TestCase),
    Snippet(Snippet),
}

#[allow(clippy::too_many_arguments)]
fn push_interaction_step(
    verb: ShellVerb,
    rest: &str,
    file: &Path,
    source_line: usize,
    pending_block: &mut Option<Statement>,
    pending_run: &mut Option<Statement>,
    current: &mut Option<Block>,
) -> Result<(), ParseError> {
    if let Some(stmt) = pending_block.take() {
        match current {
            Some(Block::Test(t)) => t.statements.push(stmt),
            Some(Block::Snippet(s)) => s.statements.push(stmt),
            None => {}
        }
    }
    let Some(run) = pending_run.as_mut() else {
        return Err(ParseError::MisplacedInteractiveStep {
            file: file.to_path_buf(),
            line: source_line,
        });
    };
    let arguments = lexer::tokenize(rest, file, source_line)?;
    let step = Statement {
        kind: StatementKind::Shell {
            verb,
            script: Vec::new(),
        },
        polarity: Polarity::Positive,
        arguments,
        content_block: None,
        source_line,
    };
    if let StatementKind::Shell { script, .. } = &mut run.kind {
        script.push(step);
    }
    Ok(())
}

/// Parses the text of a `.spec` file. `file` is used only for diagnostics.
pub fn parse(text: &str, file: &Path) -> Result<SpecDocument, ParseError> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut doc = SpecDocument::default();
    let mut current: Option<Block> = None;
    let mut pending_run: Option<Statement> = None;
    let mut pending_block: Option<Statement> = None;

    let flush_run = |pending_run: &mut Option<Statement>, current: &mut Option<Block>| {
        if let Some(stmt) = pending_run.take() {
            match current.as_mut() {
                Some(Block::Test(t)) => t.statements.push(stmt),
                Some(Block::Snippet(s)) => s.statements.push(stmt),
                None => {}
            }
        }
    };
    let flush_block = |pending_block: &mut Option<Statement>, current: &mut Option<Block>| {
        if let Some(stmt) = pending_block.take() {
            match current.as_mut() {
                Some(Block::Test(t)) => t.statements.push(stmt),
                Some(Block::Snippet(s)) => s.statements.push(stmt),
                None => {}
            }
        }
    };
    let finalize_current = |current: Option<Block>, doc: &mut SpecDocument| -> Result<(), ParseError> {
        match current {
            Some(Block::Test(t)) => doc.tests.push(t),
            Some(Block::Snippet(s)) => {
                if doc.snippets.contains_key(&s.name) {
                    return Err(ParseError::DuplicateSnippet {
                        file: file.to_path_buf(),
                        line: s.source_line,
                        name: s.name,
                    });
                }
                doc.snippets.insert(s.name.clone(), s);
            }
            None => {}
        }
        Ok(())
    };

    for (idx, raw_line) in normalized.lines().enumerate() {
        let source_line = idx + 1;
        match classify(raw_line) {
            RawLine::Discard => {
                // Blank/comment lines terminate a pending content block but
                // are transparent to an in-progress interactive script.
                flush_block(&mut pending_block, &mut current);
            }
            RawLine::Unknown => {
                return Err(ParseError::UnknownPrefix {
                    file: file.to_path_buf(),
                    line: source_line,
                    text: raw_line.to_string(),
                });
            }
            RawLine::TestHeader(name) => {
                flush_run(&mut pending_run, &mut current);
                flush_block(&mut pending_block, &mut current);
                let finished = current.take();
                finalize_current(finished, &mut doc)?;
                current = Some(Block::Test(TestCase {
                    name: name.to_string(),
                    statements: Vec::new(),
                    source_line,
                }));
            }
            RawLine::SnippetHeader(name) => {
                flush_run(&mut pending_run, &mut current);
                flush_block(&mut pending_block, &mut current);
                let finished = current.take();
                finalize_current(finished, &mut doc)?;
                current = Some(Block::Snippet(Snippet {
                    name: name.to_string(),
                    statements: Vec::new(),
                    source_line,
                }));
            }
            RawLine::ShellRun { polarity, rest } => {
                flush_block(&mut pending_block, &mut current);
                flush_run(&mut pending_run, &mut current);
                if current.is_none() {
                    return Err(ParseError::NoEnclosingBlock {
                        file: file.to_path_buf(),
                        line: source_line,
                    });
                }
                let arguments = lexer::tokenize(rest, file, source_line)?;
                pending_run = Some(Statement {
                    kind: StatementKind::Shell {
                        verb: ShellVerb::Run,
                        script: Vec::new(),
                    },
                    polarity,
                    arguments,
                    content_block: None,
                    source_line,
                });
            }
            RawLine::ShellExpect { rest } => {
                push_interaction_step(
                    ShellVerb::Expect,
                    rest,
                    file,
                    source_line,
                    &mut pending_block,
                    &mut pending_run,
                    &mut current,
                )?;
            }
            RawLine::ShellSend { rest } => {
                push_interaction_step(
                    ShellVerb::Send,
                    rest,
                    file,
                    source_line,
                    &mut pending_block,
                    &mut pending_run,
                    &mut current,
                )?;
            }
            RawLine::Assertion { polarity, rest } => {
                flush_run(&mut pending_run, &mut current);
                flush_block(&mut pending_block, &mut current);
                if current.is_none() {
                    return Err(ParseError::NoEnclosingBlock {
                        file: file.to_path_buf(),
                        line: source_line,
                    });
                }
                let arguments = lexer::tokenize(rest, file, source_line)?;
                let Some(first) = arguments.first() else {
                    return Err(ParseError::EmptyAssertionTarget {
                        file: file.to_path_buf(),
                        line: source_line,
                        target: String::new(),
                    });
                };
                let target = target_string(first);
                pending_block = Some(Statement {
                    kind: StatementKind::Assertion { target },
                    polarity,
                    arguments,
                    content_block: None,
                    source_line,
                });
            }
            RawLine::Action { rest } => {
                flush_run(&mut pending_run, &mut current);
                flush_block(&mut pending_block, &mut current);
                if current.is_none() {
                    return Err(ParseError::NoEnclosingBlock {
                        file: file.to_path_buf(),
                        line: source_line,
                    });
                }
                let arguments = lexer::tokenize(rest, file, source_line)?;
                let Some(first) = arguments.first() else {
                    return Err(ParseError::MissingFilePath {
                        file: file.to_path_buf(),
                        line: source_line,
                    });
                };
                let target = target_string(first);
                if target == "@" && arguments.len() <= 1 {
                    return Err(ParseError::MissingSnippetName {
                        file: file.to_path_buf(),
                        line: source_line,
                    });
                }
                pending_block = Some(Statement {
                    kind: StatementKind::Action { target },
                    polarity: Polarity::Positive,
                    arguments,
                    content_block: None,
                    source_line,
                });
            }
            RawLine::ContentLine(text) => {
                match pending_block.as_mut() {
                    Some(stmt) if admits_content_block(&stmt.kind) => {
                        stmt.content_block
                            .get_or_insert_with(Vec::new)
                            .push(text.to_string());
                    }
                    _ => {
                        return Err(ParseError::DanglingContentBlock {
                            file: file.to_path_buf(),
                            line: source_line,
                        });
                    }
                }
            }
        }
    }

    flush_run(&mut pending_run, &mut current);
    flush_block(&mut pending_block, &mut current);
    finalize_current(current, &mut doc)?;

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse_ok(text: &str) -> SpecDocument {
        parse(text, &PathBuf::from("t.spec")).expect("parse should succeed")
    }

    #[test]
    fn single_test_batch_run() {
        let doc = parse_ok("> greets\n$. echo hello\n?. stdout \"ell\"\n");
        assert_eq!(doc.tests.len(), 1);
        assert_eq!(doc.tests[0].name, "greets");
        assert_eq!(doc.tests[0].statements.len(), 2);
    }

    #[test]
    fn interactive_script_attaches_to_run() {
        let doc = parse_ok("> t\n$. prog\n$< \"Name?\"\n$> \"Ada\"\n$< \"Hi Ada\"\n");
        let run = &doc.tests[0].statements[0];
        match &run.kind {
            StatementKind::Shell { verb, script } => {
                assert_eq!(*verb, ShellVerb::Run);
                assert_eq!(script.len(), 3);
            }
            _ => panic!("expected shell statement"),
        }
    }

    #[test]
    fn content_block_attaches_to_file_assertion() {
        let doc = parse_ok("> t\n?. file \"out.txt\"\n.. alpha\n.. beta\n");
        let stmt = &doc.tests[0].statements[0];
        assert_eq!(
            stmt.content_block,
            Some(vec!["alpha".to_string(), "beta".to_string()])
        );
    }

    #[test]
    fn blank_line_terminates_content_block() {
        let doc = parse_ok("> t\n:. file \"out.txt\"\n.. alpha\n\n?. file \"out.txt\"\n.. alpha\n");
        assert_eq!(doc.tests[0].statements.len(), 2);
        assert_eq!(
            doc.tests[0].statements[0].content_block,
            Some(vec!["alpha".to_string()])
        );
    }

    #[test]
    fn misplaced_expect_is_parse_error() {
        let err = parse("> t\n$< \"x\"\n", &PathBuf::from("t.spec")).unwrap_err();
        assert!(matches!(err, ParseError::MisplacedInteractiveStep { line: 2, .. }));
    }

    #[test]
    fn dangling_content_block_is_parse_error() {
        let err = parse("> t\n.. x\n", &PathBuf::from("t.spec")).unwrap_err();
        assert!(matches!(err, ParseError::DanglingContentBlock { line: 2, .. }));
    }

    #[test]
    fn unknown_prefix_is_parse_error() {
        let err = parse("> t\n~ huh\n", &PathBuf::from("t.spec")).unwrap_err();
        assert!(matches!(err, ParseError::UnknownPrefix { line: 2, .. }));
    }

    #[test]
    fn duplicate_snippet_name_is_parse_error() {
        let err = parse(">@ dup\n$. echo a\n>@ dup\n$. echo b\n", &PathBuf::from("t.spec"))
            .unwrap_err();
        assert!(matches!(err, ParseError::DuplicateSnippet { .. }));
    }

    #[test]
    fn bare_snippet_invocation_is_parse_error() {
        let err = parse("> t\n:. @\n", &PathBuf::from("t.spec")).unwrap_err();
        assert!(matches!(err, ParseError::MissingSnippetName { line: 2, .. }));
    }

    #[test]
    fn snippet_header_is_not_a_test() {
        let doc = parse_ok(">@ setup\n:. file \"x\"\n.. hi\n> t\n$. echo a\n");
        assert_eq!(doc.tests.len(), 1);
        assert!(doc.snippets.contains_key("setup"));
    }

    #[test]
    fn crlf_is_normalized() {
        let doc = parse_ok("> t\r\n$. echo hi\r\n?. stdout \"hi\"\r\n");
        assert_eq!(doc.tests[0].statements.len(), 2);
    }
}
