//! Snapshot-tests the parser's AST shape on a representative statement so
//! grammar regressions show up as a diffable snapshot instead of a pile of
//! hand-written field assertions.

use std::path::Path;

use spectest::parser;

#[test]
fn assertion_statement_ast_shape() {
    let doc = parser::parse("> t\n?. stdout \"ell\"\n", Path::new("t.spec")).unwrap();
    let statement = &doc.tests[0].statements[0];

    insta::assert_debug_snapshot!(statement, @r###"
    Statement {
        kind: Assertion {
            target: "stdout",
        },
        polarity: Positive,
        arguments: [
            Literal(
                "stdout",
            ),
            Literal(
                "ell",
            ),
        ],
        content_block: None,
        source_line: 2,
    }
    "###);
}

#[test]
fn run_statement_with_interactive_script_ast_shape() {
    let doc = parser::parse("> t\n$. prog\n$> \"Ada\"\n$< \"Hi Ada\"\n", Path::new("t.spec")).unwrap();
    let statement = &doc.tests[0].statements[0];

    insta::assert_debug_snapshot!(statement, @r###"
    Statement {
        kind: Shell {
            verb: Run,
            script: [
                Statement {
                    kind: Shell {
                        verb: Send,
                        script: [],
                    },
                    polarity: Positive,
                    arguments: [
                        Literal(
                            "Ada",
                        ),
                    ],
                    content_block: None,
                    source_line: 3,
                },
                Statement {
                    kind: Shell {
                        verb: Expect,
                        script: [],
                    },
                    polarity: Positive,
                    arguments: [
                        Literal(
                            "Hi Ada",
                        ),
                    ],
                    content_block: None,
                    source_line: 4,
                },
            ],
        },
        polarity: Positive,
        arguments: [
            Literal(
                "prog",
            ),
        ],
        content_block: None,
        source_line: 2,
    }
    "###);
}
