// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the `named.conf` parser.

#[cfg(test)]
mod tests {
    use crate::errors::ParseError;
    use crate::named_conf::parser::{split_trailing_comment, Parser};
    use crate::named_conf::{Block, ConfigElement, Simple};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn parse(text: &str) -> Result<ConfigElement, ParseError> {
        Parser::default().parse_str(Path::new("/etc/bind/named.conf"), text)
    }

    fn block(element: &ConfigElement) -> &Block {
        match element {
            ConfigElement::Block(b) => b,
            other => panic!("expected block, got {other:?}"),
        }
    }

    fn simple(element: &ConfigElement) -> &Simple {
        match element {
            ConfigElement::Simple(s) => s,
            other => panic!("expected simple, got {other:?}"),
        }
    }

    // =====================================================
    // Trailing comment splitting
    // =====================================================

    #[test]
    fn test_split_slash_comment() {
        let (code, comment) = split_trailing_comment("recursion no; // disable");
        assert_eq!(code, "recursion no; ");
        assert_eq!(comment, Some("disable"));
    }

    #[test]
    fn test_split_hash_comment() {
        let (code, comment) = split_trailing_comment("notify yes; #   tell secondaries  ");
        assert_eq!(code, "notify yes; ");
        assert_eq!(comment, Some("tell secondaries"));
    }

    #[test]
    fn test_split_ignores_delimiters_in_double_quotes() {
        let (code, comment) = split_trailing_comment(r#"directory "/var/#named//x";"#);
        assert_eq!(code, r#"directory "/var/#named//x";"#);
        assert_eq!(comment, None);
    }

    #[test]
    fn test_split_ignores_delimiters_in_single_quotes() {
        let (code, comment) = split_trailing_comment("version 'v#1'; # hidden");
        assert_eq!(code, "version 'v#1'; ");
        assert_eq!(comment, Some("hidden"));
    }

    #[test]
    fn test_split_honours_escaped_quote() {
        let (code, comment) = split_trailing_comment(r##"x "a\"#b"; // c"##);
        assert_eq!(code, r##"x "a\"#b"; "##);
        assert_eq!(comment, Some("c"));
    }

    #[test]
    fn test_split_empty_comment_is_none() {
        let (code, comment) = split_trailing_comment("recursion no; //");
        assert_eq!(code, "recursion no; ");
        assert_eq!(comment, None);
    }

    // =====================================================
    // Element classification
    // =====================================================

    #[test]
    fn test_parse_block_with_leading_comment() {
        let tree = parse("// global options\noptions {\n    directory \"/var/named\";\n};\n")
            .unwrap();

        assert_eq!(tree.children().len(), 1);
        let options = block(&tree.children()[0]);
        assert_eq!(options.name, "options");
        assert_eq!(options.value, None);
        assert_eq!(options.leading_comments, vec!["global options".to_string()]);
        assert_eq!(options.children.len(), 1);

        let directory = simple(&options.children[0]);
        assert_eq!(directory.name, "directory");
        assert_eq!(directory.value, "/var/named");
        assert!(directory.quoted);
    }

    #[test]
    fn test_parse_zone_label_and_class() {
        let tree = parse("zone \"example.com\" IN {\n    type master;\n    file \"db.example\";\n};")
            .unwrap();

        let zone = block(&tree.children()[0]);
        assert_eq!(zone.name, "zone");
        assert_eq!(zone.value.as_deref(), Some("example.com"));
        assert_eq!(zone.children.len(), 2);
        assert_eq!(simple(&zone.children[0]).value, "master");
        assert!(!simple(&zone.children[0]).quoted);
    }

    #[test]
    fn test_parse_block_with_qualifiers() {
        let tree = parse("logging {\n    channel default_log {\n        severity info;\n    };\n};")
            .unwrap();

        let logging = block(&tree.children()[0]);
        let channel = block(&logging.children[0]);
        assert_eq!(channel.name, "channel default_log");
        assert_eq!(channel.value, None);
        assert_eq!(simple(&channel.children[0]).name, "severity");
    }

    #[test]
    fn test_parse_block_closing_without_semicolon() {
        let tree = parse("options {\n    recursion no;\n}\n").unwrap();
        assert_eq!(block(&tree.children()[0]).children.len(), 1);
    }

    #[test]
    fn test_parse_inline_block_is_demoted() {
        let tree = parse("zone \"example.com\" { type master; };").unwrap();

        let zone = simple(&tree.children()[0]);
        assert_eq!(zone.name, "zone");
        assert_eq!(zone.value, "\"example.com\" { type master; }");
        assert!(!zone.quoted);
    }

    #[test]
    fn test_parse_simple_without_value() {
        let tree = parse("acl trusted {\n    localhost;\n};").unwrap();
        let acl = block(&tree.children()[0]);
        let entry = simple(&acl.children[0]);
        assert_eq!(entry.name, "localhost");
        assert_eq!(entry.value, "");
    }

    #[test]
    fn test_parse_trailing_comment_on_block_header() {
        let tree = parse("options { # main\n    recursion no; // off\n};").unwrap();

        let options = block(&tree.children()[0]);
        assert_eq!(options.trailing_comment.as_deref(), Some("main"));
        assert_eq!(
            simple(&options.children[0]).trailing_comment.as_deref(),
            Some("off")
        );
    }

    #[test]
    fn test_parse_preserves_child_order() {
        let tree = parse("a 1;\nb 2;\nc 3;\n").unwrap();
        let names: Vec<&str> = tree.children().iter().map(ConfigElement::name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_comments_before_closing_brace_carry_forward() {
        let tree = parse("options {\n    recursion no;\n    # dangling\n};\nlogging {\n};").unwrap();
        let logging = block(&tree.children()[1]);
        assert_eq!(logging.leading_comments, vec!["dangling".to_string()]);
    }

    #[test]
    fn test_multiple_leading_comments_in_order() {
        let tree = parse("# one\n// two\n\nrecursion no;").unwrap();
        assert_eq!(
            tree.children()[0].leading_comments(),
            &["one".to_string(), "two".to_string()]
        );
    }

    // =====================================================
    // Errors
    // =====================================================

    #[test]
    fn test_unterminated_block_reports_opening_line() {
        let err = parse("# header\noptions {\n    recursion no;\n").unwrap_err();
        assert_eq!(err.kind(), "UnterminatedBlock");
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_nested_unterminated_block() {
        let err = parse("options {\n    logging {\n};").unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedBlock { line: 1, .. }));
    }

    #[test]
    fn test_stray_closing_brace() {
        let err = parse("recursion no;\n};").unwrap_err();
        assert_eq!(err.kind(), "ParseError");
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_unbalanced_braces() {
        let err = parse("options { recursion no;").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_malformed_include() {
        let err = parse("include zones.conf;").unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn test_junk_after_label() {
        let err = parse("zone \"a\" bogus {\n};").unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    // =====================================================
    // Includes
    // =====================================================

    #[test]
    fn test_include_is_resolved_and_inlined() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("named.conf"),
            "include \"zones.conf\"; // zones\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("zones.conf"),
            "zone \"example.com\" {\n    type master;\n};\n",
        )
        .unwrap();

        let tree = Parser::default()
            .parse_file(&dir.path().join("named.conf"))
            .unwrap();

        assert_eq!(tree.children().len(), 1);
        let ConfigElement::Include(include) = &tree.children()[0] else {
            panic!("expected include");
        };
        assert_eq!(include.path, "zones.conf");
        assert!(include.resolved_path.is_absolute());
        assert!(include.resolved_path.ends_with("zones.conf"));
        assert_eq!(include.trailing_comment.as_deref(), Some("zones"));
        assert_eq!(include.children.len(), 1);
        assert_eq!(block(&include.children[0]).value.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_include_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Parser::default()
            .parse_str(&dir.path().join("named.conf"), "\ninclude \"missing.conf\";")
            .unwrap_err();
        assert_eq!(err.kind(), "IncludeIOError");
        assert_eq!(err.line(), 2);
        assert!(err.to_string().contains("missing.conf"));
    }

    #[test]
    fn test_include_cycle_is_detected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.conf"), "include \"b.conf\";\n").unwrap();
        fs::write(dir.path().join("b.conf"), "include \"./a.conf\";\n").unwrap();

        let err = Parser::default()
            .parse_file(&dir.path().join("a.conf"))
            .unwrap_err();
        assert!(matches!(err, ParseError::IncludeCycle { .. }));
    }

    #[test]
    fn test_include_depth_limit() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("0.conf"), "include \"1.conf\";\n").unwrap();
        fs::write(dir.path().join("1.conf"), "include \"2.conf\";\n").unwrap();
        fs::write(dir.path().join("2.conf"), "recursion no;\n").unwrap();

        assert!(Parser::new(2).parse_file(&dir.path().join("0.conf")).is_ok());
        let err = Parser::new(1)
            .parse_file(&dir.path().join("0.conf"))
            .unwrap_err();
        assert!(matches!(err, ParseError::IncludeDepthExceeded { limit: 1, .. }));
    }

    #[test]
    fn test_error_in_included_file_names_that_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("named.conf"), "include \"bad.conf\";\n").unwrap();
        fs::write(dir.path().join("bad.conf"), "ok yes;\noptions {\n").unwrap();

        let err = Parser::default()
            .parse_file(&dir.path().join("named.conf"))
            .unwrap_err();
        match err {
            ParseError::UnterminatedBlock { file, line, .. } => {
                assert!(file.ends_with("bad.conf"));
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_parse_file_missing_root() {
        let dir = TempDir::new().unwrap();
        let err = Parser::default()
            .parse_file(&dir.path().join("absent.conf"))
            .unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
        assert_eq!(err.kind(), "IOError");
    }
}
