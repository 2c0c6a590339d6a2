// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for configuration rendering.

#[cfg(test)]
mod tests {
    use crate::errors::GenerateError;
    use crate::named_conf::generator::{generate, render};
    use crate::named_conf::parser::Parser;
    use crate::named_conf::{Block, ConfigElement, Include, Simple};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn parse(text: &str) -> ConfigElement {
        Parser::default()
            .parse_str(Path::new("/etc/bind/named.conf"), text)
            .unwrap()
    }

    #[test]
    fn test_round_trip_canonical_form() {
        let input = "// comment\noptions {\n  directory   \"/var/named\";\n};\n";
        let tree = parse(input);

        assert_eq!(
            generate(&tree),
            "# comment\noptions {\n    directory \"/var/named\";\n};\n"
        );
    }

    #[test]
    fn test_nested_indentation() {
        let tree = ConfigElement::root(vec![ConfigElement::Block(Block {
            name: "logging".to_string(),
            children: vec![ConfigElement::Block(Block {
                name: "channel default_log".to_string(),
                children: vec![ConfigElement::Simple(Simple::bare("severity", "info"))],
                ..Block::default()
            })],
            ..Block::default()
        })]);

        assert_eq!(
            generate(&tree),
            "logging {\n    channel default_log {\n        severity info;\n    };\n};\n"
        );
    }

    #[test]
    fn test_block_label_is_quoted() {
        let tree = ConfigElement::root(vec![ConfigElement::Block(Block {
            name: "zone".to_string(),
            value: Some("example.com".to_string()),
            children: vec![ConfigElement::Simple(Simple::bare("type", "master"))],
            ..Block::default()
        })]);

        assert_eq!(
            generate(&tree),
            "zone \"example.com\" {\n    type master;\n};\n"
        );
    }

    #[test]
    fn test_simple_forms() {
        let tree = ConfigElement::root(vec![
            ConfigElement::Simple(Simple::quoted("directory", "/var/named")),
            ConfigElement::Simple(Simple::bare("recursion", "no")),
            ConfigElement::Simple(Simple::quoted("localhost", "")),
        ]);

        assert_eq!(
            generate(&tree),
            "directory \"/var/named\";\nrecursion no;\nlocalhost;\n"
        );
    }

    #[test]
    fn test_comments_rendered_with_hash() {
        let mut simple = Simple::bare("notify", "yes");
        simple.leading_comments = vec!["first".to_string(), "second".to_string()];
        simple.trailing_comment = Some("inline".to_string());
        let tree = ConfigElement::root(vec![ConfigElement::Block(Block {
            name: "options".to_string(),
            trailing_comment: Some("opts".to_string()),
            children: vec![ConfigElement::Simple(simple)],
            ..Block::default()
        })]);

        assert_eq!(
            generate(&tree),
            "options { # opts\n    # first\n    # second\n    notify yes; # inline\n};\n"
        );
    }

    #[test]
    fn test_include_children_not_expanded() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("named.conf"), "include \"zones.conf\";\n").unwrap();
        fs::write(
            dir.path().join("zones.conf"),
            "zone \"example.com\" { type master; };\n",
        )
        .unwrap();

        let tree = Parser::default()
            .parse_file(&dir.path().join("named.conf"))
            .unwrap();
        let ConfigElement::Include(include) = &tree.children()[0] else {
            panic!("expected include");
        };
        assert_eq!(include.children.len(), 1);
        assert_eq!(generate(&tree), "include \"zones.conf\";\n");
    }

    #[test]
    fn test_include_trailing_comment() {
        let tree = ConfigElement::root(vec![ConfigElement::Include(Include {
            path: "/etc/bind/keys.conf".to_string(),
            resolved_path: PathBuf::from("/etc/bind/keys.conf"),
            trailing_comment: Some("keys".to_string()),
            ..Include::default()
        })]);
        assert_eq!(generate(&tree), "include \"/etc/bind/keys.conf\"; # keys\n");
    }

    #[test]
    fn test_inline_block_regenerates_verbatim() {
        let input = "listen-on port 53 { 127.0.0.1; any; };\n";
        assert_eq!(generate(&parse(input)), input);
    }

    #[test]
    fn test_non_root_element_renders_alone() {
        let element = ConfigElement::Simple(Simple::bare("recursion", "no"));
        assert_eq!(generate(&element), "recursion no;\n");
    }

    #[test]
    fn test_render_without_tree_is_nil_root() {
        assert_eq!(render(None), Err(GenerateError::NilRoot));
        let tree = ConfigElement::root(Vec::new());
        assert_eq!(render(Some(&tree)), Ok(String::new()));
    }

    #[test]
    fn test_parse_generate_parse_is_stable() {
        let input = r#"
// Primary configuration
options {
    directory "/var/cache/bind"; // working dir
    recursion no;
    allow-transfer { none; };
    forwarders {
        8.8.8.8;
        8.8.4.4;
    };
};

# zones
zone "example.com" IN {
    type master;
    file "/etc/bind/db.example.com";
};
"#;
        let first = parse(input);
        let rendered = generate(&first);
        let second = parse(&rendered);

        assert_eq!(first, second);
        assert_eq!(generate(&second), rendered);
    }

    #[test]
    fn test_json_shape() {
        let tree = parse("zone \"example.com\" {\n    type master;\n};\n");
        let json = serde_json::to_value(&tree).unwrap();

        assert_eq!(json["kind"], "root");
        assert_eq!(json["children"][0]["kind"], "block");
        assert_eq!(json["children"][0]["value"], "example.com");
        assert_eq!(json["children"][0]["children"][0]["kind"], "simple");
        assert_eq!(json["children"][0]["children"][0]["quoted"], false);

        let back: ConfigElement = serde_json::from_value(json).unwrap();
        assert_eq!(back, tree);
    }
}
