use serde_json::json;
use tile_core::{
    AttrSpec, AttrType, Attrs, EditError, MarkKind, MarkSpec, Node, NodeKind, NodeSpec, Schema,
    SchemaError, StructElement,
};

fn minimal() -> tile_core::SchemaBuilder {
    Schema::builder()
        .register_node_type(NodeKind::Doc, NodeSpec::new("paragraph+"))
        .register_node_type(NodeKind::Paragraph, NodeSpec::new("text*"))
        .register_node_type(NodeKind::Text, NodeSpec::new("").inline())
}

#[test]
fn tile_schema_content_rules() {
    let schema = Schema::tile();

    assert!(schema.validate_content(NodeKind::Doc, &[NodeKind::BlockTile]));
    assert!(schema.validate_content(NodeKind::Doc, &[NodeKind::BlockTile, NodeKind::BlockTile]));
    assert!(!schema.validate_content(NodeKind::Doc, &[]));
    assert!(!schema.validate_content(NodeKind::Doc, &[NodeKind::Paragraph]));

    assert!(schema.validate_content(
        NodeKind::BlockTile,
        &[NodeKind::Paragraph, NodeKind::Heading]
    ));
    assert!(!schema.validate_content(NodeKind::BlockTile, &[]));

    assert!(schema.validate_content(NodeKind::Paragraph, &[]));
    assert!(schema.validate_content(
        NodeKind::Paragraph,
        &[NodeKind::Text, NodeKind::Image, NodeKind::Datetime, NodeKind::Text]
    ));
    assert!(!schema.validate_content(NodeKind::Paragraph, &[NodeKind::Paragraph]));
    assert!(!schema.validate_content(NodeKind::Image, &[NodeKind::Text]));
}

#[test]
fn tile_schema_mark_allowance() {
    let schema = Schema::tile();

    for mark in MarkKind::ALL {
        assert!(schema.allows_mark_type(NodeKind::Paragraph, mark));
        assert!(!schema.allows_mark_type(NodeKind::Heading, mark));
        assert!(!schema.allows_mark_type(NodeKind::BlockTile, mark));
        assert!(!schema.allows_mark_type(NodeKind::Doc, mark));
    }
}

#[test]
fn create_and_fill_builds_the_empty_document_shape() {
    let schema = Schema::tile();
    let Node::Element(doc) = schema.create_and_fill(NodeKind::Doc).unwrap() else {
        panic!("expected element");
    };
    assert_eq!(doc.children().len(), 1);
    let Node::Element(tile) = &doc.children()[0] else {
        panic!("expected tile");
    };
    assert_eq!(tile.kind(), NodeKind::BlockTile);
    assert_eq!(tile.children().len(), 1);
    assert_eq!(tile.children()[0].kind(), NodeKind::Paragraph);
    assert_eq!(doc.content_size(), 4);
}

#[test]
fn find_wrapping_reaches_inline_content_from_the_root() {
    let schema = Schema::tile();
    assert_eq!(
        schema.find_wrapping(NodeKind::Doc, NodeKind::Text),
        Some(vec![NodeKind::BlockTile, NodeKind::Paragraph])
    );
    assert_eq!(
        schema.find_wrapping(NodeKind::Doc, NodeKind::Heading),
        Some(vec![NodeKind::BlockTile])
    );
    assert_eq!(
        schema.find_wrapping(NodeKind::Paragraph, NodeKind::Image),
        Some(vec![])
    );
    assert_eq!(schema.find_wrapping(NodeKind::Paragraph, NodeKind::BlockTile), None);
}

#[test]
fn attrs_are_merged_with_defaults() {
    let schema = Schema::tile();

    let Node::Element(heading) = schema
        .create_container(NodeKind::Heading, &Attrs::new(), vec![])
        .unwrap()
    else {
        panic!("expected element");
    };
    assert_eq!(heading.attrs().get("level"), Some(&json!(1)));

    let image = schema
        .create_leaf(
            NodeKind::Image,
            &Attrs::from([("src".to_string(), json!("a.png"))]),
        )
        .unwrap();
    let attrs = image.attrs().unwrap();
    assert_eq!(attrs.get("width"), Some(&json!(200)));
    assert_eq!(attrs.get("height"), Some(&json!(200)));
    assert_eq!(attrs.get("alt"), Some(&json!(null)));

    let link = schema
        .create_mark(
            MarkKind::Link,
            &Attrs::from([("href".to_string(), json!("https://example.com"))]),
        )
        .unwrap();
    assert_eq!(link.attr_str("target"), Some("_blank"));
    assert_eq!(link.attr_str("ref"), Some("noopener noreferrer nofollow"));

    let size = schema.create_mark(MarkKind::FontSize, &Attrs::new()).unwrap();
    assert_eq!(size.attr_str("size"), Some("1"));
}

#[test]
fn required_and_mistyped_attrs_are_schema_violations() {
    let schema = Schema::tile();

    assert!(matches!(
        schema.create_leaf(NodeKind::Image, &Attrs::new()),
        Err(EditError::SchemaViolation(_))
    ));
    assert!(matches!(
        schema.create_container(
            NodeKind::Heading,
            &Attrs::from([("level".to_string(), json!(7))]),
            vec![]
        ),
        Err(EditError::SchemaViolation(_))
    ));
    assert!(matches!(
        schema.create_leaf(
            NodeKind::Datetime,
            &Attrs::from([("timestamp".to_string(), json!("yesterday"))]),
        ),
        Err(EditError::SchemaViolation(_))
    ));
}

#[test]
fn container_children_are_checked_against_the_content_rule() {
    let schema = Schema::tile();
    let text = schema.create_text_run("hi", Default::default()).unwrap();

    assert!(matches!(
        schema.create_container(NodeKind::BlockTile, &Attrs::new(), vec![text.clone()]),
        Err(EditError::SchemaViolation(_))
    ));
    assert!(matches!(
        schema.create_container(NodeKind::BlockTile, &Attrs::new(), vec![]),
        Err(EditError::SchemaViolation(_))
    ));
    assert!(schema
        .create_container(NodeKind::Paragraph, &Attrs::new(), vec![text])
        .is_ok());
    assert!(schema.create_text_run("", Default::default()).is_err());
}

#[test]
fn heading_rejects_marked_children() {
    let schema = Schema::tile();
    let bold = schema.create_mark(MarkKind::Bold, &Attrs::new()).unwrap();
    let text = schema
        .create_text_run("hi", [bold].into_iter().collect())
        .unwrap();

    assert!(matches!(
        schema.create_container(NodeKind::Heading, &Attrs::new(), vec![text.clone()]),
        Err(EditError::SchemaViolation(_))
    ));
    assert!(schema
        .create_container(NodeKind::Paragraph, &Attrs::new(), vec![text])
        .is_ok());
}

#[test]
fn adjacent_runs_with_equal_marks_are_merged() {
    let schema = Schema::tile();
    let a = schema.create_text_run("ab", Default::default()).unwrap();
    let b = schema.create_text_run("cd", Default::default()).unwrap();
    let Node::Element(p) = schema
        .create_container(NodeKind::Paragraph, &Attrs::new(), vec![a, b])
        .unwrap()
    else {
        panic!("expected element");
    };
    assert_eq!(p.children().len(), 1);
    assert_eq!(p.children()[0].as_text(), Some("abcd"));
    assert_eq!(p.content_size(), 4);
}

#[test]
fn builder_rejects_malformed_rules() {
    let err = Schema::builder()
        .register_node_type(NodeKind::Doc, NodeSpec::new("paragraph+ ("))
        .register_node_type(NodeKind::Paragraph, NodeSpec::new("text*"))
        .register_node_type(NodeKind::Text, NodeSpec::new(""))
        .build()
        .unwrap_err();
    assert!(matches!(err, SchemaError::MalformedContentRule { node: "doc", .. }));

    let err = Schema::builder()
        .register_node_type(NodeKind::Doc, NodeSpec::new("section+"))
        .register_node_type(NodeKind::Text, NodeSpec::new(""))
        .build()
        .unwrap_err();
    assert!(matches!(err, SchemaError::UnknownContentName { ref name, .. } if name == "section"));
}

#[test]
fn builder_rejects_duplicates_bad_defaults_and_missing_types() {
    let err = minimal()
        .register_node_type(NodeKind::Paragraph, NodeSpec::new("text*"))
        .build()
        .unwrap_err();
    assert_eq!(err, SchemaError::DuplicateNode("paragraph"));

    let err = minimal()
        .register_mark_type(MarkKind::Bold, MarkSpec::new(|_| StructElement::new("b")))
        .register_mark_type(MarkKind::Bold, MarkSpec::new(|_| StructElement::new("b")))
        .build()
        .unwrap_err();
    assert_eq!(err, SchemaError::DuplicateMark("bold"));

    let err = minimal()
        .register_node_type(
            NodeKind::Heading,
            NodeSpec::new("text*").attr(AttrSpec::with_default(
                "level",
                AttrType::Int { min: 1, max: 6 },
                json!(9),
            )),
        )
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        SchemaError::BadAttrDefault {
            owner: "heading",
            attr: "level"
        }
    );

    let err = Schema::builder()
        .register_node_type(NodeKind::Text, NodeSpec::new(""))
        .build()
        .unwrap_err();
    assert_eq!(err, SchemaError::MissingType("doc"));
}

#[test]
fn custom_schema_without_marks_allows_none() {
    let schema = minimal().build().unwrap();
    assert!(!schema.allows_mark_type(NodeKind::Paragraph, MarkKind::Bold));
    assert!(schema.validate_content(NodeKind::Doc, &[NodeKind::Paragraph]));
    assert!(schema.create_mark(MarkKind::Bold, &Attrs::new()).is_err());
}
