use tile_core::{
    Attrs, Document, EditError, Mark, MarkKind, MarkSet, Node, NodeKind, Schema, Walk,
    insert_node, replace_range,
};

fn text(schema: &Schema, s: &str, marks: &[Mark]) -> Node {
    schema
        .create_text_run(s, marks.iter().cloned().collect::<MarkSet>())
        .unwrap()
}

fn paragraph(schema: &Schema, children: Vec<Node>) -> Node {
    schema
        .create_container(NodeKind::Paragraph, &Attrs::new(), children)
        .unwrap()
}

fn tile(schema: &Schema, children: Vec<Node>) -> Node {
    schema
        .create_container(NodeKind::BlockTile, &Attrs::new(), children)
        .unwrap()
}

fn two_tiles(schema: &Schema) -> Document {
    // tile 0..9 holds p("hello") at 1..8; tile 9..18 holds p("world") at 10..17
    Document::new(
        schema,
        vec![
            tile(schema, vec![paragraph(schema, vec![text(schema, "hello", &[])])]),
            tile(schema, vec![paragraph(schema, vec![text(schema, "world", &[])])]),
        ],
    )
    .unwrap()
}

#[test]
fn sizes_follow_position_rules() {
    let schema = Schema::tile();
    let doc = two_tiles(&schema);
    assert_eq!(doc.content_size(), 18);
    assert_eq!(doc.children()[0].node_size(), 9);
    assert_eq!(doc.text_content(), "helloworld");
    assert_eq!(doc.textblock_ranges(), vec![(2, 7), (11, 16)]);
}

#[test]
fn resolve_reports_parent_and_offsets() {
    let schema = Schema::tile();
    let doc = two_tiles(&schema);

    let rp = doc.resolve(4).unwrap();
    assert_eq!(rp.depth(), 2);
    assert_eq!(rp.parent().kind(), NodeKind::Paragraph);
    assert_eq!(rp.parent_offset(), 2);
    assert_eq!(rp.text_offset(), 2);
    assert_eq!(rp.start(2), 2);
    assert_eq!(rp.end(2), 7);

    let rp = doc.resolve(9).unwrap();
    assert_eq!(rp.depth(), 0);
    assert_eq!(rp.index(0), 1);

    assert_eq!(
        doc.resolve(19).unwrap_err(),
        EditError::InvalidPosition { pos: 19, size: 18 }
    );
}

#[test]
fn marks_at_position_prefer_the_run_before() {
    let schema = Schema::tile();
    let bold = schema.create_mark(MarkKind::Bold, &Attrs::new()).unwrap();
    let doc = Document::new(
        &schema,
        vec![tile(
            &schema,
            vec![paragraph(
                &schema,
                vec![text(&schema, "ab", &[bold.clone()]), text(&schema, "cd", &[])],
            )],
        )],
    )
    .unwrap();

    // start of the paragraph: nothing before, so the run after counts
    assert!(doc.resolve(2).unwrap().marks().contains(MarkKind::Bold));
    assert!(doc.resolve(3).unwrap().marks().contains(MarkKind::Bold));
    assert!(doc.resolve(4).unwrap().marks().contains(MarkKind::Bold));
    assert!(doc.resolve(5).unwrap().marks().is_empty());
    assert!(doc.resolve(6).unwrap().marks().is_empty());
}

#[test]
fn replace_within_a_textblock_shares_untouched_siblings() {
    let schema = Schema::tile();
    let doc = two_tiles(&schema);

    let next = replace_range(&schema, &doc, 3, 6, &[text(&schema, "EY", &[])]).unwrap();
    assert_eq!(next.text_content(), "hEYoworld");
    assert!(next.children()[1].ptr_eq(&doc.children()[1]));
    assert!(!next.children()[0].ptr_eq(&doc.children()[0]));
    assert_eq!(doc.text_content(), "helloworld");
}

#[test]
fn replace_across_blocks_joins_the_sides() {
    let schema = Schema::tile();
    let doc = two_tiles(&schema);

    let next = replace_range(&schema, &doc, 4, 13, &[]).unwrap();
    assert_eq!(next.children().len(), 1);
    assert_eq!(next.text_content(), "herld");

    let next = replace_range(&schema, &doc, 7, 11, &[]).unwrap();
    assert_eq!(next.children().len(), 1);
    assert_eq!(next.text_content(), "helloworld");
}

#[test]
fn failed_replace_leaves_the_document_untouched() {
    let schema = Schema::tile();
    let doc = two_tiles(&schema);
    let before = doc.clone();

    // a paragraph cannot hold a block tile
    let nested = tile(&schema, vec![paragraph(&schema, vec![])]);
    let err = replace_range(&schema, &doc, 3, 3, &[nested]).unwrap_err();
    assert!(matches!(err, EditError::SchemaViolation(_)));
    assert_eq!(doc, before);

    // emptying the document would violate `tile+`
    let err = replace_range(&schema, &doc, 0, 18, &[]).unwrap_err();
    assert!(matches!(err, EditError::SchemaViolation(_)));

    assert!(matches!(
        replace_range(&schema, &doc, 2, 40, &[]),
        Err(EditError::InvalidPosition { pos: 40, .. })
    ));
    assert!(matches!(
        replace_range(&schema, &doc, 6, 3, &[]),
        Err(EditError::InvalidPosition { .. })
    ));
}

#[test]
fn nodes_between_visits_in_document_order_and_stops_early() {
    let schema = Schema::tile();
    let doc = two_tiles(&schema);

    let mut seen = Vec::new();
    doc.nodes_between(3, 12, |node, pos, _, _| {
        seen.push((node.kind(), pos));
        Walk::Descend
    });
    assert_eq!(
        seen,
        vec![
            (NodeKind::BlockTile, 0),
            (NodeKind::Paragraph, 1),
            (NodeKind::Text, 2),
            (NodeKind::BlockTile, 9),
            (NodeKind::Paragraph, 10),
            (NodeKind::Text, 11),
        ]
    );

    let mut count = 0;
    let finished = doc.nodes_between(0, 18, |node, _, _, _| {
        count += 1;
        if node.is_text() { Walk::Stop } else { Walk::Descend }
    });
    assert!(!finished);
    assert_eq!(count, 3);

    let mut kinds = Vec::new();
    doc.nodes_between(0, 18, |node, _, _, _| {
        kinds.push(node.kind());
        Walk::Skip
    });
    assert_eq!(kinds, vec![NodeKind::BlockTile, NodeKind::BlockTile]);
}

#[test]
fn insert_block_in_the_middle_of_a_paragraph_splits_it() {
    let schema = Schema::tile();
    let doc = two_tiles(&schema);
    let new_tile = tile(&schema, vec![paragraph(&schema, vec![])]);

    let inserted = insert_node(&schema, &doc, 4, new_tile).unwrap();
    let texts: Vec<String> = inserted
        .doc
        .children()
        .iter()
        .map(Node::text_content)
        .collect();
    assert_eq!(texts, vec!["he", "", "llo", "world"]);
    assert_eq!((inserted.start, inserted.end), (6, 10));
}

#[test]
fn insert_block_at_the_end_of_a_paragraph_goes_after_its_tile() {
    let schema = Schema::tile();
    let doc = two_tiles(&schema);
    let new_tile = tile(&schema, vec![paragraph(&schema, vec![])]);

    let inserted = insert_node(&schema, &doc, 7, new_tile).unwrap();
    let texts: Vec<String> = inserted
        .doc
        .children()
        .iter()
        .map(Node::text_content)
        .collect();
    assert_eq!(texts, vec!["hello", "", "world"]);
    assert_eq!((inserted.start, inserted.end), (9, 13));
    assert!(inserted.doc.children()[0].ptr_eq(&doc.children()[0]));
}

#[test]
fn insert_inline_leaf_goes_into_the_textblock() {
    let schema = Schema::tile();
    let doc = two_tiles(&schema);
    let datetime = schema.create_leaf(NodeKind::Datetime, &Attrs::new()).unwrap();

    let inserted = insert_node(&schema, &doc, 4, datetime).unwrap();
    assert_eq!((inserted.start, inserted.end), (4, 5));
    assert_eq!(inserted.doc.content_size(), 19);
    let rp = inserted.doc.resolve(4).unwrap();
    assert_eq!(rp.node_after().map(Node::kind), Some(NodeKind::Datetime));
}
