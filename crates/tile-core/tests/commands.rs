use serde_json::{Value, json};
use tile_core::{
    CommandRegistry, CommandSpec, Editor, EditorConfig, EditorEvent, MarkKind, Node, NodeKind,
    Selection, TilePlugin, clamp_image_size,
};

fn editor() -> Editor {
    Editor::new(EditorConfig::default()).unwrap()
}

fn block_texts(editor: &Editor) -> Vec<String> {
    editor.doc().children().iter().map(Node::text_content).collect()
}

#[test]
fn enter_in_an_empty_document_adds_a_second_tile() {
    let mut editor = editor();
    assert_eq!(*editor.selection(), Selection::cursor(2));

    let event = editor.on_command("core.split_block", None).unwrap();
    assert_eq!(
        event,
        EditorEvent::Committed {
            version: 1,
            scroll_into_view: true,
        }
    );
    assert_eq!(editor.doc().children().len(), 2);
    assert_eq!(*editor.selection(), Selection::cursor(6));
    for tile in editor.doc().children() {
        assert_eq!(tile.kind(), NodeKind::BlockTile);
        let inner = tile.as_element().unwrap().children();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].kind(), NodeKind::Paragraph);
    }
}

#[test]
fn enter_at_the_end_of_text_keeps_the_text_whole() {
    let mut editor = editor();
    editor.on_text_input("hello");
    assert_eq!(*editor.selection(), Selection::cursor(7));

    editor.on_command("core.split_block", None).unwrap();
    assert_eq!(block_texts(&editor), vec!["hello", ""]);
    assert_eq!(*editor.selection(), Selection::cursor(11));

    editor.on_text_input("world");
    assert_eq!(block_texts(&editor), vec!["hello", "world"]);
}

#[test]
fn enter_in_the_middle_of_text_splits_the_tile() {
    let mut editor = editor();
    editor.on_text_input("hello");
    editor.on_selection_change(Selection::cursor(4));

    editor.on_command("core.split_block", None).unwrap();
    assert_eq!(block_texts(&editor), vec!["he", "", "llo"]);
    assert_eq!(*editor.selection(), Selection::cursor(8));
}

#[test]
fn heading_goes_after_the_paragraph_in_the_same_tile() {
    let mut editor = editor();
    editor.on_text_input("hello");

    let event = editor
        .on_command("heading.insert", Some(json!({ "level": 2, "text": "Title" })))
        .unwrap();
    assert!(event.is_committed());
    assert_eq!(editor.doc().children().len(), 1);
    let tile = editor.doc().children()[0].as_element().unwrap().clone();
    let kinds: Vec<NodeKind> = tile.children().iter().map(Node::kind).collect();
    assert_eq!(kinds, vec![NodeKind::Paragraph, NodeKind::Heading]);
    assert_eq!(tile.children()[1].attrs().unwrap()["level"], json!(2));
    assert_eq!(*editor.selection(), Selection::cursor(14));
}

#[test]
fn heading_level_is_checked() {
    let mut editor = editor();
    let err = editor
        .on_command("heading.insert", Some(json!({ "level": 7 })))
        .unwrap_err();
    assert_eq!(err.to_string(), "Heading level must be 1-6, got 7");
}

#[test]
fn wide_images_are_scaled_to_the_configured_width() {
    assert_eq!(clamp_image_size(600, 400, 300), (300, 200));
    assert_eq!(clamp_image_size(200, 100, 300), (200, 100));
    assert_eq!(clamp_image_size(1000, 333, 300), (300, 100));

    let mut editor = editor();
    editor
        .on_command(
            "image.insert",
            Some(json!({ "src": "https://example.com/a.png", "width": 600, "height": 400 })),
        )
        .unwrap();
    let rp = editor.doc().resolve(2).unwrap();
    let image = rp.node_after().unwrap();
    assert_eq!(image.kind(), NodeKind::Image);
    let attrs = image.attrs().unwrap();
    assert_eq!(attrs["width"], json!(300));
    assert_eq!(attrs["height"], json!(200));
    assert_eq!(attrs["alt"], Value::Null);
    assert_eq!(*editor.selection(), Selection::cursor(3));
}

#[test]
fn image_without_a_size_uses_the_defaults() {
    let mut editor = Editor::new(EditorConfig {
        max_image_width: 100,
        ..EditorConfig::default()
    })
    .unwrap();
    editor
        .on_command("image.insert", Some(json!({ "src": "a.png", "alt": "A" })))
        .unwrap();
    let rp = editor.doc().resolve(2).unwrap();
    let attrs = rp.node_after().unwrap().attrs().unwrap().clone();
    assert_eq!(attrs["width"], json!(200));
    assert_eq!(attrs["alt"], json!("A"));

    let err = editor
        .on_command("image.insert", Some(json!({ "src": "  " })))
        .unwrap_err();
    assert_eq!(err.to_string(), "Missing args.src");
}

#[test]
fn datetime_insert_defaults_to_null() {
    let mut editor = editor();
    editor.on_command("datetime.insert", None).unwrap();
    editor
        .on_command("datetime.insert", Some(json!({ "timestamp": 1_700_000_000_000_i64 })))
        .unwrap();

    let para = editor.doc().resolve(2).unwrap().parent().clone();
    let stamps: Vec<Value> = para
        .children()
        .iter()
        .map(|n| n.attrs().unwrap()["timestamp"].clone())
        .collect();
    assert_eq!(stamps, vec![Value::Null, json!(1_700_000_000_000_i64)]);
    assert_eq!(*editor.selection(), Selection::cursor(4));
}

#[test]
fn font_size_commands_use_the_configured_sizes() {
    let mut editor = editor();
    editor
        .on_command("marks.set_font_size", Some(json!({ "size": "3" })))
        .unwrap();
    editor.on_text_input("big");
    let size: String = editor.run_query("marks.font_size", None).unwrap();
    assert_eq!(size, "3");

    let err = editor
        .on_command("marks.set_font_size", Some(json!({ "size": "9" })))
        .unwrap_err();
    assert_eq!(err.to_string(), "Unknown font size: 9");

    editor.on_selection_change(Selection::normalize(2, 5));
    editor.on_command("marks.unset_font_size", None).unwrap();
    let size: String = editor.run_query("marks.font_size", None).unwrap();
    assert_eq!(size, "1");
}

#[test]
fn link_commands_set_and_clear_the_href() {
    let mut editor = editor();
    editor.on_text_input("docs");
    editor.on_selection_change(Selection::normalize(2, 6));

    editor
        .on_command("marks.set_link", Some(json!({ "url": "https://example.com" })))
        .unwrap();
    let marks = editor.doc().resolve(3).unwrap().marks();
    let link = marks.get(MarkKind::Link).unwrap();
    assert_eq!(link.attr_str("href"), Some("https://example.com"));
    assert_eq!(link.attr_str("ref"), Some("noopener noreferrer nofollow"));

    editor.on_command("marks.unset_link", None).unwrap();
    assert!(editor.doc().resolve(3).unwrap().marks().is_empty());
}

#[test]
fn commands_that_do_not_apply_are_ignored() {
    let mut editor = editor();
    editor
        .on_command("heading.insert", Some(json!({ "level": 1 })))
        .unwrap();
    let version = editor.version();

    let event = editor.on_command("marks.toggle_bold", None).unwrap();
    assert_eq!(event, EditorEvent::Ignored);
    assert_eq!(editor.version(), version);
}

#[test]
fn unknown_commands_and_bad_args_are_errors() {
    let mut editor = editor();
    let err = editor.on_command("core.nope", None).unwrap_err();
    assert_eq!(err.to_string(), "Unknown command: core.nope");

    let err = editor
        .on_command("marks.set_link", Some(json!({ "target": "_self" })))
        .unwrap_err();
    assert!(err.to_string().starts_with("Invalid args:"));
    assert_eq!(editor.version(), 0);
}

struct Duplicate;

impl TilePlugin for Duplicate {
    fn id(&self) -> &'static str {
        "duplicate"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new("core.insert_paragraph", "Again", |_, _, _| Ok(None))]
    }
}

#[test]
fn registry_rejects_duplicate_ids() {
    let mut registry = CommandRegistry::tile();
    assert_eq!(registry.command("core.split_block").unwrap().label, "New block");
    assert!(registry.query("marks.button_state").is_some());

    let err = registry.register_plugin(Box::new(Duplicate)).unwrap_err();
    assert_eq!(err, "Duplicate command id: core.insert_paragraph");
}
