use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::json;
use tile_core::{
    DocValue, Editor, EditorConfig, EditorEvent, ImageSource, KeyCombo, MarkButtonState,
    MarkKind, Node, NodeKind, PastePayload, Selection, StructElement, Structure,
};

fn editor() -> Editor {
    Editor::new(EditorConfig::default()).unwrap()
}

fn block_texts(editor: &Editor) -> Vec<String> {
    editor.doc().children().iter().map(Node::text_content).collect()
}

#[test]
fn key_combos_parse_and_print() {
    let combo: KeyCombo = "Mod-b".parse().unwrap();
    assert_eq!(combo, KeyCombo::new("b").with_mod());
    assert_eq!(combo.to_string(), "Mod-b");

    let combo: KeyCombo = "Ctrl-Shift-Enter".parse().unwrap();
    assert_eq!(combo, KeyCombo::new("Enter").with_mod().with_shift());

    let combo: KeyCombo = "Cmd--".parse().unwrap();
    assert_eq!(combo, KeyCombo::new("-").with_mod());

    assert_eq!("Mod-B".parse::<KeyCombo>().unwrap().key, "b");
    assert!("Hyper-b".parse::<KeyCombo>().is_err());
    assert!("".parse::<KeyCombo>().is_err());
}

#[test]
fn built_in_keys_drive_commands() {
    let mut editor = editor();

    let event = editor.on_key(&KeyCombo::new("b").with_mod());
    assert!(event.is_committed());
    editor.on_text_input("hi");
    assert!(editor.doc().resolve(3).unwrap().marks().contains(MarkKind::Bold));

    let event = editor.on_key(&KeyCombo::new("Enter"));
    assert_eq!(
        event,
        EditorEvent::Committed {
            version: 3,
            scroll_into_view: true,
        }
    );
    assert_eq!(block_texts(&editor), vec!["hi", ""]);

    assert_eq!(editor.on_key(&KeyCombo::new("q").with_mod()), EditorEvent::Ignored);
}

#[test]
fn config_keymap_layers_over_the_defaults() {
    let config = EditorConfig {
        keymap: BTreeMap::from([
            ("Mod-Shift-x".to_string(), "marks.toggle_strike".to_string()),
            ("Mod-b".to_string(), "marks.toggle_italic".to_string()),
            ("Nope-z".to_string(), "marks.toggle_bold".to_string()),
        ]),
        ..EditorConfig::default()
    };
    let mut editor = Editor::new(config).unwrap();
    assert_eq!(
        editor.keymap().lookup(&KeyCombo::new("x").with_mod().with_shift()),
        Some("marks.toggle_strike")
    );
    assert_eq!(
        editor.keymap().lookup(&KeyCombo::new("u").with_mod()),
        Some("marks.toggle_underline")
    );

    editor.on_key(&KeyCombo::new("b").with_mod());
    let state = editor.state();
    assert!(state.cursor_marks().contains(MarkKind::Italic));
    assert!(!state.cursor_marks().contains(MarkKind::Bold));
}

#[test]
fn config_defaults_fill_missing_fields() {
    let config = EditorConfig::from_json_str(r#"{ "max_image_width": 500 }"#).unwrap();
    assert_eq!(config.max_image_width, 500);
    assert_eq!(config.font_sizes, vec!["1", "2", "3", "4", "5"]);
    assert_eq!(config.default_font_size, "1");

    let editor = editor();
    assert_eq!(editor.config().max_image_width, 300);
}

#[test]
fn listeners_see_every_commit() {
    let mut editor = editor();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    editor.subscribe(move |state, version| {
        sink.borrow_mut().push((version, state.doc().text_content()));
    });

    editor.on_text_input("a");
    editor.on_selection_change(Selection::cursor(100));
    editor.on_text_input("b");

    assert_eq!(
        *seen.borrow(),
        vec![(1, "a".to_string()), (2, "ab".to_string())]
    );
}

#[test]
fn rejected_transactions_leave_the_editor_alone() {
    let mut editor = editor();
    editor.on_text_input("abc");

    let event = editor.on_selection_change(Selection::node(3));
    assert!(matches!(event, EditorEvent::Rejected(_)));
    assert_eq!(editor.version(), 1);
    assert_eq!(*editor.selection(), Selection::cursor(5));
}

#[test]
fn pasted_lines_become_blocks() {
    let mut editor = editor();
    let event = editor.on_paste(
        "text/plain",
        PastePayload::Text {
            text: "one\ntwo\nthree".to_string(),
        },
    );
    assert!(event.is_committed());
    assert_eq!(editor.version(), 1);
    assert_eq!(block_texts(&editor), vec!["one", "two", "three"]);

    editor.on_text_input("!");
    assert_eq!(block_texts(&editor), vec!["one", "two", "three!"]);
}

#[test]
fn pasted_image_is_clamped() {
    let mut editor = editor();
    editor.on_paste(
        "image/png",
        PastePayload::Image(ImageSource::new("data:image/png;base64,AAAA").size(900, 300)),
    );
    let rp = editor.doc().resolve(2).unwrap();
    let attrs = rp.node_after().unwrap().attrs().unwrap().clone();
    assert_eq!(attrs["width"], json!(300));
    assert_eq!(attrs["height"], json!(100));
}

#[test]
fn pasted_paragraph_goes_inline() {
    let mut editor = editor();
    editor.on_text_input("hello");
    editor.on_selection_change(Selection::cursor(4));

    let content = vec![Structure::from(
        StructElement::new("p")
            .child(Structure::text("X"))
            .child(StructElement::new("strong").child(Structure::text("Y"))),
    )];
    editor.on_paste("text/html", PastePayload::Structure { content });

    assert_eq!(block_texts(&editor), vec!["heXYllo"]);
    assert_eq!(*editor.selection(), Selection::cursor(6));
    assert!(editor.doc().resolve(6).unwrap().marks().contains(MarkKind::Bold));
}

#[test]
fn pasted_blocks_arrive_as_one_tile() {
    let mut editor = editor();
    editor.on_text_input("start");

    let content: Vec<Structure> = vec![
        StructElement::new("h1").child(Structure::text("Head")).into(),
        StructElement::new("p").child(Structure::text("body")).into(),
    ];
    editor.on_paste("text/html", PastePayload::Structure { content });

    assert_eq!(editor.doc().children().len(), 2);
    let kinds: Vec<NodeKind> = editor
        .doc()
        .children()
        .iter()
        .flat_map(|tile| tile.as_element().unwrap().children().to_vec())
        .map(|block| block.kind())
        .collect();
    assert_eq!(
        kinds,
        vec![NodeKind::Paragraph, NodeKind::Heading, NodeKind::Paragraph]
    );
    assert_eq!(block_texts(&editor), vec!["start", "Headbody"]);
    assert_eq!(*editor.selection(), Selection::cursor(21));
}

#[test]
fn paste_with_an_unexpected_payload_is_ignored() {
    let mut editor = editor();
    let event = editor.on_paste(
        "text/plain",
        PastePayload::Image(ImageSource::new("a.png")),
    );
    assert_eq!(event, EditorEvent::Ignored);
    assert_eq!(editor.version(), 0);
}

#[test]
fn queries_report_mark_state() {
    let mut editor = editor();
    editor.on_text_input("word");
    editor.on_selection_change(Selection::normalize(2, 6));
    editor.on_command("marks.toggle_underline", None).unwrap();

    let active: bool = editor
        .run_query("marks.is_active", Some(json!({ "mark": "underline" })))
        .unwrap();
    assert!(active);

    let state: MarkButtonState = editor
        .run_query("marks.button_state", Some(json!({ "mark": "fontSize" })))
        .unwrap();
    assert_eq!(
        state,
        MarkButtonState {
            active: false,
            disabled: false,
        }
    );

    let err = editor
        .run_query_json("marks.is_active", Some(json!({ "mark": "blink" })))
        .unwrap_err();
    assert!(err.to_string().starts_with("Invalid args:"));
    assert!(editor.run_query_json("marks.nothing", None).is_err());
}

#[test]
fn load_and_save_values() {
    let mut editor = editor();
    let value = DocValue::from_json_str(
        r#"{
            "content": [
                { "type": "element", "tag": "div", "attrs": { "class": "block_tile" }, "children": [
                    { "type": "element", "tag": "p", "children": [
                        { "type": "text", "text": "saved " },
                        { "type": "element", "tag": "em", "children": [{ "type": "text", "text": "text" }] }
                    ]}
                ]}
            ]
        }"#,
    )
    .unwrap();

    let event = editor.load_value(value.clone()).unwrap();
    assert!(event.is_committed());
    assert_eq!(editor.doc().text_content(), "saved text");
    assert_eq!(*editor.selection(), Selection::cursor(2));
    assert!(editor.doc().resolve(10).unwrap().marks().contains(MarkKind::Italic));

    assert_eq!(editor.to_value(), value);
}
