use serde_json::{Value, json};

use crate::schema::{
    AttrSpec, AttrType, Attrs, MarkAllowance, MarkKind, MarkParseRule, MarkSpec, NodeKind,
    NodeParseRule, NodeSpec, Schema,
};
use crate::structure::StructElement;

const DIMENSION: AttrType = AttrType::Int {
    min: 0,
    max: i64::MAX,
};

impl Schema {
    /// The tile document schema: a document of draggable block tiles holding
    /// paragraphs and headings with inline text, images and datetimes.
    pub fn tile() -> Self {
        Schema::builder()
            .register_node_type(NodeKind::Doc, NodeSpec::new("tile+"))
            .register_node_type(
                NodeKind::BlockTile,
                NodeSpec::new("block+")
                    .group("tile")
                    .draggable()
                    .to_structure(|_| StructElement::new("div").attr("class", "block_tile"))
                    .parse_rule(NodeParseRule {
                        tag: "div",
                        class: Some("block_tile"),
                        get_attrs: |_| Some(Attrs::new()),
                    }),
            )
            .register_node_type(
                NodeKind::Paragraph,
                NodeSpec::new("inline*")
                    .group("block")
                    .to_structure(|_| StructElement::new("p"))
                    .parse_rule(NodeParseRule {
                        tag: "p",
                        class: None,
                        get_attrs: |_| Some(Attrs::new()),
                    }),
            )
            .register_node_type(NodeKind::Heading, heading_spec())
            .register_node_type(NodeKind::Text, NodeSpec::new("").group("inline").inline())
            .register_node_type(
                NodeKind::Datetime,
                NodeSpec::new("")
                    .group("inline")
                    .inline()
                    .atom()
                    .attr(AttrSpec::with_default(
                        "timestamp",
                        AttrType::OptInt,
                        Value::Null,
                    ))
                    .to_structure(datetime_to_structure)
                    .parse_rule(NodeParseRule {
                        tag: "span",
                        class: Some("datetime"),
                        get_attrs: datetime_from_structure,
                    }),
            )
            .register_node_type(
                NodeKind::Image,
                NodeSpec::new("")
                    .group("inline")
                    .inline()
                    .atom()
                    .attr(AttrSpec::required("src", AttrType::Str))
                    .attr(AttrSpec::with_default("alt", AttrType::OptStr, Value::Null))
                    .attr(AttrSpec::with_default("title", AttrType::OptStr, Value::Null))
                    .attr(AttrSpec::with_default("width", DIMENSION, json!(200)))
                    .attr(AttrSpec::with_default("height", DIMENSION, json!(200)))
                    .to_structure(image_to_structure)
                    .parse_rule(NodeParseRule {
                        tag: "img",
                        class: None,
                        get_attrs: image_from_structure,
                    }),
            )
            .register_mark_type(
                MarkKind::Bold,
                MarkSpec::new(|_| StructElement::new("strong"))
                    .parse_rule(MarkParseRule::Tag {
                        tag: "strong",
                        get_attrs: |_| Some(Attrs::new()),
                    })
                    .parse_rule(MarkParseRule::Tag {
                        tag: "b",
                        get_attrs: |el| {
                            (el.style("font-weight").as_deref() != Some("normal")).then(Attrs::new)
                        },
                    })
                    .parse_rule(MarkParseRule::Style {
                        property: "font-weight",
                        get_attrs: |value| is_bold_weight(value).then(Attrs::new),
                    }),
            )
            .register_mark_type(
                MarkKind::Italic,
                MarkSpec::new(|_| StructElement::new("em"))
                    .parse_rule(MarkParseRule::Tag {
                        tag: "em",
                        get_attrs: |_| Some(Attrs::new()),
                    })
                    .parse_rule(MarkParseRule::Tag {
                        tag: "i",
                        get_attrs: |el| {
                            (el.style("font-style").as_deref() != Some("normal")).then(Attrs::new)
                        },
                    })
                    .parse_rule(MarkParseRule::Style {
                        property: "font-style",
                        get_attrs: |value| (value == "italic").then(Attrs::new),
                    }),
            )
            .register_mark_type(
                MarkKind::Strike,
                MarkSpec::new(|_| StructElement::new("s"))
                    .parse_rule(MarkParseRule::Tag {
                        tag: "s",
                        get_attrs: |_| Some(Attrs::new()),
                    })
                    .parse_rule(MarkParseRule::Tag {
                        tag: "del",
                        get_attrs: |el| {
                            (el.style("text-decoration").as_deref() != Some("line-through"))
                                .then(Attrs::new)
                        },
                    })
                    .parse_rule(MarkParseRule::Style {
                        property: "text-decoration",
                        get_attrs: |value| has_decoration(value, "line-through").then(Attrs::new),
                    }),
            )
            .register_mark_type(
                MarkKind::Underline,
                MarkSpec::new(|_| StructElement::new("u"))
                    .parse_rule(MarkParseRule::Tag {
                        tag: "u",
                        get_attrs: |_| Some(Attrs::new()),
                    })
                    .parse_rule(MarkParseRule::Style {
                        property: "text-decoration",
                        get_attrs: |value| has_decoration(value, "underline").then(Attrs::new),
                    }),
            )
            .register_mark_type(
                MarkKind::Link,
                MarkSpec::new(link_to_structure)
                    .attr(AttrSpec::with_default("href", AttrType::OptStr, Value::Null))
                    .attr(AttrSpec::with_default(
                        "ref",
                        AttrType::Str,
                        json!("noopener noreferrer nofollow"),
                    ))
                    .attr(AttrSpec::with_default("target", AttrType::Str, json!("_blank")))
                    .parse_rule(MarkParseRule::Tag {
                        tag: "a",
                        get_attrs: link_from_structure,
                    }),
            )
            .register_mark_type(
                MarkKind::FontSize,
                MarkSpec::new(|attrs| {
                    let size = attrs.get("size").and_then(Value::as_str).unwrap_or("1");
                    StructElement::new("span").attr("style", format!("font-size: {size}em"))
                })
                .attr(AttrSpec::with_default("size", AttrType::Str, json!("1")))
                .parse_rule(MarkParseRule::Tag {
                    tag: "span",
                    get_attrs: font_size_from_structure,
                }),
            )
            .build()
            .expect("tile schema must be valid")
    }
}

fn heading_spec() -> NodeSpec {
    let spec = NodeSpec::new("inline*")
        .group("block")
        .defining()
        .marks(MarkAllowance::None)
        .attr(AttrSpec::with_default(
            "level",
            AttrType::Int { min: 1, max: 6 },
            json!(1),
        ))
        .to_structure(|attrs| {
            let level = attrs.get("level").and_then(Value::as_i64).unwrap_or(1);
            StructElement::new(format!("h{level}"))
        });
    ["h1", "h2", "h3", "h4", "h5", "h6"]
        .into_iter()
        .fold(spec, |spec, tag| {
            spec.parse_rule(NodeParseRule {
                tag,
                class: None,
                get_attrs: heading_from_structure,
            })
        })
}

fn heading_from_structure(el: &StructElement) -> Option<Attrs> {
    let level: i64 = el.tag.get(1..)?.parse().ok()?;
    Some(Attrs::from([("level".to_string(), json!(level))]))
}

fn datetime_to_structure(attrs: &Attrs) -> StructElement {
    let el = StructElement::new("span").attr("class", "datetime");
    match attrs.get("timestamp").and_then(Value::as_i64) {
        Some(ts) => el.attr("data-timestamp", ts.to_string()),
        None => el,
    }
}

/// Timestamps are epoch milliseconds; anything that does not parse as a whole
/// number imports as `null`.
fn datetime_from_structure(el: &StructElement) -> Option<Attrs> {
    let timestamp = el
        .get_attr("data-timestamp")
        .and_then(parse_whole_number)
        .map(Value::from)
        .unwrap_or(Value::Null);
    Some(Attrs::from([("timestamp".to_string(), timestamp)]))
}

fn image_to_structure(attrs: &Attrs) -> StructElement {
    let mut el = StructElement::new("img");
    for name in ["src", "alt", "title"] {
        if let Some(value) = attrs.get(name).and_then(Value::as_str) {
            el = el.attr(name, value);
        }
    }
    for name in ["width", "height"] {
        if let Some(value) = attrs.get(name).and_then(Value::as_i64) {
            el = el.attr(name, value.to_string());
        }
    }
    el
}

fn image_from_structure(el: &StructElement) -> Option<Attrs> {
    let src = el.get_attr("src")?;
    let mut attrs = Attrs::from([("src".to_string(), json!(src))]);
    for name in ["alt", "title"] {
        if let Some(value) = el.get_attr(name) {
            attrs.insert(name.to_string(), json!(value));
        }
    }
    for name in ["width", "height"] {
        if let Some(value) = el.get_attr(name).and_then(parse_whole_number) {
            attrs.insert(name.to_string(), json!(value.max(0)));
        }
    }
    Some(attrs)
}

fn link_to_structure(attrs: &Attrs) -> StructElement {
    let mut el = StructElement::new("a");
    for (attr, name) in [("href", "href"), ("ref", "rel"), ("target", "target")] {
        if let Some(value) = attrs.get(attr).and_then(Value::as_str) {
            el = el.attr(name, value);
        }
    }
    el
}

/// An `<a>` without `href` is a link whose `href` is still unset.
fn link_from_structure(el: &StructElement) -> Option<Attrs> {
    let href = match el.get_attr("href") {
        Some(href) if href.to_ascii_lowercase().contains("javascript:") => return None,
        Some(href) => json!(href),
        None => Value::Null,
    };
    let mut attrs = Attrs::from([("href".to_string(), href)]);
    if let Some(rel) = el.get_attr("rel") {
        attrs.insert("ref".to_string(), json!(rel));
    }
    if let Some(target) = el.get_attr("target") {
        attrs.insert("target".to_string(), json!(target));
    }
    Some(attrs)
}

fn font_size_from_structure(el: &StructElement) -> Option<Attrs> {
    let size = el
        .style("font-size")
        .and_then(|value| value.strip_suffix("em").map(|n| n.trim().to_string()))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "1".to_string());
    Some(Attrs::from([("size".to_string(), json!(size))]))
}

fn is_bold_weight(value: &str) -> bool {
    match value {
        "bold" | "bolder" => true,
        _ => {
            let bytes = value.as_bytes();
            bytes.len() == 3
                && (b'5'..=b'9').contains(&bytes[0])
                && bytes[1..].iter().all(u8::is_ascii_digit)
        }
    }
}

fn has_decoration(value: &str, line: &str) -> bool {
    value.split_whitespace().any(|part| part == line)
}

fn parse_whole_number(input: &str) -> Option<i64> {
    let input = input.trim();
    if let Ok(n) = input.parse::<i64>() {
        return Some(n);
    }
    input
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|n| n.round() as i64)
}
