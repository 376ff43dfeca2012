// Group head/tail wrapping and failure isolation across a run

use cadmus_export::renderers::{CommentRenderer, PlainTextRenderer};
use cadmus_export::{
    ComposeError, Composer, ComposerSettings, Fragment, Item, LayerPart, Part, PartHeader, RendererRegistry,
    TemplateError, TextPart, WrapTemplates,
};

fn plain_registry() -> RendererRegistry {
    RendererRegistry::new().with("text", None, PlainTextRenderer).with("layer", None, CommentRenderer)
}

fn item(id: &str, group: Option<&str>, text: &str) -> Item {
    let mut item = Item::new(id, id).with_part(Part::Text(TextPart::from_text(PartHeader::new(format!("{}-t", id), "text"), text)));
    item.group_id = group.map(str::to_string);
    item
}

fn wrapped() -> ComposerSettings {
    ComposerSettings::builder()
        .head("<g n=\"{{group_id}}\" o=\"{{group_ordinal}}\">")
        .tail("</g>")
        .build()
}

#[test]
fn test_group_sequence_abba() {
    let mut composer = Composer::new(plain_registry(), wrapped());
    composer.open();
    composer.compose(&item("1", Some("A"), "one")).unwrap();
    composer.compose(&item("2", Some("B"), "two")).unwrap();
    composer.compose(&item("3", Some("B"), "three")).unwrap();
    composer.compose(&item("4", Some("A"), "four")).unwrap();

    // Last tail only appears on close
    assert_eq!(
        composer.flows()["text"],
        "<g n=\"A\" o=\"1\">one</g><g n=\"B\" o=\"2\">twothree</g><g n=\"A\" o=\"3\">four"
    );
    composer.close().unwrap();
    assert!(composer.flows()["text"].ends_with("four</g>"));
    assert_eq!(composer.flows()["text"].matches("<g ").count(), 3);
    assert_eq!(composer.flows()["text"].matches("</g>").count(), 3);
}

#[test]
fn test_tail_filled_with_outgoing_item() {
    let settings = ComposerSettings::builder()
        .head("<g first=\"{{item_id}}\">")
        .tail("<!--last {{item_id}}--></g>")
        .build();
    let mut composer = Composer::new(plain_registry(), settings);
    composer.open();
    composer.compose(&item("1", Some("A"), "a")).unwrap();
    composer.compose(&item("2", Some("A"), "b")).unwrap();
    composer.compose(&item("3", Some("B"), "c")).unwrap();
    composer.close().unwrap();

    assert_eq!(
        composer.flows()["text"],
        "<g first=\"1\">ab<!--last 2--></g><g first=\"3\">c<!--last 3--></g>"
    );
}

#[test]
fn test_flow_specific_templates() {
    let settings = ComposerSettings::builder()
        .head("<doc>")
        .tail("</doc>")
        .flow_templates("notes", WrapTemplates::new(Some("<notes>"), Some("</notes>")))
        .flow_name("layer", "notes")
        .build();
    let it = item("1", Some("A"), "arma virumque")
        .with_part(Part::Layer(LayerPart::new(PartHeader::new("c", "layer")).with_fragment(Fragment::comment("1.2", "x"))));

    let mut composer = Composer::new(plain_registry(), settings);
    composer.open();
    composer.compose(&it).unwrap();
    composer.close().unwrap();

    assert_eq!(composer.flows()["text"], "<doc>arma virumque</doc>");
    assert_eq!(composer.flows()["notes"], "<notes><note target=\"#f0-c\">x</note></notes>");
}

#[test]
fn test_constant_grouper_wraps_everything() {
    let mut composer =
        Composer::new(plain_registry(), ComposerSettings::builder().head("<all>").tail("</all>").build())
            .with_grouper(|_: &Item| Some("all".to_string()));
    composer.open();
    composer.compose(&item("1", None, "a")).unwrap();
    composer.compose(&item("2", Some("X"), "b")).unwrap();
    composer.close().unwrap();
    assert_eq!(composer.flows()["text"], "<all>ab</all>");
}

#[test]
fn test_overlap_leaves_previous_flows_untouched() {
    let mut composer = Composer::new(plain_registry(), wrapped());
    composer.open();
    composer.compose(&item("1", Some("A"), "alpha beta gamma")).unwrap();
    let before = composer.flows().clone();
    let group_before = composer.context().group().clone();

    let bad = item("2", Some("B"), "delta epsilon zeta")
        .with_part(Part::Layer(LayerPart::new(PartHeader::new("l1", "layer")).with_fragment(Fragment::comment("1.1-1.2", "x"))))
        .with_part(Part::Layer(LayerPart::new(PartHeader::new("l2", "layer")).with_fragment(Fragment::comment("1.2-1.3", "y"))));
    match composer.compose(&bad) {
        Err(ComposeError::MalformedSpan { item_id, part_id, .. }) => {
            assert_eq!(item_id, "2");
            assert_eq!(part_id, "l2");
        }
        other => panic!("expected MalformedSpan, got {:?}", other),
    }
    assert_eq!(composer.flows(), &before);
    assert_eq!(composer.context().group(), &group_before);

    // The run goes on as if the bad item never came
    composer.compose(&item("3", Some("A"), "eta")).unwrap();
    composer.close().unwrap();
    assert_eq!(composer.flows()["text"], "<g n=\"A\" o=\"1\">alpha beta gammaeta</g>");
}

#[test]
fn test_unknown_coordinate_is_reported() {
    let bad = item("1", None, "one line")
        .with_part(Part::Layer(LayerPart::new(PartHeader::new("l1", "layer")).with_fragment(Fragment::comment("3.1", "x"))));
    let mut composer = Composer::new(plain_registry(), ComposerSettings::default());
    composer.open();
    assert!(matches!(
        composer.compose(&bad),
        Err(ComposeError::UnknownCoordinate { ref part_id, .. }) if part_id == "l1"
    ));
}

#[test]
fn test_close_reports_unresolved_tail() {
    let settings = ComposerSettings::builder().tail("</g n=\"{{nope}}\">").build();
    let mut composer = Composer::new(plain_registry(), settings);
    composer.open();
    composer.compose(&item("1", Some("A"), "a")).unwrap();

    match composer.close() {
        Err(ComposeError::TemplateFill { item_id, flow, source }) => {
            assert_eq!(item_id, None);
            assert_eq!(flow, "text");
            assert_eq!(source, TemplateError::Unresolved("nope".to_string()));
        }
        other => panic!("expected TemplateFill, got {:?}", other),
    }
    assert!(composer.is_open());
    assert_eq!(composer.flows()["text"], "a");
}

#[test]
fn test_layer_without_text_is_out_of_range() {
    let orphan = Item::new("1", "1")
        .with_part(Part::Layer(LayerPart::new(PartHeader::new("l1", "layer")).with_fragment(Fragment::comment("9.9", "dangling"))));
    let mut composer = Composer::new(plain_registry(), ComposerSettings::default());
    composer.open();

    match composer.compose(&orphan) {
        Err(ComposeError::UnknownCoordinate { item_id, part_id, .. }) => {
            assert_eq!(item_id, "1");
            assert_eq!(part_id, "l1");
        }
        other => panic!("expected UnknownCoordinate, got {:?}", other),
    }
    assert!(composer.flows().is_empty());
}
