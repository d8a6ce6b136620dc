//! End-to-end rendering of markdown with annotations overlaid.

use marginalia_renderer::{
    Annotation, MarkdownEvents, OverlayConfig, PlainTextOffsets, RenderError, RenderEvent,
    render_markdown_with_annotations,
};

fn short_config() -> OverlayConfig {
    OverlayConfig::default()
        .with_marker_element("m")
        .with_id_attribute("id")
        .with_sequence_attribute("seq")
}

fn render(source: &str, ranges: &[(&str, std::ops::Range<usize>)]) -> String {
    let annotations = ranges
        .iter()
        .map(|(id, range)| (Annotation::new(*id), range.clone()));
    let (html, _) = render_markdown_with_annotations(source, annotations, short_config()).unwrap();
    html
}

/// Plain text a markdown source renders to, as seen by annotation offsets.
fn plain_text(source: &str) -> String {
    PlainTextOffsets::new(MarkdownEvents::parse(source))
        .filter_map(|(event, _)| match event {
            RenderEvent::Word(text) | RenderEvent::Space(text) => Some(text.into_owned()),
            RenderEvent::SpecialSymbol(c) => Some(c.to_string()),
            RenderEvent::Verbatim { text, .. } | RenderEvent::RawText { text, .. } => {
                Some(text.into_owned())
            }
            _ => None,
        })
        .collect()
}

#[test]
fn test_plain_text_offsets_skip_markup() {
    assert_eq!(
        plain_text("# Title\n\nSome *emphasis* and `code`."),
        "TitleSome emphasis and code."
    );
}

#[test]
fn test_annotation_across_emphasis() {
    let html = render("Some *emphasis* here", &[("A", 2..10)]);
    assert_eq!(
        html,
        concat!(
            r#"<p>So<m id="A" seq="0">me </m>"#,
            r#"<em><m id="A" seq="1">empha</m>sis</em> here</p>"#
        )
    );
}

#[test]
fn test_annotation_across_paragraphs() {
    let html = render("one two\n\nthree", &[("A", 4..10)]);
    assert_eq!(
        html,
        concat!(
            r#"<p>one <m id="A" seq="0">two</m></p>"#,
            r#"<p><m id="A" seq="1">thr</m>ee</p>"#
        )
    );
}

#[test]
fn test_crossing_annotations_in_list() {
    let html = render("- Hello World", &[("A", 0..7), ("B", 4..11)]);
    assert_eq!(
        html,
        concat!(
            r#"<ul><li><m id="A" seq="0">Hell<m id="B" seq="1">o W</m></m>"#,
            r#"<m id="B" seq="2">orld</m></li></ul>"#
        )
    );
}

#[test]
fn test_autolink_label_is_not_annotatable() {
    let html = render("see <http://x> now", &[("Y", 0..8)]);
    assert_eq!(
        html,
        concat!(
            r#"<p><m id="Y" seq="0">see </m>"#,
            r#"<a href="http://x">http://x</a>"#,
            r#"<m id="Y" seq="1"> now</m></p>"#
        )
    );
}

#[test]
fn test_inline_html_tags_stay_outside_markers() {
    assert_eq!(plain_text("a <b>b</b> c"), "a b c");
    let html = render("a <b>b</b> c", &[("X", 0..5)]);
    assert_eq!(
        html,
        concat!(
            r#"<p><m id="X" seq="0">a </m>"#,
            r#"<b><m id="X" seq="1">b</m></b>"#,
            r#"<m id="X" seq="2"> c</m></p>"#
        )
    );
}

#[test]
fn test_html_block_is_wrapped_whole() {
    let html = render("<div>\nx\n</div>\n\nafter", &[("X", 2..18)]);
    assert_eq!(
        html,
        concat!(
            r#"<m id="X" seq="0"><div>"#,
            "\nx\n</div>\n",
            r#"</m><p><m id="X" seq="1">aft</m>er</p>"#
        )
    );
}

#[test]
fn test_code_block_and_escaping() {
    let html = render("```\na < b\n```", &[("A", 0..1)]);
    assert_eq!(html, r#"<pre><m id="A" seq="0">a</m> &lt; b</pre>"#);
}

#[test]
fn test_inverted_range_is_an_error() {
    let err = render_markdown_with_annotations(
        "text",
        [(Annotation::new("x"), 3..1)],
        OverlayConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RenderError::EventMap(_)));
    assert_eq!(err.to_string(), "annotation x has an inverted range 3..1");
}
