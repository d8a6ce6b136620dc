//! CommonMark host: maps pulldown-cmark events onto [`RenderEvent`]s.

use std::borrow::Cow;
use std::collections::VecDeque;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};

use crate::events::{Block, Format, RenderEvent, text_units};

pub fn default_md_options() -> Options {
    Options::ENABLE_FOOTNOTES
        | Options::ENABLE_TABLES
        | Options::ENABLE_GFM
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_DEFINITION_LIST
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
        | Options::ENABLE_MATH
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Content collected across several markdown events before it becomes a
/// single render event.
#[derive(Debug)]
enum Pending<'a> {
    Code {
        language: Option<Cow<'a, str>>,
        text: String,
    },
    Image {
        reference: Cow<'a, str>,
        alt: String,
    },
    Html(String),
    Metadata,
}

impl<'a> Pending<'a> {
    fn push(&mut self, s: &str) {
        match self {
            Pending::Code { text, .. } => text.push_str(s),
            Pending::Image { alt, .. } => alt.push_str(s),
            Pending::Html(html) => html.push_str(s),
            Pending::Metadata => {}
        }
    }

    fn finish(self) -> Option<RenderEvent<'a>> {
        match self {
            Pending::Code { language, mut text } => {
                if text.ends_with('\n') {
                    text.pop();
                }
                Some(RenderEvent::Verbatim {
                    text: Cow::Owned(text),
                    inline: false,
                    language,
                })
            }
            Pending::Image { reference, alt } => Some(RenderEvent::Image {
                reference,
                alt: Cow::Owned(alt),
            }),
            // a block is raw as a whole, never split per line
            Pending::Html(html) => Some(RenderEvent::RawText {
                text: Cow::Owned(html),
                syntax: Cow::Borrowed("html"),
            }),
            Pending::Metadata => None,
        }
    }
}

/// Render events for a markdown document, wrapped in
/// `Begin(Document)`/`End(Document)`.
pub struct MarkdownEvents<'a, I: Iterator<Item = Event<'a>>> {
    iter: I,
    queue: VecDeque<RenderEvent<'a>>,
    /// Open markdown tags; `None` for tags with no render block.
    blocks: Vec<Option<Block<'a>>>,
    pending: Option<Pending<'a>>,
    in_table_head: bool,
    started: bool,
    finished: bool,
}

impl<'a> MarkdownEvents<'a, Parser<'a>> {
    pub fn parse(source: &'a str) -> Self {
        Self::new(Parser::new_ext(source, default_md_options()))
    }
}

impl<'a, I: Iterator<Item = Event<'a>>> MarkdownEvents<'a, I> {
    pub fn new(iter: I) -> Self {
        Self {
            iter,
            queue: VecDeque::new(),
            blocks: Vec::new(),
            pending: None,
            in_table_head: false,
            started: false,
            finished: false,
        }
    }

    fn translate(&mut self, event: Event<'a>) {
        if self.pending.is_some() {
            self.translate_pending(event);
            return;
        }

        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => {
                // autolinks print their reference as the label already
                if matches!(
                    self.blocks.last(),
                    Some(Some(Block::Link {
                        freestanding: true,
                        ..
                    }))
                ) {
                    return;
                }
                self.push_text(text);
            }
            Event::Code(text) | Event::InlineMath(text) => {
                self.queue.push_back(RenderEvent::Verbatim {
                    text: cow(text),
                    inline: true,
                    language: None,
                });
            }
            Event::DisplayMath(text) => self.queue.push_back(RenderEvent::Verbatim {
                text: cow(text),
                inline: false,
                language: Some(Cow::Borrowed("math")),
            }),
            Event::Html(html) => {
                self.queue.push_back(RenderEvent::RawText {
                    text: cow(html),
                    syntax: Cow::Borrowed("html"),
                });
            }
            Event::InlineHtml(html) => self.queue.push_back(RenderEvent::InlineMarkup(cow(html))),
            Event::FootnoteReference(name) => {
                let link = Block::Link {
                    reference: Cow::Owned(format!("#{}", name)),
                    freestanding: false,
                };
                let sup = Block::Format(Format::Superscript);
                self.queue.push_back(RenderEvent::Begin(sup.clone()));
                self.queue.push_back(RenderEvent::Begin(link.clone()));
                self.push_text(name);
                self.queue.push_back(RenderEvent::End(link));
                self.queue.push_back(RenderEvent::End(sup));
            }
            Event::SoftBreak => self.queue.push_back(RenderEvent::Space(Cow::Borrowed("\n"))),
            Event::HardBreak => self.queue.push_back(RenderEvent::NewLine),
            Event::Rule => self.queue.push_back(RenderEvent::HorizontalLine),
            Event::TaskListMarker(checked) => {
                tracing::trace!(checked, "dropping task list marker");
            }
        }
    }

    fn translate_pending(&mut self, event: Event<'a>) {
        match event {
            Event::End(
                TagEnd::CodeBlock | TagEnd::Image | TagEnd::HtmlBlock | TagEnd::MetadataBlock(_),
            ) => {
                if let Some(event) = self.pending.take().and_then(Pending::finish) {
                    self.queue.push_back(event);
                }
            }
            Event::Text(text)
            | Event::Code(text)
            | Event::InlineMath(text)
            | Event::DisplayMath(text)
            | Event::Html(text)
            | Event::InlineHtml(text) => {
                if let Some(pending) = &mut self.pending {
                    pending.push(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(pending) = &mut self.pending {
                    pending.push(" ");
                }
            }
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'a>) {
        let block = match tag {
            Tag::Paragraph => Some(Block::Paragraph),
            Tag::Heading { level, id, .. } => Some(Block::Header {
                level: level as u8,
                id: id.map(cow),
            }),
            Tag::BlockQuote(_) => Some(Block::Quotation),
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(|lang| Cow::Owned(lang.to_string())),
                    CodeBlockKind::Indented => None,
                };
                self.pending = Some(Pending::Code {
                    language,
                    text: String::new(),
                });
                return;
            }
            Tag::HtmlBlock => {
                self.pending = Some(Pending::Html(String::new()));
                return;
            }
            Tag::List(start) => Some(Block::List {
                ordered: start.is_some(),
            }),
            Tag::Item => Some(Block::ListItem),
            Tag::FootnoteDefinition(name) => {
                self.queue.push_back(RenderEvent::Begin(Block::Group));
                self.queue.push_back(RenderEvent::Id(cow(name)));
                self.blocks.push(Some(Block::Group));
                return;
            }
            Tag::DefinitionList => Some(Block::DefinitionList),
            Tag::DefinitionListTitle => Some(Block::DefinitionTerm),
            Tag::DefinitionListDefinition => Some(Block::DefinitionDescription),
            Tag::Table(_) => Some(Block::Table),
            Tag::TableHead => {
                self.in_table_head = true;
                Some(Block::TableRow)
            }
            Tag::TableRow => Some(Block::TableRow),
            Tag::TableCell if self.in_table_head => Some(Block::TableHeadCell),
            Tag::TableCell => Some(Block::TableCell),
            Tag::Emphasis => Some(Block::Format(Format::Italic)),
            Tag::Strong => Some(Block::Format(Format::Bold)),
            Tag::Strikethrough => Some(Block::Format(Format::Strikeout)),
            Tag::Superscript => Some(Block::Format(Format::Superscript)),
            Tag::Subscript => Some(Block::Format(Format::Subscript)),
            Tag::Link {
                link_type,
                dest_url,
                ..
            } => Some(Block::Link {
                reference: cow(dest_url),
                freestanding: matches!(link_type, LinkType::Autolink | LinkType::Email),
            }),
            Tag::Image { dest_url, .. } => {
                self.pending = Some(Pending::Image {
                    reference: cow(dest_url),
                    alt: String::new(),
                });
                return;
            }
            Tag::MetadataBlock(_) => {
                self.pending = Some(Pending::Metadata);
                return;
            }
        };

        if let Some(block) = &block {
            self.queue.push_back(RenderEvent::Begin(block.clone()));
        }
        self.blocks.push(block);
    }

    fn end_tag(&mut self, tag: TagEnd) {
        if tag == TagEnd::TableHead {
            self.in_table_head = false;
        }
        match self.blocks.pop() {
            Some(Some(block)) => self.queue.push_back(RenderEvent::End(block)),
            Some(None) => {}
            None => tracing::warn!(?tag, "end tag with no open block"),
        }
    }

    fn push_text(&mut self, text: CowStr<'a>) {
        match text {
            CowStr::Borrowed(s) => self.queue.extend(text_units(s)),
            other => {
                for unit in text_units(&other) {
                    self.queue.push_back(unit.into_static());
                }
            }
        }
    }
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for MarkdownEvents<'a, I> {
    type Item = RenderEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            return Some(RenderEvent::Begin(Block::Document));
        }
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(event);
            }
            if self.finished {
                return None;
            }
            match self.iter.next() {
                Some(event) => self.translate(event),
                None => {
                    self.finished = true;
                    for block in self.blocks.drain(..).rev().flatten() {
                        self.queue.push_back(RenderEvent::End(block));
                    }
                    self.queue.push_back(RenderEvent::End(Block::Document));
                }
            }
        }
    }
}

fn cow<'a>(s: CowStr<'a>) -> Cow<'a, str> {
    match s {
        CowStr::Borrowed(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.into_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(source: &str) -> Vec<RenderEvent<'_>> {
        MarkdownEvents::parse(source).collect()
    }

    #[test]
    fn test_paragraph_words() {
        assert_eq!(
            events("Hello, world"),
            vec![
                RenderEvent::Begin(Block::Document),
                RenderEvent::Begin(Block::Paragraph),
                RenderEvent::word("Hello"),
                RenderEvent::SpecialSymbol(','),
                RenderEvent::space(),
                RenderEvent::word("world"),
                RenderEvent::End(Block::Paragraph),
                RenderEvent::End(Block::Document),
            ]
        );
    }

    #[test]
    fn test_fenced_code_is_block_verbatim() {
        let events = events("```rust\nfn main() {}\n```\n");
        assert_eq!(
            events[1],
            RenderEvent::Verbatim {
                text: Cow::Borrowed("fn main() {}"),
                inline: false,
                language: Some(Cow::Borrowed("rust")),
            }
        );
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_table_head_cells() {
        let events = events("| a | b |\n|---|---|\n| c | d |\n");
        let cells: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                RenderEvent::Begin(block @ (Block::TableCell | Block::TableHeadCell)) => {
                    Some(block.clone())
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            cells,
            vec![
                Block::TableHeadCell,
                Block::TableHeadCell,
                Block::TableCell,
                Block::TableCell
            ]
        );
    }

    #[test]
    fn test_autolink_is_freestanding() {
        let events = events("<https://example.com>");
        assert_eq!(
            events[2],
            RenderEvent::Begin(Block::Link {
                reference: Cow::Borrowed("https://example.com"),
                freestanding: true,
            })
        );
        // the label text is not repeated as words
        assert!(matches!(events[3], RenderEvent::End(Block::Link { .. })));
    }

    #[test]
    fn test_image_alt_is_collected() {
        let events = events("![a *cat*](cat.png)");
        assert_eq!(
            events[2],
            RenderEvent::Image {
                reference: Cow::Borrowed("cat.png"),
                alt: Cow::Borrowed("a cat"),
            }
        );
    }

    #[test]
    fn test_inline_html_is_markup_not_text() {
        let events = events("a <b>b</b>");
        assert_eq!(
            events[2..7],
            [
                RenderEvent::word("a"),
                RenderEvent::space(),
                RenderEvent::InlineMarkup(Cow::Borrowed("<b>")),
                RenderEvent::word("b"),
                RenderEvent::InlineMarkup(Cow::Borrowed("</b>")),
            ]
        );
    }

    #[test]
    fn test_html_block_is_one_raw_event() {
        let events = events("<div>\n<p>x</p>\n</div>\n");
        assert_eq!(
            events,
            vec![
                RenderEvent::Begin(Block::Document),
                RenderEvent::RawText {
                    text: Cow::Borrowed("<div>\n<p>x</p>\n</div>\n"),
                    syntax: Cow::Borrowed("html"),
                },
                RenderEvent::End(Block::Document),
            ]
        );
    }
}
