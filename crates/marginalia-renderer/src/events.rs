//! The host renderer's event catalogue.
//!
//! Structural events come in balanced `Begin`/`End` pairs; text-bearing
//! events only ever occur between them.

use std::borrow::Cow;

/// Inline formatting kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Bold,
    Italic,
    Underline,
    Strikeout,
    Superscript,
    Subscript,
    Monospace,
}

impl Format {
    pub fn element(self) -> &'static str {
        match self {
            Format::Bold => "strong",
            Format::Italic => "em",
            Format::Underline => "ins",
            Format::Strikeout => "del",
            Format::Superscript => "sup",
            Format::Subscript => "sub",
            Format::Monospace => "tt",
        }
    }
}

/// A structural construct of the host document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block<'a> {
    Document,
    Paragraph,
    Header {
        level: u8,
        id: Option<Cow<'a, str>>,
    },
    List {
        ordered: bool,
    },
    ListItem,
    Table,
    TableRow,
    TableCell,
    TableHeadCell,
    /// A link. Free-standing links have no label events; the reference
    /// itself is printed as the label.
    Link {
        reference: Cow<'a, str>,
        freestanding: bool,
    },
    DefinitionList,
    DefinitionTerm,
    DefinitionDescription,
    Quotation,
    QuotationLine,
    Group,
    Section,
    Format(Format),
}

impl<'a> Block<'a> {
    pub fn event_type(&self) -> EventType {
        match self {
            Block::Document => EventType::Document,
            Block::Paragraph => EventType::Paragraph,
            Block::Header { .. } => EventType::Header,
            Block::List { .. } => EventType::List,
            Block::ListItem => EventType::ListItem,
            Block::Table => EventType::Table,
            Block::TableRow => EventType::TableRow,
            Block::TableCell => EventType::TableCell,
            Block::TableHeadCell => EventType::TableHeadCell,
            Block::Link { .. } => EventType::Link,
            Block::DefinitionList => EventType::DefinitionList,
            Block::DefinitionTerm => EventType::DefinitionTerm,
            Block::DefinitionDescription => EventType::DefinitionDescription,
            Block::Quotation => EventType::Quotation,
            Block::QuotationLine => EventType::QuotationLine,
            Block::Group => EventType::Group,
            Block::Section => EventType::Section,
            Block::Format(_) => EventType::Format,
        }
    }

    pub fn into_static(self) -> Block<'static> {
        match self {
            Block::Header { level, id } => Block::Header {
                level,
                id: id.map(|id| Cow::Owned(id.into_owned())),
            },
            Block::Link {
                reference,
                freestanding,
            } => Block::Link {
                reference: Cow::Owned(reference.into_owned()),
                freestanding,
            },
            Block::Document => Block::Document,
            Block::Paragraph => Block::Paragraph,
            Block::List { ordered } => Block::List { ordered },
            Block::ListItem => Block::ListItem,
            Block::Table => Block::Table,
            Block::TableRow => Block::TableRow,
            Block::TableCell => Block::TableCell,
            Block::TableHeadCell => Block::TableHeadCell,
            Block::DefinitionList => Block::DefinitionList,
            Block::DefinitionTerm => Block::DefinitionTerm,
            Block::DefinitionDescription => Block::DefinitionDescription,
            Block::Quotation => Block::Quotation,
            Block::QuotationLine => Block::QuotationLine,
            Block::Group => Block::Group,
            Block::Section => Block::Section,
            Block::Format(format) => Block::Format(format),
        }
    }
}

/// One call of the host render event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent<'a> {
    Begin(Block<'a>),
    End(Block<'a>),
    Word(Cow<'a, str>),
    /// A run of whitespace.
    Space(Cow<'a, str>),
    SpecialSymbol(char),
    Verbatim {
        text: Cow<'a, str>,
        inline: bool,
        language: Option<Cow<'a, str>>,
    },
    /// Markup in a foreign syntax, passed through unescaped.
    RawText {
        text: Cow<'a, str>,
        syntax: Cow<'a, str>,
    },
    /// A fragment of foreign markup inside running text, such as a lone
    /// `<b>` tag. Not document text: it takes no plain-text offsets and is
    /// written through unescaped like a structural event.
    InlineMarkup(Cow<'a, str>),
    NewLine,
    HorizontalLine,
    EmptyLines(usize),
    Image {
        reference: Cow<'a, str>,
        alt: Cow<'a, str>,
    },
    Id(Cow<'a, str>),
}

impl<'a> RenderEvent<'a> {
    pub fn word(text: impl Into<Cow<'a, str>>) -> Self {
        RenderEvent::Word(text.into())
    }

    pub fn space() -> Self {
        RenderEvent::Space(Cow::Borrowed(" "))
    }

    pub fn event_type(&self) -> EventType {
        match self {
            RenderEvent::Begin(block) | RenderEvent::End(block) => block.event_type(),
            RenderEvent::Word(_) => EventType::Word,
            RenderEvent::Space(_) => EventType::Space,
            RenderEvent::SpecialSymbol(_) => EventType::SpecialSymbol,
            RenderEvent::Verbatim { .. } => EventType::Verbatim,
            RenderEvent::RawText { .. } => EventType::RawText,
            RenderEvent::InlineMarkup(_) => EventType::InlineMarkup,
            RenderEvent::NewLine => EventType::NewLine,
            RenderEvent::HorizontalLine => EventType::HorizontalLine,
            RenderEvent::EmptyLines(_) => EventType::EmptyLines,
            RenderEvent::Image { .. } => EventType::Image,
            RenderEvent::Id(_) => EventType::Id,
        }
    }

    /// Whether this event carries literal content that annotations can cover.
    pub fn is_text_bearing(&self) -> bool {
        matches!(
            self,
            RenderEvent::Word(_)
                | RenderEvent::Space(_)
                | RenderEvent::SpecialSymbol(_)
                | RenderEvent::Verbatim { .. }
                | RenderEvent::RawText { .. }
        )
    }

    /// Length of the event's literal content in plain-text offsets (chars).
    pub fn text_len(&self) -> usize {
        match self {
            RenderEvent::Word(text)
            | RenderEvent::Space(text)
            | RenderEvent::Verbatim { text, .. }
            | RenderEvent::RawText { text, .. } => text.chars().count(),
            RenderEvent::SpecialSymbol(_) => 1,
            _ => 0,
        }
    }

    pub fn into_static(self) -> RenderEvent<'static> {
        fn owned(s: Cow<'_, str>) -> Cow<'static, str> {
            Cow::Owned(s.into_owned())
        }
        match self {
            RenderEvent::Begin(block) => RenderEvent::Begin(block.into_static()),
            RenderEvent::End(block) => RenderEvent::End(block.into_static()),
            RenderEvent::Word(text) => RenderEvent::Word(owned(text)),
            RenderEvent::Space(text) => RenderEvent::Space(owned(text)),
            RenderEvent::SpecialSymbol(c) => RenderEvent::SpecialSymbol(c),
            RenderEvent::Verbatim {
                text,
                inline,
                language,
            } => RenderEvent::Verbatim {
                text: owned(text),
                inline,
                language: language.map(owned),
            },
            RenderEvent::RawText { text, syntax } => RenderEvent::RawText {
                text: owned(text),
                syntax: owned(syntax),
            },
            RenderEvent::InlineMarkup(markup) => RenderEvent::InlineMarkup(owned(markup)),
            RenderEvent::NewLine => RenderEvent::NewLine,
            RenderEvent::HorizontalLine => RenderEvent::HorizontalLine,
            RenderEvent::EmptyLines(count) => RenderEvent::EmptyLines(count),
            RenderEvent::Image { reference, alt } => RenderEvent::Image {
                reference: owned(reference),
                alt: owned(alt),
            },
            RenderEvent::Id(name) => RenderEvent::Id(owned(name)),
        }
    }
}

/// Logical event types, used to key per-type counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    Document,
    Paragraph,
    Header,
    List,
    ListItem,
    Table,
    TableRow,
    TableCell,
    TableHeadCell,
    Link,
    DefinitionList,
    DefinitionTerm,
    DefinitionDescription,
    Quotation,
    QuotationLine,
    Group,
    Section,
    Format,
    Word,
    Space,
    SpecialSymbol,
    Verbatim,
    RawText,
    InlineMarkup,
    NewLine,
    HorizontalLine,
    EmptyLines,
    Image,
    Id,
    AnnotationMarker,
}

/// Split plain text into words, whitespace runs and single symbols.
pub fn text_units(text: &str) -> TextUnits<'_> {
    TextUnits { rest: text }
}

#[derive(Debug, Clone)]
pub struct TextUnits<'a> {
    rest: &'a str,
}

impl<'a> Iterator for TextUnits<'a> {
    type Item = RenderEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest;
        let first = rest.chars().next()?;

        let run_end = |pred: fn(char) -> bool| {
            rest.char_indices()
                .find(|(_, c)| !pred(*c))
                .map(|(i, _)| i)
                .unwrap_or(rest.len())
        };

        let (event, len) = if first.is_whitespace() {
            let len = run_end(char::is_whitespace);
            (RenderEvent::Space(Cow::Borrowed(&rest[..len])), len)
        } else if first.is_alphanumeric() {
            let len = run_end(char::is_alphanumeric);
            (RenderEvent::Word(Cow::Borrowed(&rest[..len])), len)
        } else {
            (RenderEvent::SpecialSymbol(first), first.len_utf8())
        };

        self.rest = &rest[len..];
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_units_split() {
        let units: Vec<_> = text_units("Hello,  wörld!").collect();
        assert_eq!(
            units,
            vec![
                RenderEvent::word("Hello"),
                RenderEvent::SpecialSymbol(','),
                RenderEvent::Space(Cow::Borrowed("  ")),
                RenderEvent::word("wörld"),
                RenderEvent::SpecialSymbol('!'),
            ]
        );
    }

    #[test]
    fn test_text_len_counts_chars() {
        assert_eq!(RenderEvent::word("wörld").text_len(), 5);
        assert_eq!(RenderEvent::SpecialSymbol('→').text_len(), 1);
        assert_eq!(RenderEvent::Begin(Block::Paragraph).text_len(), 0);
        assert!(!RenderEvent::NewLine.is_text_bearing());
        assert_eq!(RenderEvent::InlineMarkup(Cow::Borrowed("<b>")).text_len(), 0);
    }

    #[test]
    fn test_into_static_keeps_content() {
        let reference = String::from("https://example.com");
        let event = RenderEvent::Begin(Block::Link {
            reference: Cow::Borrowed(&reference),
            freestanding: true,
        });
        let owned: RenderEvent<'static> = event.clone().into_static();
        assert_eq!(owned, event);
    }
}
