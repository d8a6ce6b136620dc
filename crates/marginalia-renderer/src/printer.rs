//! Literal markup output.

use pulldown_cmark_escape::{StrWrite, escape_html, escape_html_body_text};

/// Primitive markup operations. Everything the overlay writes goes
/// through one of these.
pub trait MarkupPrinter {
    type Error;

    fn open_element(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), Self::Error>;
    fn close_element(&mut self, name: &str) -> Result<(), Self::Error>;
    /// A self-closing element such as `<br/>`.
    fn empty_element(&mut self, name: &str, attributes: &[(&str, &str)])
    -> Result<(), Self::Error>;
    fn write_escaped_text(&mut self, text: &str) -> Result<(), Self::Error>;
    /// Unescaped passthrough for raw markup.
    fn write_raw(&mut self, markup: &str) -> Result<(), Self::Error>;
}

impl<P> MarkupPrinter for &'_ mut P
where
    P: MarkupPrinter + ?Sized,
{
    type Error = P::Error;

    #[inline]
    fn open_element(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), Self::Error> {
        (**self).open_element(name, attributes)
    }

    #[inline]
    fn close_element(&mut self, name: &str) -> Result<(), Self::Error> {
        (**self).close_element(name)
    }

    #[inline]
    fn empty_element(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
    ) -> Result<(), Self::Error> {
        (**self).empty_element(name, attributes)
    }

    #[inline]
    fn write_escaped_text(&mut self, text: &str) -> Result<(), Self::Error> {
        (**self).write_escaped_text(text)
    }

    #[inline]
    fn write_raw(&mut self, markup: &str) -> Result<(), Self::Error> {
        (**self).write_raw(markup)
    }
}

/// XHTML printer over any [`StrWrite`] sink.
#[derive(Debug, Default)]
pub struct HtmlPrinter<W> {
    writer: W,
}

impl<W: StrWrite> HtmlPrinter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    fn write_start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), W::Error> {
        self.writer.write_str("<")?;
        self.writer.write_str(name)?;
        for (attr, value) in attributes {
            self.writer.write_str(" ")?;
            self.writer.write_str(attr)?;
            self.writer.write_str("=\"")?;
            escape_html(&mut self.writer, value)?;
            self.writer.write_str("\"")?;
        }
        Ok(())
    }
}

impl<W: StrWrite> MarkupPrinter for HtmlPrinter<W> {
    type Error = W::Error;

    fn open_element(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), W::Error> {
        self.write_start(name, attributes)?;
        self.writer.write_str(">")
    }

    fn close_element(&mut self, name: &str) -> Result<(), W::Error> {
        self.writer.write_str("</")?;
        self.writer.write_str(name)?;
        self.writer.write_str(">")
    }

    fn empty_element(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), W::Error> {
        self.write_start(name, attributes)?;
        self.writer.write_str("/>")
    }

    fn write_escaped_text(&mut self, text: &str) -> Result<(), W::Error> {
        escape_html_body_text(&mut self.writer, text)
    }

    fn write_raw(&mut self, markup: &str) -> Result<(), W::Error> {
        self.writer.write_str(markup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_are_escaped() {
        let mut printer = HtmlPrinter::new(String::new());
        printer
            .open_element("a", &[("href", "https://x.y/?a=1&b=\"2\"")])
            .unwrap();
        printer.write_escaped_text("1 < 2 & 3").unwrap();
        printer.close_element("a").unwrap();
        printer.empty_element("br", &[]).unwrap();

        assert_eq!(
            printer.into_inner(),
            "<a href=\"https://x.y/?a=1&amp;b=&quot;2&quot;\">1 &lt; 2 &amp; 3</a><br/>"
        );
    }

    #[test]
    fn test_raw_is_passed_through() {
        let mut out = String::new();
        let mut printer = HtmlPrinter::new(&mut out);
        printer.write_raw("<b>raw</b>").unwrap();
        assert_eq!(out, "<b>raw</b>");
    }
}
