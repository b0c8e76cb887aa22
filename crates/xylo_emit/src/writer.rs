use std::io::{self, Write};

// -----------------------------------------------------------------------------
// MarkupWriter

/// A thin markup-aware layer over an output sink.
///
/// Text and attribute values pass through [`escaped`](MarkupWriter::escaped);
/// engine-generated delimiters are written verbatim through
/// [`raw`](MarkupWriter::raw), intentionally bypassing escaping. In compact
/// mode the indentation and line-break methods are no-ops, so callers never
/// branch on prettiness themselves.
pub struct MarkupWriter<'w, W: Write> {
    sink: &'w mut W,
    pretty: bool,
}

const INDENT_UNIT: &str = "  ";

impl<'w, W: Write> MarkupWriter<'w, W> {
    /// Wraps `sink`; `pretty` enables indentation and line breaks.
    pub fn new(sink: &'w mut W, pretty: bool) -> Self {
        Self { sink, pretty }
    }

    /// Writes `text` verbatim.
    #[inline]
    pub fn raw(&mut self, text: &str) -> io::Result<()> {
        self.sink.write_all(text.as_bytes())
    }

    /// Writes `text` with markup-significant characters entity-escaped.
    pub fn escaped(&mut self, text: &str) -> io::Result<()> {
        let mut rest = text;
        while let Some(at) = rest.find(['&', '<', '>', '"']) {
            let (plain, tail) = rest.split_at(at);
            self.raw(plain)?;
            let mut chars = tail.chars();
            let entity = match chars.next() {
                Some('&') => "&amp;",
                Some('<') => "&lt;",
                Some('>') => "&gt;",
                Some('"') => "&quot;",
                _ => unreachable!("find returned one of the escaped characters"),
            };
            self.raw(entity)?;
            rest = chars.as_str();
        }
        self.raw(rest)
    }

    /// Writes one ` name="value"` pair, escaping the value.
    ///
    /// Attribute names are engine- or caller-supplied identifiers and are
    /// written unescaped.
    pub fn attribute(&mut self, name: &str, value: &str) -> io::Result<()> {
        self.raw(" ")?;
        self.raw(name)?;
        self.raw("=\"")?;
        self.escaped(value)?;
        self.raw("\"")
    }

    /// Writes the document declaration line.
    pub fn declaration(&mut self) -> io::Result<()> {
        self.raw("<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        self.line_break()
    }

    /// Writes `depth` indentation units, or nothing in compact mode.
    pub fn indent(&mut self, depth: usize) -> io::Result<()> {
        if self.pretty {
            for _ in 0..depth {
                self.raw(INDENT_UNIT)?;
            }
        }
        Ok(())
    }

    /// Writes a line break, or nothing in compact mode.
    pub fn line_break(&mut self) -> io::Result<()> {
        if self.pretty {
            self.raw("\n")?;
        }
        Ok(())
    }

    /// Closes the element `tag` at `depth`.
    ///
    /// An element whose opening tag was never terminated self-closes with
    /// `/>`; one that emitted child elements gets an indented closing tag;
    /// one that only emitted inline text closes immediately after it.
    pub fn close_tag(
        &mut self,
        tag: &str,
        depth: usize,
        opened: bool,
        wrote_child: bool,
    ) -> io::Result<()> {
        if !opened {
            self.raw("/>")?;
        } else {
            if wrote_child {
                self.indent(depth)?;
            }
            self.raw("</")?;
            self.raw(tag)?;
            self.raw(">")?;
        }
        self.line_break()
    }

    /// Flushes the underlying sink.
    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(f: impl FnOnce(&mut MarkupWriter<'_, Vec<u8>>)) -> String {
        let mut buf = Vec::new();
        let mut writer = MarkupWriter::new(&mut buf, false);
        f(&mut writer);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn escapes_markup_characters() {
        let out = collect(|w| w.escaped("a < b & \"c\" > d").unwrap());
        assert_eq!(out, "a &lt; b &amp; &quot;c&quot; &gt; d");
    }

    #[test]
    fn plain_text_passes_through() {
        let out = collect(|w| w.escaped("plain text").unwrap());
        assert_eq!(out, "plain text");
    }

    #[test]
    fn attribute_escapes_value_only() {
        let out = collect(|w| w.attribute("title", "\"quoted\"").unwrap());
        assert_eq!(out, " title=\"&quot;quoted&quot;\"");
    }

    #[test]
    fn close_forms() {
        assert_eq!(collect(|w| w.close_tag("a", 0, false, false).unwrap()), "/>");
        assert_eq!(
            collect(|w| w.close_tag("a", 0, true, false).unwrap()),
            "</a>"
        );
        assert_eq!(
            collect(|w| w.close_tag("a", 0, true, true).unwrap()),
            "</a>"
        );
    }
}
