use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{BufWriter, Write};

use crate::domain::errors::{ModuleError, ResultExt};

const INDENT_SIZE: usize = 2;

/// Streaming XML writer used for table data and table schemas.
///
/// Text handed to `text_element` must already be escaped; attribute values
/// are escaped here. With `pretty` every tag starts on its own line,
/// indented by nesting depth, while text content is never touched.
pub struct XmlWriter<W: Write> {
    writer: Writer<BufWriter<W>>,
    pretty: bool,
    path: String,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(inner: W, pretty: bool, path: impl Into<String>) -> Self {
        let out = BufWriter::new(inner);
        let writer = if pretty {
            Writer::new_with_indent(out, b' ', INDENT_SIZE)
        } else {
            Writer::new(out)
        };
        Self {
            writer,
            pretty,
            path: path.into(),
        }
    }

    pub fn declaration(&mut self, standalone: Option<&str>) -> Result<(), ModuleError> {
        self.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), standalone)))
    }

    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), ModuleError> {
        let tag = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.emit(Event::Start(tag))
    }

    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), ModuleError> {
        let tag = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.emit(Event::Empty(tag))
    }

    /// `<name>escaped</name>` on a single line
    pub fn text_element(&mut self, name: &str, escaped: &str) -> Result<(), ModuleError> {
        self.emit(Event::Start(BytesStart::new(name)))?;
        self.emit(Event::Text(BytesText::from_escaped(escaped)))?;
        self.emit(Event::End(BytesEnd::new(name)))
    }

    pub fn end(&mut self, name: &str) -> Result<(), ModuleError> {
        self.emit(Event::End(BytesEnd::new(name)))
    }

    /// Flush buffered output and hand back the underlying stream
    pub fn finish(self) -> Result<W, ModuleError> {
        let Self {
            writer,
            pretty,
            path,
        } = self;
        let mut out = writer.into_inner();
        if pretty {
            out.write_all(b"\n").with_path(&path)?;
        }
        let mut inner = out
            .into_inner()
            .map_err(|e| ModuleError::io(path.clone(), e.into_error()))?;
        inner.flush().with_path(&path)?;
        Ok(inner)
    }

    fn emit(&mut self, event: Event<'_>) -> Result<(), ModuleError> {
        let path = &self.path;
        self.writer
            .write_event(event)
            .map_err(|e| ModuleError::with_cause(format!("Could not write XML to {}", path), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(pretty: bool) -> String {
        let mut writer = XmlWriter::new(Vec::new(), pretty, "t.xml");
        writer.declaration(None).unwrap();
        writer.start("table", &[("xmlns", "urn:a&b")]).unwrap();
        writer.start("row", &[]).unwrap();
        writer.text_element("c1", "x &amp; y").unwrap();
        writer.empty("c2", &[("file", "record1.bin")]).unwrap();
        writer.end("row").unwrap();
        writer.end("table").unwrap();
        String::from_utf8(writer.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_compact_output() {
        assert_eq!(
            render(false),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><table xmlns=\"urn:a&amp;b\"><row>\
             <c1>x &amp; y</c1><c2 file=\"record1.bin\"/></row></table>"
        );
    }

    #[test]
    fn test_standalone_declaration_and_empty_text() {
        let mut writer = XmlWriter::new(Vec::new(), false, "s.xsd");
        writer.declaration(Some("yes")).unwrap();
        writer.text_element("c1", "").unwrap();
        let xml = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?><c1></c1>"
        );
    }

    #[test]
    fn test_pretty_output_indents_tags_only() {
        let xml = render(true);
        assert!(xml.contains("\n  <row>\n    <c1>x &amp; y</c1>\n"));
        assert!(xml.ends_with("</table>\n"));
    }
}
