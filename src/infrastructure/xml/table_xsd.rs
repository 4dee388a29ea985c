use std::io::Write;
use tracing::warn;

use super::sql2008_xsd::XsdTypeMapper;
use super::xml_writer::XmlWriter;
use crate::domain::entities::TableStructure;
use crate::domain::errors::ModuleError;

const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Write the XSD describing one table file.
///
/// `recordType` holds one `c{N}` element per column, typed through the
/// SQL:2008 map; the LOB, temporal and digest helper types follow it.
pub fn write_table_xsd<W: Write>(
    out: W,
    table: &TableStructure,
    namespace: &str,
    types: &XsdTypeMapper,
    pretty: bool,
    path: &str,
) -> Result<W, ModuleError> {
    let mut xsd = XmlWriter::new(out, pretty, path);
    xsd.declaration(Some("no"))?;
    xsd.start(
        "xs:schema",
        &[
            ("xmlns:xs", XS_NAMESPACE),
            ("xmlns", namespace),
            ("attributeFormDefault", "unqualified"),
            ("elementFormDefault", "qualified"),
            ("targetNamespace", namespace),
        ],
    )?;

    xsd.start("xs:element", &[("name", "table")])?;
    xsd.start("xs:complexType", &[])?;
    xsd.start("xs:sequence", &[])?;
    xsd.empty(
        "xs:element",
        &[
            ("maxOccurs", "unbounded"),
            ("minOccurs", "0"),
            ("name", "row"),
            ("type", "recordType"),
        ],
    )?;
    xsd.end("xs:sequence")?;
    xsd.end("xs:complexType")?;
    xsd.end("xs:element")?;

    write_record_type(&mut xsd, table, types)?;
    write_lob_type(
        &mut xsd,
        "clobType",
        "Type to refer CLOB types. Either inline or in a separate file.",
        "xs:string",
    )?;
    write_lob_type(
        &mut xsd,
        "blobType",
        "Type to refer BLOB types. Either inline or in a separate file.",
        "xs:hexBinary",
    )?;
    write_restriction(
        &mut xsd,
        "dateType",
        "xs:date",
        &[
            ("xs:minInclusive", "0001-01-01Z"),
            ("xs:maxExclusive", "10000-01-01Z"),
            ("xs:pattern", r"\d{4}-\d{2}-\d{2}Z?"),
        ],
    )?;
    write_restriction(
        &mut xsd,
        "timeType",
        "xs:time",
        &[("xs:pattern", r"\d{2}:\d{2}:\d{2}Z?")],
    )?;
    write_restriction(
        &mut xsd,
        "dateTimeType",
        "xs:dateTime",
        &[
            ("xs:minInclusive", "0001-01-01T00:00:00.000000000Z"),
            ("xs:maxExclusive", "10000-01-01T00:00:00.000000000Z"),
            ("xs:pattern", r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d*)Z?"),
        ],
    )?;
    write_restriction(
        &mut xsd,
        "digestTypeType",
        "xs:string",
        &[
            ("xs:whiteSpace", "collapse"),
            ("xs:enumeration", "MD5"),
            ("xs:enumeration", "SHA-1"),
            ("xs:enumeration", "SHA-256"),
        ],
    )?;

    xsd.end("xs:schema")?;
    xsd.finish()
}

fn write_record_type<W: Write>(
    xsd: &mut XmlWriter<W>,
    table: &TableStructure,
    types: &XsdTypeMapper,
) -> Result<(), ModuleError> {
    xsd.start("xs:complexType", &[("name", "recordType")])?;
    xsd.start("xs:sequence", &[])?;

    for (i, column) in table.columns.iter().enumerate() {
        let name = format!("c{}", i + 1);
        let column_type = &column.column_type;

        if column_type.is_structure() {
            warn!("XSD validation of tables containing UDT is not yet supported.");
            continue;
        }
        if column_type.is_array() {
            let mut attributes = Vec::with_capacity(2);
            if column.nillable {
                attributes.push(("minOccurs", "0"));
            }
            attributes.push(("name", name.as_str()));
            xsd.start("xs:element", &attributes)?;
            xsd.start("xs:complexType", &[])?;
            xsd.start("xs:sequence", &[])?;
            xsd.empty(
                "xs:any",
                &[
                    ("minOccurs", "0"),
                    ("maxOccurs", "unbounded"),
                    ("processContents", "skip"),
                ],
            )?;
            xsd.end("xs:sequence")?;
            xsd.end("xs:complexType")?;
            xsd.end("xs:element")?;
            continue;
        }

        let xsd_type = types
            .convert(column_type)?
            .ok_or_else(|| ModuleError::UnknownType(column_type.sql2008_type_name.clone()))?;
        let mut attributes = Vec::with_capacity(3);
        if column.nillable {
            attributes.push(("minOccurs", "0"));
        }
        attributes.push(("name", name.as_str()));
        attributes.push(("type", xsd_type));
        xsd.empty("xs:element", &attributes)?;
    }

    xsd.end("xs:sequence")?;
    xsd.end("xs:complexType")
}

fn write_lob_type<W: Write>(
    xsd: &mut XmlWriter<W>,
    name: &str,
    documentation: &str,
    base: &str,
) -> Result<(), ModuleError> {
    xsd.start("xs:complexType", &[("name", name)])?;
    xsd.start("xs:annotation", &[])?;
    xsd.text_element("xs:documentation", documentation)?;
    xsd.end("xs:annotation")?;
    xsd.start("xs:simpleContent", &[])?;
    xsd.start("xs:extension", &[("base", base)])?;
    for (attribute, attribute_type) in [
        ("file", "xs:anyURI"),
        ("length", "xs:integer"),
        ("digestType", "digestTypeType"),
        ("digest", "xs:string"),
    ] {
        xsd.empty(
            "xs:attribute",
            &[("name", attribute), ("type", attribute_type)],
        )?;
    }
    xsd.end("xs:extension")?;
    xsd.end("xs:simpleContent")?;
    xsd.end("xs:complexType")
}

fn write_restriction<W: Write>(
    xsd: &mut XmlWriter<W>,
    name: &str,
    base: &str,
    facets: &[(&str, &str)],
) -> Result<(), ModuleError> {
    xsd.start("xs:simpleType", &[("name", name)])?;
    xsd.start("xs:restriction", &[("base", base)])?;
    for (facet, value) in facets {
        xsd.empty(facet, &[("value", *value)])?;
    }
    xsd.end("xs:restriction")?;
    xsd.end("xs:simpleType")
}
