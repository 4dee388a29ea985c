use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

use crate::domain::entities::{Type, TypeKind};
use crate::domain::errors::ModuleError;

pub const CLOB_TYPE: &str = "clobType";
pub const BLOB_TYPE: &str = "blobType";
pub const XS_STRING: &str = "xs:string";

const CONSTANT_MAPPINGS: &[(&str, &str)] = &[
    ("BINARY LARGE OBJECT", BLOB_TYPE),
    ("BINARY VARYING", BLOB_TYPE),
    ("BINARY", BLOB_TYPE),
    ("BIT VARYING", BLOB_TYPE),
    ("BIT", BLOB_TYPE),
    ("BLOB", BLOB_TYPE),
    ("BOOLEAN", "xs:boolean"),
    ("CHARACTER LARGE OBJECT", CLOB_TYPE),
    ("CHARACTER VARYING", XS_STRING),
    ("CHARACTER", XS_STRING),
    ("CLOB", CLOB_TYPE),
    ("DATE", "dateType"),
    ("DECIMAL", "xs:decimal"),
    ("DOUBLE PRECISION", "xs:double"),
    ("DOUBLE", "xs:float"),
    ("FLOAT", "xs:double"),
    ("INTEGER", "xs:integer"),
    ("NATIONAL CHARACTER LARGE OBJECT", CLOB_TYPE),
    ("NATIONAL CHARACTER VARYING", XS_STRING),
    ("NATIONAL CHARACTER", XS_STRING),
    ("NUMERIC", "xs:decimal"),
    ("REAL", "xs:float"),
    ("SMALLINT", "xs:integer"),
    ("TIME WITH TIME ZONE", "timeType"),
    ("TIME", "timeType"),
    ("TIMESTAMP WITH TIME ZONE", "dateTimeType"),
    ("TIMESTAMP", "dateTimeType"),
];

const PATTERN_MAPPINGS: &[(&str, &str)] = &[
    (r"^BIT VARYING\(\d+\)$", BLOB_TYPE),
    (r"^BIT\(\d+\)$", BLOB_TYPE),
    (r"^BINARY\(\d+\)$", BLOB_TYPE),
    (r"^BINARY VARYING\(\d+\)$", BLOB_TYPE),
    (r"^CHARACTER VARYING\(\d+\)$", XS_STRING),
    (r"^CHARACTER\(\d+\)$", XS_STRING),
    (r"^NATIONAL CHARACTER VARYING\(\d+\)$", XS_STRING),
    (r"^NATIONAL CHARACTER\(\d+\)$", XS_STRING),
    (r"^DECIMAL\(\d+(,\d+)?\)$", "xs:decimal"),
    (r"^FLOAT\(\d+\)$", "xs:float"),
    (r"^NUMERIC\(\d+(,\d+)?\)$", "xs:decimal"),
];

/// Maps SQL:2008 type names to the XSD types used in table schemas.
///
/// Built once per export and passed to whoever needs it.
pub struct XsdTypeMapper {
    constants: HashMap<&'static str, &'static str>,
    patterns: Vec<(Regex, &'static str)>,
}

impl XsdTypeMapper {
    pub fn new() -> Result<Self, ModuleError> {
        let patterns = PATTERN_MAPPINGS
            .iter()
            .map(|(pattern, xsd)| {
                Regex::new(pattern)
                    .map(|re| (re, *xsd))
                    .map_err(|e| ModuleError::with_cause(format!("Invalid type pattern {}", pattern), e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            constants: CONSTANT_MAPPINGS.iter().copied().collect(),
            patterns,
        })
    }

    /// XSD type for a SQL:2008 type name, `None` when the name is unknown
    pub fn convert_name(&self, sql2008_type: &str) -> Option<&'static str> {
        let normalized = sql2008_type.trim().to_uppercase();
        if let Some(xsd) = self.constants.get(normalized.as_str()) {
            return Some(*xsd);
        }
        self.patterns
            .iter()
            .find(|(re, _)| re.is_match(&normalized))
            .map(|(_, xsd)| *xsd)
    }

    /// XSD type for a column type.
    ///
    /// Arrays map to their element type, structures have no XSD type
    /// (`None`), unsupported types are stored as `xs:string`.
    pub fn convert(&self, column_type: &Type) -> Result<Option<&'static str>, ModuleError> {
        match &column_type.kind {
            TypeKind::Unsupported => {
                debug!(
                    "Found an unsupported datatype and saved it as xs:string: {}",
                    column_type.original_type_name
                );
                Ok(Some(XS_STRING))
            }
            TypeKind::ComposedArray { element_type } => self.convert(element_type),
            TypeKind::ComposedStructure { .. } => Ok(None),
            _ => self
                .convert_name(&column_type.sql2008_type_name)
                .map(Some)
                .ok_or_else(|| ModuleError::UnknownType(column_type.sql2008_type_name.clone())),
        }
    }

    /// True when values of this type are LOBs (`clobType`/`blobType`)
    pub fn is_large_type(&self, column_type: &Type) -> bool {
        match self.convert(column_type) {
            Ok(Some(xsd)) => xsd == CLOB_TYPE || xsd == BLOB_TYPE,
            Ok(None) => false,
            Err(e) => {
                debug!("Could not map {:?} to an XSD type, assuming it is not a LOB: {}", column_type, e);
                false
            }
        }
    }
}
