use serde::{Deserialize, Serialize};

/// Normalized column type category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeKind {
    String {
        #[serde(default)]
        length: Option<u32>,
    },
    NumericExact {
        precision: u32,
        #[serde(default)]
        scale: u32,
    },
    NumericApproximate {
        precision: u32,
    },
    Boolean,
    DateTime {
        time_defined: bool,
        time_zone_defined: bool,
    },
    Binary,
    Interval,
    Enumeration,
    ComposedArray {
        element_type: Box<Type>,
    },
    ComposedStructure {
        elements: Vec<Type>,
    },
    /// Type the source database could not express; stored as text
    Unsupported,
}

/// Column type: its category plus the original and SQL:2008 type names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Type {
    #[serde(flatten)]
    pub kind: TypeKind,
    #[serde(default)]
    pub original_type_name: String,
    #[serde(default)]
    pub sql2008_type_name: String,
}

impl Type {
    pub fn new(kind: TypeKind, sql2008_type_name: impl Into<String>) -> Self {
        let sql2008_type_name = sql2008_type_name.into();
        Self {
            kind,
            original_type_name: sql2008_type_name.clone(),
            sql2008_type_name,
        }
    }

    pub fn with_original_type_name(mut self, name: impl Into<String>) -> Self {
        self.original_type_name = name.into();
        self
    }

    pub fn varchar(length: u32) -> Self {
        Self::new(
            TypeKind::String {
                length: Some(length),
            },
            format!("CHARACTER VARYING({})", length),
        )
    }

    pub fn clob() -> Self {
        Self::new(TypeKind::String { length: None }, "CHARACTER LARGE OBJECT")
    }

    pub fn blob() -> Self {
        Self::new(TypeKind::Binary, "BINARY LARGE OBJECT")
    }

    pub fn integer() -> Self {
        Self::new(
            TypeKind::NumericExact {
                precision: 10,
                scale: 0,
            },
            "INTEGER",
        )
    }

    pub fn decimal(precision: u32, scale: u32) -> Self {
        Self::new(
            TypeKind::NumericExact { precision, scale },
            format!("DECIMAL({},{})", precision, scale),
        )
    }

    pub fn double() -> Self {
        Self::new(
            TypeKind::NumericApproximate { precision: 53 },
            "DOUBLE PRECISION",
        )
    }

    pub fn boolean() -> Self {
        Self::new(TypeKind::Boolean, "BOOLEAN")
    }

    pub fn date() -> Self {
        Self::new(
            TypeKind::DateTime {
                time_defined: false,
                time_zone_defined: false,
            },
            "DATE",
        )
    }

    pub fn timestamp() -> Self {
        Self::new(
            TypeKind::DateTime {
                time_defined: true,
                time_zone_defined: false,
            },
            "TIMESTAMP",
        )
    }

    pub fn array(element_type: Type) -> Self {
        let name = format!("{} ARRAY", element_type.sql2008_type_name);
        Self::new(
            TypeKind::ComposedArray {
                element_type: Box::new(element_type),
            },
            name,
        )
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind, TypeKind::String { .. })
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.kind, TypeKind::Binary)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::ComposedArray { .. })
    }

    pub fn is_structure(&self) -> bool {
        matches!(self.kind, TypeKind::ComposedStructure { .. })
    }

    /// Element type for arrays, the type itself otherwise
    pub fn leaf_type(&self) -> &Type {
        match &self.kind {
            TypeKind::ComposedArray { element_type } => element_type.leaf_type(),
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_type_name_and_leaf() {
        let t = Type::array(Type::integer());
        assert_eq!(t.sql2008_type_name, "INTEGER ARRAY");
        assert!(t.is_array());
        assert_eq!(t.leaf_type(), &Type::integer());
    }

    #[test]
    fn test_type_json_shape() {
        let json = serde_json::to_value(Type::varchar(20)).unwrap();
        assert_eq!(json["kind"], "string");
        assert_eq!(json["length"], 20);
        assert_eq!(json["sql2008_type_name"], "CHARACTER VARYING(20)");

        let back: Type = serde_json::from_value(json).unwrap();
        assert_eq!(back, Type::varchar(20));
    }
}
