//! Field schema registry
//!
//! A [`FieldSchema`] is the single source of truth for both extraction (which
//! child elements to read from every item) and coercion (what type each
//! output column gets). Order is significant: it is the CSV column order.

use crate::error::{EtlError, Result};
use std::collections::HashSet;

/// Target scalar type of an output column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// 64-bit signed integer
    Int64,
    /// Text, kept verbatim (zero-padded codes stay zero-padded)
    String,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Int64 => "int64",
            FieldType::String => "string",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cleanup applied to a raw value at extraction time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cleanup {
    #[default]
    None,
    /// Remove thousands separators (`"1,234,000"` -> `"1234000"`)
    StripThousandsSeparators,
}

impl Cleanup {
    pub fn apply(self, raw: String) -> String {
        match self {
            Cleanup::None => raw,
            Cleanup::StripThousandsSeparators => raw.replace(',', ""),
        }
    }
}

/// One named, typed column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    pub cleanup: Cleanup,
}

impl FieldDef {
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::String,
            cleanup: Cleanup::None,
        }
    }

    pub fn int64(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Int64,
            cleanup: Cleanup::None,
        }
    }

    /// A monetary amount: integer typed, separators stripped on extraction
    pub fn amount(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Int64,
            cleanup: Cleanup::StripThousandsSeparators,
        }
    }
}

/// Ordered mapping from field name to target type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<FieldDef>,
}

impl FieldSchema {
    /// Build a schema, rejecting empty schemas and duplicate names
    pub fn new(fields: Vec<FieldDef>) -> Result<Self> {
        if fields.is_empty() {
            return Err(EtlError::InvalidSchema(
                "schema must declare at least one field".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(EtlError::InvalidSchema("field names must not be empty".to_string()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(EtlError::InvalidSchema(format!(
                    "field '{}' is declared more than once",
                    field.name
                )));
            }
        }

        Ok(Self { fields })
    }

    /// Schema of the apartment trade transaction feed
    pub fn apartment_trades() -> Self {
        let mut fields = vec![FieldDef::amount(AMOUNT_FIELD)];
        fields.extend(APARTMENT_TRADE_TEXT_FIELDS.iter().copied().map(FieldDef::string));
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Transaction amount, in units of 10,000 KRW
pub const AMOUNT_FIELD: &str = "거래금액";

const APARTMENT_TRADE_TEXT_FIELDS: [&str; 23] = [
    "건축년도",
    "년",
    "도로명",
    "도로명건물본번호코드",
    "도로명건물부번호코드",
    "도로명시군구코드",
    "도로명일련번호코드",
    "도로명지상지하코드",
    "도로명코드",
    "법정동",
    "법정동본번코드",
    "법정동부번코드",
    "법정동시군구코드",
    "법정동읍면동코드",
    "법정동지번코드",
    "아파트",
    "월",
    "일",
    "일련번호",
    "전용면적",
    "지번",
    "지역코드",
    "층",
];
