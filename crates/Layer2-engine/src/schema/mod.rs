//! Argument Schema - 인자 스키마 검증
//!
//! 정책의 인자 스키마(JSON Schema 부분집합)를 로드 시점에 컴파일하고,
//! 요청 인자를 필드 단위로 검증합니다.
//!
//! ## 지원 키워드
//! - `type`: string / integer / number / boolean / array
//! - `pattern`, `enum`, `minLength`, `maxLength` (string)
//! - `minimum`, `maximum` (integer/number)
//! - `items`, `minItems`, `maxItems` (array)
//! - `required`, `default`, `description`
//! - `sensitive`: 감사 기록 전 마스킹 대상 표시 (확장 키워드)
//!
//! 선언되지 않은 인자 키는 거부합니다 (additionalProperties 는 항상 false).
//! 실패는 (field, reason) 쌍의 목록으로 돌려줍니다.

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use opsgate_foundation::{Error, Result};

// ============================================================================
// Field Error
// ============================================================================

/// 필드 단위 검증 실패
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Field Type
// ============================================================================

/// 지원 필드 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
}

impl FieldType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => match value {
                Value::Number(n) => n.is_i64() || n.is_u64(),
                _ => false,
            },
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
        }
    }
}

// ============================================================================
// Field Spec
// ============================================================================

/// 컴파일된 필드 스펙
#[derive(Debug)]
struct FieldSpec {
    name: String,
    ty: FieldType,
    required: bool,
    default: Option<Value>,
    sensitive: bool,
    pattern: Option<Regex>,
    enum_values: Option<Vec<Value>>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    items_type: Option<FieldType>,
    min_items: Option<usize>,
    max_items: Option<usize>,
}

impl FieldSpec {
    /// 값 하나를 스펙에 비추어 검사
    fn check(&self, value: &Value) -> std::result::Result<(), String> {
        if !self.ty.matches(value) {
            return Err(format!("expected {}", self.ty.as_str()));
        }

        if let Some(ref allowed) = self.enum_values {
            if !allowed.contains(value) {
                let rendered: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                return Err(format!("must be one of: {}", rendered.join(", ")));
            }
        }

        match self.ty {
            FieldType::String => {
                let s = value.as_str().unwrap_or_default();
                if let Some(min) = self.min_length {
                    if s.chars().count() < min {
                        return Err(format!("shorter than minLength {}", min));
                    }
                }
                if let Some(max) = self.max_length {
                    if s.chars().count() > max {
                        return Err(format!("longer than maxLength {}", max));
                    }
                }
                if let Some(ref pattern) = self.pattern {
                    if !pattern.is_match(s) {
                        return Err(format!("does not match pattern {}", pattern.as_str()));
                    }
                }
            }
            FieldType::Integer | FieldType::Number => {
                let n = value.as_f64().unwrap_or_default();
                if let Some(min) = self.minimum {
                    if n < min {
                        return Err(format!("below minimum {}", min));
                    }
                }
                if let Some(max) = self.maximum {
                    if n > max {
                        return Err(format!("above maximum {}", max));
                    }
                }
            }
            FieldType::Array => {
                let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
                if let Some(min) = self.min_items {
                    if items.len() < min {
                        return Err(format!("fewer than minItems {}", min));
                    }
                }
                if let Some(max) = self.max_items {
                    if items.len() > max {
                        return Err(format!("more than maxItems {}", max));
                    }
                }
                if let Some(item_ty) = self.items_type {
                    for (i, item) in items.iter().enumerate() {
                        if !item_ty.matches(item) {
                            return Err(format!("item {} is not {}", i, item_ty.as_str()));
                        }
                    }
                }
            }
            FieldType::Boolean => {}
        }

        Ok(())
    }
}

// ============================================================================
// Compiled Schema
// ============================================================================

const TOP_LEVEL_KEYWORDS: &[&str] = &[
    "type",
    "properties",
    "required",
    "additionalProperties",
    "description",
    "title",
];

const PROPERTY_KEYWORDS: &[&str] = &[
    "type",
    "description",
    "default",
    "sensitive",
    "pattern",
    "enum",
    "minLength",
    "maxLength",
    "minimum",
    "maximum",
    "items",
    "minItems",
    "maxItems",
];

/// 컴파일된 인자 스키마
///
/// 정책 로드 시 한 번 컴파일되며 이후 불변입니다.
#[derive(Debug)]
pub struct CompiledSchema {
    fields: Vec<FieldSpec>,
}

impl CompiledSchema {
    /// 스키마 컴파일
    ///
    /// 알 수 없는 키워드, 깨진 정규식, 타입에 맞지 않는 default/enum 은
    /// 모두 컴파일 에러입니다.
    pub fn compile(schema: &Value) -> Result<Self> {
        let root = schema
            .as_object()
            .ok_or_else(|| Error::Schema("argument schema must be a JSON object".to_string()))?;

        for key in root.keys() {
            if !TOP_LEVEL_KEYWORDS.contains(&key.as_str()) {
                return Err(Error::Schema(format!("unsupported schema keyword '{}'", key)));
            }
        }

        if let Some(ty) = root.get("type") {
            if ty.as_str() != Some("object") {
                return Err(Error::Schema("schema type must be \"object\"".to_string()));
            }
        }

        if let Some(additional) = root.get("additionalProperties") {
            if additional.as_bool() != Some(false) {
                return Err(Error::Schema(
                    "additionalProperties must be false".to_string(),
                ));
            }
        }

        let empty = Map::new();
        let properties = match root.get("properties") {
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(Error::Schema("properties must be an object".to_string()));
            }
            None => &empty,
        };

        let required_names: Vec<String> = match root.get("required") {
            Some(Value::Array(items)) => {
                let mut names = Vec::with_capacity(items.len());
                for item in items {
                    let name = item.as_str().ok_or_else(|| {
                        Error::Schema("required entries must be strings".to_string())
                    })?;
                    if !properties.contains_key(name) {
                        return Err(Error::Schema(format!(
                            "required references undeclared property '{}'",
                            name
                        )));
                    }
                    names.push(name.to_string());
                }
                names
            }
            Some(_) => return Err(Error::Schema("required must be an array".to_string())),
            None => Vec::new(),
        };

        let mut fields = Vec::with_capacity(properties.len());
        for (name, spec) in properties {
            let field = compile_property(name, spec, required_names.contains(name))?;
            fields.push(field);
        }

        Ok(Self { fields })
    }

    /// 인자 검증
    ///
    /// 성공 시 default 가 채워진 정규화 인자를 돌려줍니다.
    pub fn validate(&self, args: &Value) -> std::result::Result<Value, Vec<FieldError>> {
        let mut errors = Vec::new();

        let map = match args {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            _ => {
                return Err(vec![FieldError::new("$", "arguments must be a JSON object")]);
            }
        };

        // 선언되지 않은 키 거부
        for key in map.keys() {
            if !self.fields.iter().any(|f| &f.name == key) {
                errors.push(FieldError::new(key.clone(), "unknown argument"));
            }
        }

        let mut normalized = Map::new();
        for field in &self.fields {
            match map.get(&field.name) {
                Some(value) => {
                    if let Err(reason) = field.check(value) {
                        errors.push(FieldError::new(field.name.clone(), reason));
                    } else {
                        normalized.insert(field.name.clone(), value.clone());
                    }
                }
                None => {
                    if let Some(ref default) = field.default {
                        normalized.insert(field.name.clone(), default.clone());
                    } else if field.required {
                        errors.push(FieldError::new(field.name.clone(), "required argument missing"));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(Value::Object(normalized))
        } else {
            Err(errors)
        }
    }

    /// 민감 필드 이름 목록
    pub fn sensitive_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.sensitive)
            .map(|f| f.name.clone())
            .collect()
    }

    /// 선언된 필드 이름 목록
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// 필드가 템플릿 치환에 쓰일 수 있는지 (필수이거나 default 보유)
    pub fn always_present(&self, name: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f.name == name && (f.required || f.default.is_some()))
    }

    /// 필드 타입 조회
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.ty)
    }

    /// 배열 필드의 원소 타입 조회
    pub fn items_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.items_type)
    }
}

fn compile_property(name: &str, spec: &Value, required: bool) -> Result<FieldSpec> {
    let map = spec.as_object().ok_or_else(|| {
        Error::Schema(format!("property '{}' must be an object", name))
    })?;

    for key in map.keys() {
        if !PROPERTY_KEYWORDS.contains(&key.as_str()) {
            return Err(Error::Schema(format!(
                "property '{}': unsupported keyword '{}'",
                name, key
            )));
        }
    }

    let ty = map
        .get("type")
        .and_then(Value::as_str)
        .and_then(FieldType::parse)
        .ok_or_else(|| {
            Error::Schema(format!(
                "property '{}': type must be one of string/integer/number/boolean/array",
                name
            ))
        })?;

    let pattern = match map.get("pattern") {
        Some(value) => {
            if ty != FieldType::String {
                return Err(Error::Schema(format!(
                    "property '{}': pattern only applies to strings",
                    name
                )));
            }
            let source = value.as_str().ok_or_else(|| {
                Error::Schema(format!("property '{}': pattern must be a string", name))
            })?;
            let regex = Regex::new(source).map_err(|e| {
                Error::Schema(format!("property '{}': invalid pattern: {}", name, e))
            })?;
            Some(regex)
        }
        None => None,
    };

    let enum_values = match map.get("enum") {
        Some(Value::Array(items)) => {
            if items.is_empty() {
                return Err(Error::Schema(format!(
                    "property '{}': enum must not be empty",
                    name
                )));
            }
            for item in items {
                if !ty.matches(item) {
                    return Err(Error::Schema(format!(
                        "property '{}': enum value {} is not {}",
                        name,
                        item,
                        ty.as_str()
                    )));
                }
            }
            Some(items.clone())
        }
        Some(_) => {
            return Err(Error::Schema(format!(
                "property '{}': enum must be an array",
                name
            )))
        }
        None => None,
    };

    let items_type = match map.get("items") {
        Some(value) => {
            if ty != FieldType::Array {
                return Err(Error::Schema(format!(
                    "property '{}': items only applies to arrays",
                    name
                )));
            }
            let item_ty = value
                .get("type")
                .and_then(Value::as_str)
                .and_then(FieldType::parse)
                .ok_or_else(|| {
                    Error::Schema(format!(
                        "property '{}': items.type must be a supported scalar type",
                        name
                    ))
                })?;
            if item_ty == FieldType::Array {
                return Err(Error::Schema(format!(
                    "property '{}': nested arrays are not supported",
                    name
                )));
            }
            Some(item_ty)
        }
        None => {
            if ty == FieldType::Array {
                return Err(Error::Schema(format!(
                    "property '{}': array must declare items.type",
                    name
                )));
            }
            None
        }
    };

    let sensitive = match map.get("sensitive") {
        Some(value) => value.as_bool().ok_or_else(|| {
            Error::Schema(format!("property '{}': sensitive must be a boolean", name))
        })?,
        None => false,
    };

    let field = FieldSpec {
        name: name.to_string(),
        ty,
        required,
        default: None,
        sensitive,
        pattern,
        enum_values,
        minimum: number_keyword(map, name, "minimum", ty)?,
        maximum: number_keyword(map, name, "maximum", ty)?,
        min_length: count_keyword(map, name, "minLength", ty, FieldType::String)?,
        max_length: count_keyword(map, name, "maxLength", ty, FieldType::String)?,
        items_type,
        min_items: count_keyword(map, name, "minItems", ty, FieldType::Array)?,
        max_items: count_keyword(map, name, "maxItems", ty, FieldType::Array)?,
    };

    // default 는 스펙 자체로 검증해야 함
    let default = match map.get("default") {
        Some(value) => {
            if let Err(reason) = field.check(value) {
                return Err(Error::Schema(format!(
                    "property '{}': default is invalid: {}",
                    name, reason
                )));
            }
            Some(value.clone())
        }
        None => None,
    };

    Ok(FieldSpec { default, ..field })
}

fn number_keyword(map: &Map<String, Value>, name: &str, key: &str, ty: FieldType) -> Result<Option<f64>> {
    match map.get(key) {
        Some(value) => {
            if !matches!(ty, FieldType::Integer | FieldType::Number) {
                return Err(Error::Schema(format!(
                    "property '{}': {} only applies to numbers",
                    name, key
                )));
            }
            let n = value.as_f64().ok_or_else(|| {
                Error::Schema(format!("property '{}': {} must be a number", name, key))
            })?;
            Ok(Some(n))
        }
        None => Ok(None),
    }
}

fn count_keyword(
    map: &Map<String, Value>,
    name: &str,
    key: &str,
    ty: FieldType,
    applies_to: FieldType,
) -> Result<Option<usize>> {
    match map.get(key) {
        Some(value) => {
            if ty != applies_to {
                return Err(Error::Schema(format!(
                    "property '{}': {} only applies to {}",
                    name,
                    key,
                    applies_to.as_str()
                )));
            }
            let n = value.as_u64().ok_or_else(|| {
                Error::Schema(format!(
                    "property '{}': {} must be a non-negative integer",
                    name, key
                ))
            })?;
            Ok(Some(n as usize))
        }
        None => Ok(None),
    }
}

// ============================================================================
// 테스트
// ============================================================================
