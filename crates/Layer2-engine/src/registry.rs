//! Tool Registry - 도구 레지스트리
//!
//! 검증이 끝난 정책에서 만드는 불변 조회 테이블. 도구 이름으로
//! 정의와 컴파일된 스키마를 찾고, list_tools 용 카탈로그를
//! 정책 선언 순서 그대로 제공합니다.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use opsgate_foundation::{Error, Result};

use crate::policy::{PolicyDocument, ToolDefinition};
use crate::schema::CompiledSchema;

// ============================================================================
// 타입
// ============================================================================

/// 레지스트리에 등록된 도구 하나
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    pub schema: CompiledSchema,
}

/// list_tools 응답에 실리는 카탈로그 항목
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub description: String,
    pub mutates: bool,
    pub requires_confirm: bool,
    pub schema: Value,
}

// ============================================================================
// 레지스트리
// ============================================================================

/// 도구 레지스트리
///
/// 기동 시 한 번 만들어지며 이후 읽기 전용입니다.
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
    catalog: Vec<CatalogEntry>,
}

impl ToolRegistry {
    /// 검증된 정책 문서로 레지스트리 구성
    pub fn from_policy(document: PolicyDocument) -> Result<Self> {
        let mut tools = Vec::with_capacity(document.tools.len());
        let mut index = HashMap::new();
        let mut catalog = Vec::with_capacity(document.tools.len());

        for definition in document.tools {
            let schema = CompiledSchema::compile(&definition.args)
                .map_err(|e| Error::policy_tool(&definition.name, e.to_string()))?;

            if index.insert(definition.name.clone(), tools.len()).is_some() {
                return Err(Error::Policy(format!(
                    "Duplicate tool name: {}",
                    definition.name
                )));
            }

            catalog.push(CatalogEntry {
                name: definition.name.clone(),
                description: definition.description.clone(),
                mutates: definition.mutates,
                requires_confirm: definition.confirm_required(),
                schema: definition.args.clone(),
            });

            tools.push(RegisteredTool { definition, schema });
        }

        Ok(Self {
            tools,
            index,
            catalog,
        })
    }

    /// 이름으로 도구 조회
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// 정책 선언 순서의 도구 이름 목록
    pub fn names(&self) -> Vec<&str> {
        self.tools
            .iter()
            .map(|t| t.definition.name.as_str())
            .collect()
    }

    /// 정책 선언 순서의 카탈로그
    pub fn catalog(&self) -> &[CatalogEntry] {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ============================================================================
// 테스트
// ============================================================================
