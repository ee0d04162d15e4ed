use async_trait::async_trait;
use axum::response::IntoResponse;
use serde_json::Value;

use crate::error::AppError;
use crate::pipeline::compose::{Interceptor, Outcome};
use crate::pipeline::context::RequestContext;

/// フィールドの期待型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
}

impl FieldType {
    fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug)]
struct FieldRule {
    name: &'static str,
    kind: FieldType,
    required: bool,
}

/// バリデーションスキーマ
///
/// フィールド規則の列。宣言順がそのまま検査順になる。
#[derive(Debug, Default)]
pub struct Schema {
    fields: Vec<FieldRule>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &'static str, kind: FieldType) -> Self {
        self.fields.push(FieldRule {
            name,
            kind,
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: &'static str, kind: FieldType) -> Self {
        self.fields.push(FieldRule {
            name,
            kind,
            required: false,
        });
        self
    }
}

/// スキーマに対してボディを検査
///
/// fail-fast: 最初に違反したフィールドだけを報告する
/// （呼び出し側は1つ直して再送信し、次のエラーを見る）。
fn check(schema: &Schema, raw: &[u8]) -> Result<Value, AppError> {
    let body: Value = serde_json::from_slice(raw)
        .map_err(|_| AppError::Validation("JSON invalide".to_string()))?;

    let Some(object) = body.as_object() else {
        return Err(AppError::Validation("JSON invalide".to_string()));
    };

    for rule in &schema.fields {
        match object.get(rule.name) {
            // null は欠落と同じ扱い
            None | Some(Value::Null) => {
                if rule.required {
                    return Err(missing(rule.name));
                }
            }
            Some(value) => {
                if !rule.kind.matches(value) {
                    return Err(AppError::Validation(format!(
                        "Le champ {} doit être de type {}",
                        rule.name,
                        rule.kind.name()
                    )));
                }

                // 必須文字列は空白のみも欠落扱い
                if rule.required
                    && rule.kind == FieldType::String
                    && value.as_str().is_some_and(|s| s.trim().is_empty())
                {
                    return Err(missing(rule.name));
                }
            }
        }
    }

    Ok(body)
}

fn missing(name: &str) -> AppError {
    AppError::Validation(format!("Le champ {name} est requis"))
}

/// バリデーションインターセプター
///
/// 成功時は検証済みボディをコンテキストに書き込んで続行、
/// 失敗時は 400 で短絡する。
pub struct Validate {
    schema: Schema,
}

impl Validate {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }
}

#[async_trait]
impl Interceptor for Validate {
    async fn call(&self, ctx: &mut RequestContext) -> Outcome {
        match check(&self.schema, ctx.raw_body()) {
            Ok(body) => {
                ctx.set_body(body);
                Outcome::Continue
            }
            Err(e) => Outcome::Halt(e.into_response()),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Bytes;
    use axum::http::HeaderMap;

    use super::*;

    fn schema_ab() -> Schema {
        Schema::new()
            .required("a", FieldType::String)
            .required("b", FieldType::String)
    }

    fn validation_message(result: Result<Value, AppError>) -> String {
        match result {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json() {
        let msg = validation_message(check(&schema_ab(), b"not-json{{{"));
        assert!(msg.contains("JSON invalide"));
    }

    #[test]
    fn test_non_object_body() {
        let msg = validation_message(check(&schema_ab(), b"[1, 2, 3]"));
        assert!(msg.contains("JSON invalide"));
    }

    #[test]
    fn test_fail_fast_reports_first_declared_field() {
        // 両方欠落 → 先に宣言された a だけが報告される
        let msg = validation_message(check(&schema_ab(), b"{}"));
        assert!(msg.contains('a'), "message was: {msg}");
        assert!(msg.contains("requis"));
        assert!(!msg.contains('b'));
    }

    #[test]
    fn test_fail_fast_moves_to_next_field() {
        let msg = validation_message(check(&schema_ab(), br#"{"a": "x"}"#));
        assert!(msg.contains('b'), "message was: {msg}");
        assert!(msg.contains("requis"));
    }

    #[test]
    fn test_type_mismatch() {
        let msg = validation_message(check(&schema_ab(), br#"{"a": 123, "b": "y"}"#));
        assert!(msg.contains('a'));
        assert!(msg.contains("type"));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let msg = validation_message(check(&schema_ab(), br#"{"a": null, "b": "y"}"#));
        assert!(msg.contains('a'));
        assert!(msg.contains("requis"));
    }

    #[test]
    fn test_blank_string_counts_as_missing() {
        let msg = validation_message(check(&schema_ab(), br#"{"a": "   ", "b": "y"}"#));
        assert!(msg.contains('a'));
        assert!(msg.contains("requis"));
    }

    #[test]
    fn test_optional_field_may_be_absent_but_not_mistyped() {
        let schema = Schema::new().optional("flag", FieldType::Boolean);

        assert!(check(&schema, b"{}").is_ok());

        let msg = validation_message(check(&schema, br#"{"flag": "oui"}"#));
        assert!(msg.contains("flag"));
        assert!(msg.contains("type"));
    }

    #[test]
    fn test_number_and_boolean_accepted() {
        let schema = Schema::new()
            .required("count", FieldType::Number)
            .required("active", FieldType::Boolean);

        assert!(check(&schema, br#"{"count": 3.5, "active": false}"#).is_ok());
    }

    #[tokio::test]
    async fn test_interceptor_writes_body_on_success() {
        let mut ctx = RequestContext::new(
            HeaderMap::new(),
            Bytes::from_static(br#"{"a": "x", "b": "y"}"#),
        );

        let validate = Validate::new(schema_ab());
        match validate.call(&mut ctx).await {
            Outcome::Continue => {}
            Outcome::Halt(_) => panic!("expected continue"),
        }

        assert_eq!(ctx.body().unwrap()["a"], "x");
    }

    #[tokio::test]
    async fn test_interceptor_halts_with_400() {
        let mut ctx = RequestContext::new(HeaderMap::new(), Bytes::from_static(b"{}"));

        let validate = Validate::new(schema_ab());
        match validate.call(&mut ctx).await {
            Outcome::Halt(response) => {
                assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
            }
            Outcome::Continue => panic!("expected halt"),
        }

        assert!(ctx.body().is_none());
    }
}
