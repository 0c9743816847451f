//! Correlation id lifecycle.
//!
//! Responsibility:
//! - 受信ヘッダ `X-Correlation-Id` の採用 or 新規生成
//! - リクエスト処理中だけ id を束縛し、スコープを抜けたら必ず解除する
//!
//! Notes:
//! - グローバルな状態は持たない。`CorrelationContext` は 1 worker が所有し、
//!   `begin` が返す `CorrelationScope` の Drop で `end` が走る。
use std::fmt;

use uuid::Uuid;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Opaque per-request identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Adopt a non-blank inbound value verbatim, otherwise generate a fresh id.
    pub fn from_inbound(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.trim().is_empty() => Self(v.to_string()),
            _ => Self::generate(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request-scoped correlation binding owned by a single worker.
#[derive(Debug, Default)]
pub struct CorrelationContext {
    current: Option<CorrelationId>,
}

impl CorrelationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an id for the duration of the returned scope.
    pub fn begin(&mut self, inbound: Option<&str>) -> CorrelationScope<'_> {
        let id = CorrelationId::from_inbound(inbound);
        self.current = Some(id.clone());
        CorrelationScope { context: self, id }
    }

    pub fn current(&self) -> Option<&CorrelationId> {
        self.current.as_ref()
    }

    pub fn end(&mut self) {
        self.current = None;
    }
}

/// Guard returned by [`CorrelationContext::begin`]; clears the binding on drop.
#[derive(Debug)]
pub struct CorrelationScope<'a> {
    context: &'a mut CorrelationContext,
    id: CorrelationId,
}

impl CorrelationScope<'_> {
    pub fn id(&self) -> &CorrelationId {
        &self.id
    }
}

impl Drop for CorrelationScope<'_> {
    fn drop(&mut self) {
        self.context.end();
    }
}
