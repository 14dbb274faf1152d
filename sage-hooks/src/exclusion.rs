//! Structural tool exclusion (§4.2's `run_query` ban on the generate
//! and format steps).
//!
//! A worker's prompt already tells the model which tools it may use,
//! but a misbehaving or misconfigured provider could still advertise a
//! forbidden tool and have the model call it. [`ToolExclusionHook`]
//! closes that gap at the `PreToolUse` hook point, which runs
//! regardless of what's in the registry the worker built — it is the
//! same enforcement point the teacher used for permission policy and
//! redaction, reused here for step-scoped tool allow-listing.

use async_trait::async_trait;
use sage_protocol::error::HookError;
use sage_protocol::hook::{Hook, HookAction, HookContext, HookPoint};
use std::collections::HashSet;

/// Rejects any `PreToolUse` call whose tool name is in this hook's
/// excluded set, regardless of whether the worker's own
/// [`sage_tool::ToolRegistry`](sage_tool::ToolRegistry) happens to
/// contain it.
pub struct ToolExclusionHook {
    excluded: HashSet<String>,
}

impl ToolExclusionHook {
    /// Build a hook excluding exactly the named tools.
    pub fn new(excluded: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            excluded: excluded.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Hook for ToolExclusionHook {
    fn points(&self) -> &[HookPoint] {
        &[HookPoint::PreToolUse]
    }

    async fn on_event(&self, ctx: &HookContext) -> Result<HookAction, HookError> {
        match &ctx.tool_name {
            Some(name) if self.excluded.contains(name) => Ok(HookAction::SkipTool {
                reason: format!("{name} is excluded from this step's tool set"),
            }),
            _ => Ok(HookAction::Continue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_for(tool_name: &str) -> HookContext {
        HookContext {
            tool_name: Some(tool_name.to_string()),
            ..HookContext::new(HookPoint::PreToolUse)
        }
    }

    #[tokio::test]
    async fn excluded_tool_is_skipped() {
        let hook = ToolExclusionHook::new(["run_query"]);
        let action = hook.on_event(&ctx_for("run_query")).await.unwrap();
        assert!(matches!(action, HookAction::SkipTool { .. }));
    }

    #[tokio::test]
    async fn non_excluded_tool_continues() {
        let hook = ToolExclusionHook::new(["run_query"]);
        let action = hook.on_event(&ctx_for("list_tables")).await.unwrap();
        assert!(matches!(action, HookAction::Continue));
    }

    #[tokio::test]
    async fn ignores_non_pre_tool_use_points_by_registry_dispatch() {
        let hook = ToolExclusionHook::new(["run_query"]);
        assert_eq!(hook.points(), &[HookPoint::PreToolUse]);
    }
}
