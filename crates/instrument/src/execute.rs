//! Execute entry-point decoration.

use skillwatch_core::{ExecuteFn, ExecuteWrapper, SkillRequest, execute_fn};
use tracing::Instrument;

/// Runs every execution inside a `skill.execute` span.
///
/// Pass-through otherwise: the request and the result are untouched. Any
/// work the skill awaits inherits the span, so diagnostics logged during
/// the turn (including capture failures) are attributable to the request.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracedExecute;

impl ExecuteWrapper for TracedExecute {
    fn wrap(&self, execute: ExecuteFn) -> ExecuteFn {
        execute_fn(move |request: SkillRequest| {
            let span = tracing::info_span!(
                "skill.execute",
                request_type = %request.request.kind,
                session_id = request.session.session_id.as_deref().unwrap_or_default(),
                new_session = request.session.new,
            );
            execute(request).instrument(span)
        })
    }
}
