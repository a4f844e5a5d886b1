//! The context store and breadcrumb trail behind a reporter.

use skillwatch_core::{Breadcrumb, ContextPatch, EventId, ExceptionReport};
use std::collections::{BTreeMap, VecDeque};

/// Context merged so far plus the ordered breadcrumb trail.
#[derive(Debug, Clone)]
pub struct Scope {
    tags: BTreeMap<String, String>,
    extra: serde_json::Map<String, serde_json::Value>,
    user: Option<serde_json::Value>,
    breadcrumbs: VecDeque<Breadcrumb>,
    max_breadcrumbs: usize,
    last_event_id: Option<EventId>,
}

impl Scope {
    pub fn new(max_breadcrumbs: usize) -> Self {
        Self {
            tags: BTreeMap::new(),
            extra: serde_json::Map::new(),
            user: None,
            breadcrumbs: VecDeque::new(),
            max_breadcrumbs: max_breadcrumbs.max(1),
            last_event_id: None,
        }
    }

    /// Merge a patch. Keys already present are overwritten; `extra` values
    /// are replaced wholesale, not deep-merged.
    pub fn merge(&mut self, patch: ContextPatch) {
        self.tags.extend(patch.tags);
        self.extra.extend(patch.extra);
        if patch.user.is_some() {
            self.user = patch.user;
        }
    }

    /// Append a breadcrumb, dropping the oldest once the trail is full.
    pub fn push_breadcrumb(&mut self, breadcrumb: Breadcrumb) {
        if self.breadcrumbs.len() == self.max_breadcrumbs {
            self.breadcrumbs.pop_front();
        }
        self.breadcrumbs.push_back(breadcrumb);
    }

    pub fn breadcrumbs(&self) -> impl Iterator<Item = &Breadcrumb> {
        self.breadcrumbs.iter()
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn extra(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.extra
    }

    pub fn last_event_id(&self) -> Option<&EventId> {
        self.last_event_id.as_ref()
    }

    pub fn set_last_event_id(&mut self, event_id: EventId) {
        self.last_event_id = Some(event_id);
    }

    /// Copy this scope's context and trail into `report`.
    pub fn apply_to(&self, report: &mut ExceptionReport) {
        report
            .tags
            .extend(self.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        report
            .extra
            .extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        if report.user.is_none() {
            report.user = self.user.clone();
        }
        report.breadcrumbs.extend(self.breadcrumbs.iter().cloned());
    }
}
