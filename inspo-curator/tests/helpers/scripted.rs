//! Scripted capability fakes
//!
//! Describer and moderator whose per-identifier behavior is set up front.
//! Both record the identifiers they were called with, in call order.

use async_trait::async_trait;
use inspo_curator::types::{
    CandidateItem, DescribeError, Describer, Description, ModerateError, ModerationVerdict,
    Moderator,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn items(ids: &[&str]) -> Vec<CandidateItem> {
    ids.iter().map(|id| CandidateItem::new(*id)).collect()
}

#[derive(Clone, Default)]
pub struct ScriptedDescriber {
    failures: Arc<HashSet<String>>,
    delays: Arc<HashMap<String, Duration>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedDescriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// `describe` fails for these identifiers
    pub fn failing(mut self, ids: &[&str]) -> Self {
        let failures = Arc::make_mut(&mut self.failures);
        for id in ids {
            failures.insert(id.to_string());
        }
        self
    }

    /// Delay the answer for `id`
    pub fn delayed(mut self, id: &str, delay: Duration) -> Self {
        Arc::make_mut(&mut self.delays).insert(id.to_string(), delay);
        self
    }

    pub fn text_for(id: &str) -> String {
        format!("A mellow instrumental inspired by {}", id)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Describer for ScriptedDescriber {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn describe(&self, item: &CandidateItem) -> Result<Description, DescribeError> {
        self.calls.lock().unwrap().push(item.identifier.clone());

        if let Some(delay) = self.delays.get(&item.identifier) {
            tokio::time::sleep(*delay).await;
        }

        if self.failures.contains(&item.identifier) {
            return Err(DescribeError::Service(format!(
                "scripted failure for {}",
                item.identifier
            )));
        }

        Ok(Description {
            source: item.clone(),
            text: Self::text_for(&item.identifier),
        })
    }
}

#[derive(Clone, Copy, Debug)]
enum Script {
    Violation,
    Error,
}

#[derive(Clone, Default)]
pub struct ScriptedModerator {
    scripts: Arc<HashMap<String, Script>>,
    violate_all: bool,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedModerator {
    /// Passes everything not scripted otherwise
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_all() -> Self {
        Self {
            violate_all: true,
            ..Self::default()
        }
    }

    pub fn violating(mut self, ids: &[&str]) -> Self {
        let scripts = Arc::make_mut(&mut self.scripts);
        for id in ids {
            scripts.insert(id.to_string(), Script::Violation);
        }
        self
    }

    pub fn erroring(mut self, ids: &[&str]) -> Self {
        let scripts = Arc::make_mut(&mut self.scripts);
        for id in ids {
            scripts.insert(id.to_string(), Script::Error);
        }
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Moderator for ScriptedModerator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn moderate(
        &self,
        description: &Description,
    ) -> Result<ModerationVerdict, ModerateError> {
        let id = &description.source.identifier;
        self.calls.lock().unwrap().push(id.clone());

        if self.violate_all {
            return Ok(ModerationVerdict::ViolationDetected);
        }

        match self.scripts.get(id) {
            Some(Script::Violation) => Ok(ModerationVerdict::ViolationDetected),
            Some(Script::Error) => Err(ModerateError::Service(format!(
                "scripted moderation outage for {}",
                id
            ))),
            None => Ok(ModerationVerdict::NoViolation),
        }
    }
}
