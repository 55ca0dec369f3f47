//! The set of topics a deployment serves.

use std::collections::BTreeSet;

use wsnotify_sdk::objects::{EventKind, InvalidTopicError, Topic};

/// Topics enabled for this deployment.
///
/// Built once at startup from configuration and shared read-only (behind
/// an `Arc`) afterwards. Nothing can add or remove a topic at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRegistry {
    topics: BTreeSet<Topic>,
}

impl TopicRegistry {
    /// A registry with the given topics enabled.
    pub fn new(topics: impl IntoIterator<Item = Topic>) -> Self {
        Self {
            topics: topics.into_iter().collect(),
        }
    }

    /// A registry with every known topic enabled.
    pub fn all() -> Self {
        Self::new(Topic::ALL)
    }

    /// Build a registry from topic names, failing on the first unknown one.
    pub fn from_names<I, S>(names: I) -> Result<Self, InvalidTopicError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let topics = names
            .into_iter()
            .map(|name| name.as_ref().parse::<Topic>())
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { topics })
    }

    pub fn contains(&self, topic: Topic) -> bool {
        self.topics.contains(&topic)
    }

    /// Resolve a topic name against this registry.
    ///
    /// Unknown names and known-but-disabled topics both fail.
    pub fn resolve(&self, name: &str) -> Result<Topic, InvalidTopicError> {
        let topic: Topic = name.parse()?;
        if self.contains(topic) {
            Ok(topic)
        } else {
            Err(InvalidTopicError(name.to_owned()))
        }
    }

    /// Check that every kind's topic is enabled.
    ///
    /// Run at startup for the event kinds a service is going to emit.
    pub fn ensure_kinds(&self, kinds: &[EventKind]) -> Result<(), InvalidTopicError> {
        match kinds.iter().find(|kind| !self.contains(kind.topic())) {
            Some(kind) => Err(InvalidTopicError(format!(
                "{} (required by {})",
                kind.topic(),
                kind.id()
            ))),
            None => Ok(()),
        }
    }

    pub fn topics(&self) -> impl Iterator<Item = Topic> + '_ {
        self.topics.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

impl Default for TopicRegistry {
    fn default() -> Self {
        Self::all()
    }
}
