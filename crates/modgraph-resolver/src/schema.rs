//! Attribute schema: per-attribute compatibility and disambiguation rules.
//!
//! Attributes without registered rules are matched by value equality and are
//! never disambiguated beyond preferring the exact requested value.

use std::collections::BTreeMap;

use modgraph_core::attribute::AttributeValue;

pub const USAGE: &str = "org.gradle.usage";
pub const CATEGORY: &str = "org.gradle.category";
pub const LIBRARY_ELEMENTS: &str = "org.gradle.libraryelements";
pub const JVM_VERSION: &str = "org.gradle.jvm.version";

/// Decides whether a producer value satisfies a consumer value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompatibilityRule {
    Equality,
    /// Integer values: the producer value must not exceed the consumer's.
    AtMost,
    /// Values in a total order, lowest first: the producer value must not
    /// come after the consumer's. Unlisted values fall back to equality.
    Ordered(Vec<AttributeValue>),
}

impl CompatibilityRule {
    pub fn is_compatible(&self, consumer: &AttributeValue, producer: &AttributeValue) -> bool {
        if consumer.same_value(producer) {
            return true;
        }
        match self {
            CompatibilityRule::Equality => false,
            CompatibilityRule::AtMost => match (consumer.as_integer(), producer.as_integer()) {
                (Some(c), Some(p)) => p <= c,
                _ => false,
            },
            CompatibilityRule::Ordered(order) => {
                match (position(order, consumer), position(order, producer)) {
                    (Some(c), Some(p)) => p <= c,
                    _ => false,
                }
            }
        }
    }
}

/// Narrows a set of compatible candidates on one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisambiguationRule {
    PreferHighest,
    PreferLowest,
    PreferValue(AttributeValue),
    /// Prefer the value latest in the order (values are listed lowest first).
    OrderedPreference(Vec<AttributeValue>),
}

impl DisambiguationRule {
    /// Indices of the preferred candidates. Candidates without a value for the
    /// attribute are never preferred; an empty result means no preference.
    pub fn preferred(&self, values: &[Option<&AttributeValue>]) -> Vec<usize> {
        let scored: Vec<(usize, i64)> = values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| {
                let v = (*v)?;
                let score = match self {
                    DisambiguationRule::PreferHighest => v.as_integer()?,
                    DisambiguationRule::PreferLowest => v.as_integer()?.checked_neg()?,
                    DisambiguationRule::PreferValue(preferred) => {
                        if !v.same_value(preferred) {
                            return None;
                        }
                        0
                    }
                    DisambiguationRule::OrderedPreference(order) => {
                        i64::try_from(position(order, v)?).ok()?
                    }
                };
                Some((i, score))
            })
            .collect();
        let Some(best) = scored.iter().map(|(_, s)| *s).max() else {
            return Vec::new();
        };
        scored
            .into_iter()
            .filter(|(_, s)| *s == best)
            .map(|(i, _)| i)
            .collect()
    }
}

fn position(order: &[AttributeValue], value: &AttributeValue) -> Option<usize> {
    order.iter().position(|v| v.same_value(value))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeRules {
    compatibility: CompatibilityRule,
    disambiguation: Option<DisambiguationRule>,
}

impl Default for AttributeRules {
    fn default() -> Self {
        Self {
            compatibility: CompatibilityRule::Equality,
            disambiguation: None,
        }
    }
}

/// Rules for every attribute known to a resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSchema {
    rules: BTreeMap<String, AttributeRules>,
}

impl AttributeSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for the well-known JVM ecosystem attributes.
    pub fn standard() -> Self {
        let usage = vec![
            AttributeValue::named("java-runtime"),
            AttributeValue::named("java-api"),
        ];
        let elements = vec![
            AttributeValue::named("jar"),
            AttributeValue::named("classes"),
        ];
        Self::new()
            .with_compatibility(USAGE, CompatibilityRule::Ordered(usage.clone()))
            .with_disambiguation(USAGE, DisambiguationRule::OrderedPreference(usage))
            .with_compatibility(LIBRARY_ELEMENTS, CompatibilityRule::Ordered(elements.clone()))
            .with_disambiguation(LIBRARY_ELEMENTS, DisambiguationRule::OrderedPreference(elements))
            .with_compatibility(JVM_VERSION, CompatibilityRule::AtMost)
            .with_disambiguation(JVM_VERSION, DisambiguationRule::PreferHighest)
            .with_compatibility(CATEGORY, CompatibilityRule::Equality)
    }

    pub fn with_compatibility(mut self, attribute: &str, rule: CompatibilityRule) -> Self {
        self.rules.entry(attribute.to_string()).or_default().compatibility = rule;
        self
    }

    pub fn with_disambiguation(mut self, attribute: &str, rule: DisambiguationRule) -> Self {
        self.rules.entry(attribute.to_string()).or_default().disambiguation = Some(rule);
        self
    }

    pub fn is_compatible(
        &self,
        attribute: &str,
        consumer: &AttributeValue,
        producer: &AttributeValue,
    ) -> bool {
        match self.rules.get(attribute) {
            Some(rules) => rules.compatibility.is_compatible(consumer, producer),
            None => CompatibilityRule::Equality.is_compatible(consumer, producer),
        }
    }

    pub fn disambiguation(&self, attribute: &str) -> Option<&DisambiguationRule> {
        self.rules.get(attribute)?.disambiguation.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_by_default() {
        let schema = AttributeSchema::new();
        assert!(schema.is_compatible("a", &"1".into(), &"1".into()));
        assert!(schema.is_compatible("a", &"1".into(), &1i64.into()));
        assert!(!schema.is_compatible("a", &"1".into(), &"2".into()));
    }

    #[test]
    fn jvm_version_at_most() {
        let schema = AttributeSchema::standard();
        assert!(schema.is_compatible(JVM_VERSION, &17i64.into(), &11i64.into()));
        assert!(!schema.is_compatible(JVM_VERSION, &8i64.into(), &11i64.into()));
    }

    #[test]
    fn api_consumer_accepts_runtime() {
        let schema = AttributeSchema::standard();
        let api = AttributeValue::named("java-api");
        let runtime = AttributeValue::named("java-runtime");
        assert!(schema.is_compatible(USAGE, &api, &runtime));
        assert!(!schema.is_compatible(USAGE, &runtime, &api));
    }

    #[test]
    fn prefer_highest_keeps_ties() {
        let a = AttributeValue::Integer(8);
        let b = AttributeValue::Integer(11);
        let rule = DisambiguationRule::PreferHighest;
        assert_eq!(rule.preferred(&[Some(&a), Some(&b), Some(&b), None]), vec![1, 2]);
        assert_eq!(DisambiguationRule::PreferLowest.preferred(&[Some(&a), Some(&b)]), vec![0]);
    }

    #[test]
    fn prefer_value_without_match_has_no_preference() {
        let rule = DisambiguationRule::PreferValue("x".into());
        let y = AttributeValue::from("y");
        assert!(rule.preferred(&[Some(&y), None]).is_empty());
    }
}
