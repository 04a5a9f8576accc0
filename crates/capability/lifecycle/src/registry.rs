use domain::TagSubscription;
use std::collections::HashMap;

/// 当前订阅集合，按点位名去重并保持首次加入的顺序。
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: Vec<TagSubscription>,
    index: HashMap<String, usize>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新增或替换同名订阅的间隔。
    pub fn add(&mut self, subscription: TagSubscription) {
        match self.index.get(&subscription.name) {
            Some(&position) => self.entries[position] = subscription,
            None => {
                self.index
                    .insert(subscription.name.clone(), self.entries.len());
                self.entries.push(subscription);
            }
        }
    }

    pub fn all(&self) -> &[TagSubscription] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_replaces_existing_name() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(TagSubscription::with_default_interval("T1"));
        registry.add(TagSubscription::new("T2", 250));
        registry.add(TagSubscription::new("T1", 5000));

        assert_eq!(
            registry.all(),
            &[TagSubscription::new("T1", 5000), TagSubscription::new("T2", 250)]
        );
    }

    #[test]
    fn clear_drops_everything() {
        let mut registry = SubscriptionRegistry::new();
        registry.add(TagSubscription::with_default_interval("T1"));
        registry.clear();
        assert!(registry.is_empty());

        registry.add(TagSubscription::with_default_interval("T1"));
        assert_eq!(registry.len(), 1);
    }
}
