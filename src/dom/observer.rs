use super::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// One child-list change, as `MutationObserver` reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
}

#[derive(Debug)]
struct Registration {
    id: ObserverId,
    target: NodeId,
    queue: Vec<MutationRecord>,
}

#[derive(Debug, Default)]
pub(crate) struct ObserverRegistry {
    next_id: u64,
    registrations: Vec<Registration>,
}

impl ObserverRegistry {
    pub(crate) fn register(&mut self, target: NodeId) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.registrations.push(Registration {
            id,
            target,
            queue: Vec::new(),
        });
        id
    }

    pub(crate) fn remove(&mut self, id: ObserverId) {
        self.registrations.retain(|registration| registration.id != id);
    }

    pub(crate) fn contains(&self, id: ObserverId) -> bool {
        self.registrations.iter().any(|registration| registration.id == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.registrations.len()
    }

    pub(crate) fn targets(&self) -> impl Iterator<Item = (ObserverId, NodeId)> + '_ {
        self.registrations
            .iter()
            .map(|registration| (registration.id, registration.target))
    }

    pub(crate) fn push(&mut self, id: ObserverId, record: MutationRecord) {
        if let Some(registration) = self
            .registrations
            .iter_mut()
            .find(|registration| registration.id == id)
        {
            registration.queue.push(record);
        }
    }

    pub(crate) fn take(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.registrations
            .iter_mut()
            .find(|registration| registration.id == id)
            .map(|registration| std::mem::take(&mut registration.queue))
            .unwrap_or_default()
    }
}
