//! CLASS: per-class connection limits and the flat list of clients counted
//! against them.

use std::collections::HashMap;

use super::client::ClientId;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ClassId(pub usize);

pub struct Class {
    pub name: String,
    pub local_max: u32,
    pub global_max: u32,
    pub ping_freq_secs: u64,
    pub sendq_cap: usize,
    members: Vec<ClientId>,
}

impl Class {
    pub fn new(name: &str, local_max: u32, global_max: u32, ping_freq_secs: u64, sendq_cap: usize) -> Self {
        Class { name: name.to_string(), local_max, global_max, ping_freq_secs, sendq_cap, members: Vec::new() }
    }

    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn at_global_limit(&self) -> bool {
        self.members.len() as u32 >= self.global_max
    }

    pub fn add(&mut self, id: ClientId) {
        self.members.push(id);
    }

    pub fn remove(&mut self, id: ClientId) {
        self.members.retain(|&m| m != id);
    }
}

/// Manages the named classes and the reverse lookup from name to id.
#[derive(Default)]
pub struct ClassManager {
    classes: Vec<Class>,
    by_name: HashMap<String, ClassId>,
}

impl ClassManager {
    pub fn register(&mut self, class: Class) -> ClassId {
        let id = ClassId(self.classes.len());
        self.by_name.insert(class.name.clone(), id);
        self.classes.push(class);
        id
    }

    pub fn by_name(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: ClassId) -> &Class {
        &self.classes[id.0]
    }

    pub fn get_mut(&mut self, id: ClassId) -> &mut Class {
        &mut self.classes[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup_by_name() {
        let mut mgr = ClassManager::default();
        let id = mgr.register(Class::new("default", 3, 100, 90, 1024));
        assert_eq!(mgr.by_name("default"), Some(id));
        assert_eq!(mgr.get(id).count(), 0);
    }

    #[test]
    fn add_and_remove_tracks_count() {
        let mut mgr = ClassManager::default();
        let id = mgr.register(Class::new("default", 3, 100, 90, 1024));
        mgr.get_mut(id).add(ClientId(1));
        mgr.get_mut(id).add(ClientId(2));
        assert_eq!(mgr.get(id).count(), 2);
        mgr.get_mut(id).remove(ClientId(1));
        assert_eq!(mgr.get(id).count(), 1);
    }

    #[test]
    fn global_limit_is_respected() {
        let mut mgr = ClassManager::default();
        let id = mgr.register(Class::new("tiny", 1, 1, 90, 1024));
        mgr.get_mut(id).add(ClientId(1));
        assert!(mgr.get(id).at_global_limit());
    }
}
