//! Command-hit counters, computed once per command name rather than per
//! handler call site, not once per mode-letter or binding lookup (see DESIGN.md).

use std::collections::HashMap;

#[derive(Default)]
pub struct CommandStats {
    hits: HashMap<&'static str, u64>,
    bytes_in: u64,
    bytes_out: u64,
}

impl CommandStats {
    pub fn record(&mut self, command: &'static str) {
        *self.hits.entry(command).or_insert(0) += 1;
    }

    pub fn add_bytes_in(&mut self, n: u64) {
        self.bytes_in += n;
    }

    pub fn add_bytes_out(&mut self, n: u64) {
        self.bytes_out += n;
    }

    pub fn hits(&self, command: &str) -> u64 {
        self.hits.get(command).copied().unwrap_or(0)
    }

    pub fn top(&self, n: usize) -> Vec<(&'static str, u64)> {
        let mut entries: Vec<_> = self.hits.iter().map(|(&k, &v)| (k, v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(n);
        entries
    }

    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }

    pub fn bytes_out(&self) -> u64 {
        self.bytes_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_increments_exactly_once_per_call() {
        let mut stats = CommandStats::default();
        stats.record("PRIVMSG");
        stats.record("PRIVMSG");
        stats.record("JOIN");
        assert_eq!(stats.hits("PRIVMSG"), 2);
        assert_eq!(stats.hits("JOIN"), 1);
        assert_eq!(stats.hits("PART"), 0);
    }

    #[test]
    fn top_orders_by_descending_count() {
        let mut stats = CommandStats::default();
        for _ in 0..3 {
            stats.record("PRIVMSG");
        }
        stats.record("JOIN");
        assert_eq!(stats.top(1), vec![("PRIVMSG", 3)]);
    }
}
