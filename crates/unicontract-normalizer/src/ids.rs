use std::collections::HashSet;

use unicontract_model::Protocol;

/// Hands out operation ids that are unique within one contract.
#[derive(Debug)]
pub(crate) struct IdAllocator {
    protocol: Protocol,
    taken: HashSet<String>,
}

impl IdAllocator {
    pub(crate) fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            taken: HashSet::new(),
        }
    }

    /// The natural id when it is present and free, else the positional
    /// fallback, suffixed with `-<n>` if even that is taken.
    pub(crate) fn allocate(&mut self, natural: Option<&str>, index: usize) -> String {
        if let Some(id) = natural.filter(|id| !id.is_empty()) {
            if self.taken.insert(id.to_string()) {
                return id.to_string();
            }
        }
        let fallback = self.protocol.fallback_operation_id(index);
        if self.taken.insert(fallback.clone()) {
            return fallback;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", fallback, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
