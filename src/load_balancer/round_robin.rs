//! Round-robin load balancing strategy.

use parking_lot::Mutex;
use std::sync::Arc;
use crate::load_balancer::{LoadBalancer, backend::Backend};

/// Round-robin selector.
///
/// The cursor is advanced once per candidate examined, healthy or not, and
/// the whole sweep runs under one lock so concurrent selections are totally
/// ordered.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: Mutex<usize>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if backends.is_empty() {
            return None;
        }

        let len = backends.len();
        let mut cursor = self.cursor.lock();

        for _ in 0..len {
            let backend = &backends[*cursor % len];
            *cursor = cursor.wrapping_add(1);

            if backend.is_healthy() {
                return Some(backend.clone());
            }
        }
        None
    }
}
