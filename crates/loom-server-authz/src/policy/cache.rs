// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;

use sha2::{Digest, Sha256};

pub const DEFAULT_CAPACITY: usize = 256;

/// Hex SHA-256 of a policy text, used as the cache key.
pub fn policy_digest(policy: &str) -> String {
	hex::encode(Sha256::digest(policy.as_bytes()))
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
	value: T,
	last_used: u64,
}

/// Bounded least-recently-used cache of compiled policies.
#[derive(Debug)]
pub struct PolicyCache<T> {
	entries: HashMap<String, CacheEntry<T>>,
	capacity: usize,
	tick: u64,
}

impl<T: Clone> Default for PolicyCache<T> {
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}

impl<T: Clone> PolicyCache<T> {
	/// A capacity of zero is treated as one.
	pub fn new(capacity: usize) -> Self {
		PolicyCache {
			entries: HashMap::new(),
			capacity: capacity.max(1),
			tick: 0,
		}
	}

	pub fn get(&mut self, key: &str) -> Option<T> {
		let tick = self.next_tick();
		let entry = self.entries.get_mut(key)?;
		entry.last_used = tick;
		Some(entry.value.clone())
	}

	pub fn insert(&mut self, key: String, value: T) {
		let tick = self.next_tick();
		if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
			self.evict_lru();
		}
		self.entries.insert(
			key,
			CacheEntry {
				value,
				last_used: tick,
			},
		);
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	fn next_tick(&mut self) -> u64 {
		self.tick += 1;
		self.tick
	}

	fn evict_lru(&mut self) {
		if let Some(oldest) = self
			.entries
			.iter()
			.min_by_key(|(_, entry)| entry.last_used)
			.map(|(key, _)| key.clone())
		{
			self.entries.remove(&oldest);
		}
	}
}
