//! Tokens waiting for a translation, the requests carrying them, and the
//! cooldown that keeps failed tokens from being retried straight away.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use indexmap::{IndexMap, IndexSet};

use crate::cache::TranslationCache;
use crate::dom::NodeId;

/// How long a token that came back empty or failed is left alone.
pub const FAILURE_COOLDOWN: Duration = Duration::from_secs(30);

pub type RequestId = u64;

/// One adapter call worth of tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub request_id: RequestId,
    pub tokens: Vec<String>,
}

/// A queued token the cache could answer without a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub token: String,
    pub translation: String,
    pub targets: Vec<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushPlan {
    pub resolved: Vec<Resolved>,
    pub dispatches: Vec<Dispatch>,
}

#[derive(Debug, Clone, Default)]
pub struct TranslationQueue {
    /// Insertion ordered so requests go out in document order.
    waiting: IndexMap<String, IndexSet<NodeId>>,
    /// Token to the request currently carrying it.
    in_flight: HashMap<String, RequestId>,
    cooldowns: HashMap<String, Instant>,
    next_request_id: RequestId,
}

impl TranslationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `target` under `token`. Registering the same target twice is a no-op.
    pub fn enqueue(&mut self, token: &str, target: NodeId) {
        self.waiting
            .entry(token.to_string())
            .or_default()
            .insert(target);
    }

    /// Remove `token` and hand back everything that was waiting on it.
    pub fn take_targets(&mut self, token: &str) -> Vec<NodeId> {
        self.waiting
            .shift_remove(token)
            .map(|targets| targets.into_iter().collect())
            .unwrap_or_default()
    }

    pub fn is_queued(&self, token: &str) -> bool {
        self.waiting.contains_key(token)
    }

    pub fn is_in_flight(&self, token: &str) -> bool {
        self.in_flight.contains_key(token)
    }

    /// Whether `token` is still cooling down at `now`; an elapsed entry is dropped.
    pub fn is_cooling_down(&mut self, token: &str, now: Instant) -> bool {
        match self.cooldowns.get(token) {
            Some(&until) if until > now => true,
            Some(_) => {
                self.cooldowns.remove(token);
                false
            }
            None => false,
        }
    }

    pub fn cool_down(&mut self, token: &str, now: Instant) {
        self.cooldowns
            .insert(token.to_string(), now + FAILURE_COOLDOWN);
    }

    pub fn clear_cooldown(&mut self, token: &str) {
        self.cooldowns.remove(token);
    }

    /// Work out what a flush does at `now`.
    ///
    /// Tokens the cache knows are taken out of the queue and returned as
    /// resolved. Tokens neither in flight nor cooling down are split into
    /// requests of at most `chunk_size` and marked in flight. Everything else
    /// stays queued.
    pub fn plan_flush(
        &mut self,
        cache: &mut TranslationCache,
        now: Instant,
        chunk_size: usize,
    ) -> FlushPlan {
        let mut plan = FlushPlan::default();
        let mut requestable = Vec::new();

        let tokens: Vec<String> = self.waiting.keys().cloned().collect();
        for token in tokens {
            if let Some(translation) = cache.get(&token, now) {
                let targets = self.take_targets(&token);
                plan.resolved.push(Resolved {
                    token,
                    translation,
                    targets,
                });
                continue;
            }
            if self.is_in_flight(&token) || self.is_cooling_down(&token, now) {
                continue;
            }
            requestable.push(token);
        }

        for chunk in requestable.chunks(chunk_size.max(1)) {
            self.next_request_id += 1;
            let request_id = self.next_request_id;
            for token in chunk {
                self.in_flight.insert(token.clone(), request_id);
            }
            plan.dispatches.push(Dispatch {
                request_id,
                tokens: chunk.to_vec(),
            });
        }
        plan
    }

    /// Release the in-flight marks `request_id` still owns.
    ///
    /// A mark taken over by a newer request for the same token stays.
    pub fn finish_request(&mut self, request_id: RequestId, tokens: &[String]) {
        for token in tokens {
            if self.in_flight.get(token) == Some(&request_id) {
                self.in_flight.remove(token);
            }
        }
    }

    /// Drop all waiting work, in-flight marks and cooldowns. Request ids keep
    /// counting so an old request can never be mistaken for a new one.
    pub fn clear(&mut self) {
        self.waiting.clear();
        self.in_flight.clear();
        self.cooldowns.clear();
    }

    /// Whether a flush at `now` would send anything.
    pub fn has_requestable(&self, now: Instant) -> bool {
        self.waiting.keys().any(|token| {
            !self.in_flight.contains_key(token)
                && !self.cooldowns.get(token).is_some_and(|&until| until > now)
        })
    }

    pub fn queued_len(&self) -> usize {
        self.waiting.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn cooldown_len(&self) -> usize {
        self.cooldowns.len()
    }
}
