//! Board controller: owns the card list for one view.
//!
//! The list is an immutable snapshot. Every change clones it, replaces the
//! one card at its index and swaps the new list in, so a reader holding the
//! previous snapshot during an in-flight request never sees a half-updated
//! list. Each card has its own loading flag: a second start/complete on a
//! card with a request outstanding is refused, other cards stay operable.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use super::card::CardSession;
use crate::cache::LocalCache;
use crate::client::WorkService;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::models::Card;
use crate::notify::{Notifier, Severity};

/// The card list of one view plus the collaborators its handlers need.
pub struct Board<S, C> {
    service: S,
    clock: C,
    notifier: Arc<dyn Notifier>,
    cache: Option<LocalCache>,
    cards: RwLock<Arc<Vec<CardSession>>>,
    loading: Mutex<HashSet<usize>>,
    offline: bool,
}

impl<S: WorkService, C: Clock> Board<S, C> {
    /// Load the card list from the service.
    ///
    /// When the service is unreachable and the cache holds a card list, that
    /// list is shown instead and the board is marked offline.
    pub async fn load(
        service: S,
        clock: C,
        notifier: Arc<dyn Notifier>,
        cache: Option<LocalCache>,
    ) -> Result<Self> {
        let (cards, offline) = match service.list_cards().await {
            Ok(cards) => {
                let cards = dedupe_cards(cards);
                if let Some(cache) = &cache {
                    if let Err(e) = cache.store_cards(&cards) {
                        warn!(error = %e, "failed to cache card list");
                    }
                }
                (cards, false)
            }
            Err(e) if e.is_transport() => {
                let cached = cache.as_ref().map(LocalCache::load_cards).transpose()?.flatten();
                let Some(cards) = cached else {
                    notifier.notify(&format!("Could not load cards: {e}"), Severity::Error);
                    return Err(e);
                };
                warn!(error = %e, "work service unreachable, using cached cards");
                notifier.notify(
                    "Work service unreachable, showing cached cards",
                    Severity::Error,
                );
                (cards, true)
            }
            Err(e) => return Err(e),
        };

        let now = clock.now();
        let sessions = cards.into_iter().map(|c| CardSession::load(c, now)).collect();

        Ok(Self {
            service,
            clock,
            notifier,
            cache,
            cards: RwLock::new(Arc::new(sessions)),
            loading: Mutex::new(HashSet::new()),
            offline,
        })
    }

    /// The card list was served from the offline cache.
    pub const fn is_offline(&self) -> bool {
        self.offline
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// The current snapshot of the card list.
    pub async fn snapshot(&self) -> Arc<Vec<CardSession>> {
        Arc::clone(&*self.cards.read().await)
    }

    pub async fn card(&self, index: usize) -> Result<CardSession> {
        self.snapshot()
            .await
            .get(index)
            .cloned()
            .ok_or(Error::UnknownCard(index))
    }

    /// Index of the card whose id or name matches `key` (names case-insensitively).
    pub async fn find(&self, key: &str) -> Option<usize> {
        let cards = self.snapshot().await;
        cards
            .iter()
            .position(|c| c.card().id == key)
            .or_else(|| {
                cards
                    .iter()
                    .position(|c| c.card().name.eq_ignore_ascii_case(key))
            })
    }

    pub async fn is_loading(&self, index: usize) -> bool {
        self.loading.lock().await.contains(&index)
    }

    /// Edit a card's description locally.
    pub async fn edit_description(&self, index: usize, text: &str) -> Result<()> {
        if self.is_loading(index).await {
            return Err(Error::Busy(index));
        }
        let mut card = self.card(index).await?;
        let result = card.edit_description(text);
        self.replace(index, card).await;
        result
    }

    /// Start work on a card.
    pub async fn start(&self, index: usize) -> Result<()> {
        let mut card = self.begin(index).await?;
        let result = card.start(&self.service, &self.clock).await.map(|_| ());
        self.finish(index, card, &result, "started").await;
        result
    }

    /// Complete work on a card. Returns the recorded elapsed seconds.
    pub async fn complete(&self, index: usize) -> Result<u64> {
        let mut card = self.begin(index).await?;
        let result = card.complete(&self.service, &self.clock).await;
        self.finish(index, card, &result, "updated!").await;
        result
    }

    /// Save a running card's description to the service.
    pub async fn save_description(&self, index: usize) -> Result<()> {
        let mut card = self.begin(index).await?;
        let result = card.save_description(&self.service).await;
        self.finish(index, card, &result, "description saved").await;
        result
    }

    /// Return a stopped card to idle.
    pub async fn reset(&self, index: usize) -> Result<()> {
        if self.is_loading(index).await {
            return Err(Error::Busy(index));
        }
        let mut card = self.card(index).await?;
        card.reset()?;
        self.replace(index, card).await;
        Ok(())
    }

    /// Advance every running card's display by one second.
    pub async fn tick(&self) {
        let mut guard = self.cards.write().await;
        let mut next = (**guard).clone();
        for card in &mut next {
            card.tick();
        }
        *guard = Arc::new(next);
    }

    /// Mark the card as loading and hand back a working copy of it.
    async fn begin(&self, index: usize) -> Result<CardSession> {
        let card = self.card(index).await?;
        if !self.loading.lock().await.insert(index) {
            debug!(index, "request already in flight");
            return Err(Error::Busy(index));
        }
        Ok(card)
    }

    /// Publish the card, clear its loading flag and tell the user how it went.
    async fn finish<T>(&self, index: usize, card: CardSession, result: &Result<T>, verb: &str) {
        let name = card.display_name().to_string();
        self.replace(index, card).await;
        self.loading.lock().await.remove(&index);

        match result {
            Ok(_) => {
                self.notifier
                    .notify(&format!("{name} work {verb}"), Severity::Info);
                self.persist().await;
            }
            Err(e) if e.is_transport() => {
                self.notifier.notify(&format!("{name}: {e}"), Severity::Error);
            }
            // validation and transition errors stay on the card
            Err(_) => {}
        }
    }

    async fn replace(&self, index: usize, card: CardSession) {
        let mut guard = self.cards.write().await;
        if index >= guard.len() {
            return;
        }
        let mut next = (**guard).clone();
        next[index] = card;
        *guard = Arc::new(next);
    }

    async fn persist(&self) {
        let Some(cache) = &self.cache else {
            return;
        };
        let cards: Vec<Card> = self
            .snapshot()
            .await
            .iter()
            .map(|c| c.card().clone())
            .collect();
        if let Err(e) = cache.store_cards(&cards) {
            warn!(error = %e, "failed to cache card list");
        }
    }
}

/// Drop repeated cards, keeping the first card seen for each id.
fn dedupe_cards(cards: Vec<Card>) -> Vec<Card> {
    let mut seen = HashSet::new();
    cards
        .into_iter()
        .filter(|c| c.id.is_empty() || seen.insert(c.id.clone()))
        .collect()
}
