// SPDX-FileCopyrightText: 2026 lxbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation store.
//!
//! All users share one mutex, so the check-and-set of `waiting_response` in
//! [`ConversationStore::begin_chat`] is atomic with respect to every other
//! operation. Each mutation is persisted while the lock is held. If the
//! write fails when starting or resetting a conversation the in-memory
//! change is undone; a request that has finished always releases the user.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use lxbot_config::model::ChatConfig;
use lxbot_core::{
    CallResult, ChatTurn, KeyValueStore, LxbotError, Role, UserId, extract_reply_text,
};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::state::{PersistedChatState, ResetOutcome, UserConversationState};

/// Storage key of the per-user flags document.
pub const CHAT_STATES_KEY: &str = "chat_states";
/// Storage key of the per-user history document.
pub const CONVERSATIONS_KEY: &str = "conversations";

/// Behaviour switches fixed at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationSettings {
    /// Prepended to every chat request; never stored in history.
    pub system_prompt: Option<String>,
    /// Write history to storage, not only the chat flags.
    pub persist_history: bool,
}

impl From<&ChatConfig> for ConversationSettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            system_prompt: config.effective_system_prompt().map(String::from),
            persist_history: config.persist_history,
        }
    }
}

type Users = BTreeMap<UserId, UserConversationState>;

/// Per-user conversation state with write-through persistence.
pub struct ConversationStore {
    storage: Arc<dyn KeyValueStore>,
    settings: ConversationSettings,
    users: Mutex<Users>,
}

impl ConversationStore {
    /// Loads persisted state from `storage`.
    ///
    /// No request survives a restart, so any persisted `waiting_response`
    /// flag is cleared and the cleaned state written back.
    pub fn open(
        storage: Arc<dyn KeyValueStore>,
        settings: ConversationSettings,
    ) -> Result<Self, LxbotError> {
        let mut users = load_chat_states(storage.as_ref())?;
        if settings.persist_history {
            load_histories(storage.as_ref(), &mut users)?;
        }

        let mut stale = 0usize;
        for state in users.values_mut() {
            if state.waiting_response {
                state.waiting_response = false;
                stale += 1;
            }
        }

        let store = Self {
            storage,
            settings,
            users: Mutex::new(users),
        };

        if stale > 0 {
            let users = store.lock();
            store.persist(&users)?;
            warn!(stale, "cleared in-flight flags left over from previous run");
        }

        info!(
            users = store.lock().len(),
            persist_history = store.settings.persist_history,
            "conversation store loaded"
        );
        Ok(store)
    }

    pub fn settings(&self) -> &ConversationSettings {
        &self.settings
    }

    /// Returns the user's state, creating the default record if absent.
    pub fn get_state(&self, user: &UserId) -> UserConversationState {
        let mut users = self.lock();
        users.entry(user.clone()).or_default().clone()
    }

    /// Whether `user` is in chat mode. Never creates a record, so senders
    /// that only ask one-shot questions leave no trace in storage.
    pub fn in_chat_mode(&self, user: &UserId) -> bool {
        self.lock().get(user).is_some_and(|s| s.chat_mode)
    }

    /// Starts a chat turn.
    ///
    /// On success the user turn is recorded, `chat_mode` and
    /// `waiting_response` are set, and the full message list for the backend
    /// is returned (system prompt first, when configured).
    ///
    /// Fails with [`LxbotError::EmptyInput`] for blank content and
    /// [`LxbotError::AlreadyWaiting`] while a request is in flight; neither
    /// mutates state.
    pub fn begin_chat(&self, user: &UserId, content: &str) -> Result<Vec<ChatTurn>, LxbotError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(LxbotError::EmptyInput);
        }

        let mut users = self.lock();
        let state = users.entry(user.clone()).or_default();
        if state.waiting_response {
            return Err(LxbotError::AlreadyWaiting { user: user.clone() });
        }

        let previous = state.clone();
        state.chat_mode = true;
        state.waiting_response = true;
        state.history.push(ChatTurn::user(content));
        state.message_count += 1;
        let messages = self.request_messages(&state.history);

        self.commit(&mut users, user, previous)?;
        debug!(user_id = %user, turns = messages.len(), "chat turn started");
        Ok(messages)
    }

    /// Applies the outcome of a chat request and clears `waiting_response`.
    ///
    /// Success appends the assistant reply. Failure drops the pending user
    /// turn without retrying it. Either way nothing is touched when the last
    /// turn is not a user turn, which happens after a mid-request reset.
    ///
    /// The in-memory change is kept even if the write fails, so the user is
    /// never left marked as waiting.
    pub fn complete_chat(&self, user: &UserId, result: &CallResult) -> Result<(), LxbotError> {
        let mut users = self.lock();
        let state = users.entry(user.clone()).or_default();
        let pending = state.history.last().is_some_and(|t| t.role == Role::User);

        match result {
            Ok(response) if pending => {
                state.history.push(ChatTurn::assistant(extract_reply_text(response)));
            }
            Err(e) if pending => {
                state.history.pop();
                debug!(user_id = %user, error = %e, "chat turn rolled back");
            }
            _ => {
                debug!(user_id = %user, "no pending user turn; history left unchanged");
            }
        }
        state.waiting_response = false;

        self.release(&users, user)
    }

    /// Rolls back a turn whose request never reached the queue.
    pub fn abort_chat(&self, user: &UserId) -> Result<(), LxbotError> {
        let mut users = self.lock();
        let state = users.entry(user.clone()).or_default();
        if state.history.last().is_some_and(|t| t.role == Role::User) {
            state.history.pop();
        }
        state.waiting_response = false;
        self.release(&users, user)
    }

    /// Clears history and leaves chat mode.
    ///
    /// An in-flight request keeps its `waiting_response` flag and still
    /// completes normally.
    pub fn reset(&self, user: &UserId) -> Result<ResetOutcome, LxbotError> {
        let mut users = self.lock();
        let Some(state) = users.get_mut(user) else {
            return Ok(ResetOutcome::NothingToReset);
        };
        if !state.has_conversation() {
            return Ok(ResetOutcome::NothingToReset);
        }

        let previous = state.clone();
        state.history.clear();
        state.chat_mode = false;
        self.commit(&mut users, user, previous)?;
        info!(user_id = %user, "conversation reset");
        Ok(ResetOutcome::Reset)
    }

    /// Number of users with a state record.
    pub fn user_count(&self) -> usize {
        self.lock().len()
    }

    fn request_messages(&self, history: &[ChatTurn]) -> Vec<ChatTurn> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if let Some(prompt) = &self.settings.system_prompt {
            messages.push(ChatTurn::system(prompt.clone()));
        }
        messages.extend(history.iter().cloned());
        messages
    }

    /// Persists `users`, restoring `user`'s `previous` state on failure.
    ///
    /// A failed write may have landed halfway, so the restored state is
    /// written back on a best-effort basis.
    fn commit(
        &self,
        users: &mut Users,
        user: &UserId,
        previous: UserConversationState,
    ) -> Result<(), LxbotError> {
        if let Err(e) = self.persist(users) {
            warn!(user_id = %user, error = %e, "persist failed; reverting in-memory change");
            users.insert(user.clone(), previous);
            if let Err(again) = self.persist(users) {
                debug!(user_id = %user, error = %again, "could not write back reverted state");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Persists a change that ends a request. Unlike [`commit`](Self::commit)
    /// nothing is reverted on failure.
    fn release(&self, users: &Users, user: &UserId) -> Result<(), LxbotError> {
        self.persist(users).inspect_err(|e| {
            warn!(user_id = %user, error = %e, "persist failed; in-memory state kept");
        })
    }

    /// Writes history before flags: a failure between the two leaves the
    /// old `chat_states`, whose `waiting_response` is cleared on reload.
    fn persist(&self, users: &Users) -> Result<(), LxbotError> {
        if self.settings.persist_history {
            let mut conversations = Map::new();
            for (user, state) in users.iter().filter(|(_, s)| !s.history.is_empty()) {
                let turns = serde_json::to_value(&state.history).map_err(LxbotError::storage)?;
                conversations.insert(user.to_string(), turns);
            }
            self.storage
                .set(CONVERSATIONS_KEY, &Value::Object(conversations))?;
        }

        let mut chat_states = Map::new();
        for (user, state) in users {
            let entry = serde_json::to_value(PersistedChatState::from_state(user, state))
                .map_err(LxbotError::storage)?;
            chat_states.insert(user.to_string(), entry);
        }
        self.storage
            .set(CHAT_STATES_KEY, &Value::Object(chat_states))
    }

    fn lock(&self) -> MutexGuard<'_, Users> {
        // A panic while holding the lock cannot leave a half-written record:
        // every mutation either commits or restores the previous value.
        self.users
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn load_chat_states(storage: &dyn KeyValueStore) -> Result<Users, LxbotError> {
    let mut users = Users::new();
    let Value::Object(entries) = storage.get_or(CHAT_STATES_KEY, Value::Object(Map::new()))? else {
        warn!(key = CHAT_STATES_KEY, "stored chat states are not an object; ignoring");
        return Ok(users);
    };

    for (user, entry) in entries {
        match serde_json::from_value::<PersistedChatState>(entry) {
            Ok(persisted) => {
                users.insert(
                    UserId::from(user),
                    UserConversationState {
                        chat_mode: persisted.chat_mode,
                        waiting_response: persisted.waiting_response,
                        message_count: persisted.message_count,
                        history: Vec::new(),
                    },
                );
            }
            Err(e) => warn!(user_id = %user, error = %e, "skipping unreadable chat state"),
        }
    }
    Ok(users)
}

fn load_histories(storage: &dyn KeyValueStore, users: &mut Users) -> Result<(), LxbotError> {
    let Value::Object(entries) = storage.get_or(CONVERSATIONS_KEY, Value::Object(Map::new()))?
    else {
        warn!(key = CONVERSATIONS_KEY, "stored conversations are not an object; ignoring");
        return Ok(());
    };

    for (user, turns) in entries {
        match serde_json::from_value::<Vec<ChatTurn>>(turns) {
            Ok(history) => {
                users.entry(UserId::from(user)).or_default().history = history;
            }
            Err(e) => warn!(user_id = %user, error = %e, "skipping unreadable history"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lxbot_core::BackendError;
    use lxbot_storage::MemoryStore;
    use serde_json::json;

    fn store_with(settings: ConversationSettings) -> (ConversationStore, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        let store = ConversationStore::open(storage.clone(), settings).unwrap();
        (store, storage)
    }

    fn store() -> ConversationStore {
        store_with(ConversationSettings::default()).0
    }

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    #[test]
    fn get_state_creates_default_and_is_idempotent() {
        let store = store();
        let u = user("a1");
        let first = store.get_state(&u);
        assert_eq!(first, UserConversationState::default());
        assert_eq!(store.get_state(&u), first);
        assert_eq!(store.user_count(), 1);
    }

    #[test]
    fn begin_then_success_records_both_turns() {
        let store = store();
        let u = user("a1");
        let messages = store.begin_chat(&u, "hi").unwrap();
        assert_eq!(messages, vec![ChatTurn::user("hi")]);
        assert!(store.get_state(&u).waiting_response);

        store
            .complete_chat(&u, &Ok(json!({"message": {"role": "assistant", "content": "hello"}})))
            .unwrap();
        let state = store.get_state(&u);
        assert_eq!(state.history, vec![ChatTurn::user("hi"), ChatTurn::assistant("hello")]);
        assert!(!state.waiting_response);
        assert!(state.chat_mode);
        assert_eq!(state.message_count, 1);
    }

    #[test]
    fn failure_rolls_back_user_turn() {
        let store = store();
        let u = user("a1");
        store.begin_chat(&u, "hi").unwrap();
        store
            .complete_chat(&u, &Err(BackendError::transport("boom")))
            .unwrap();
        let state = store.get_state(&u);
        assert!(state.history.is_empty());
        assert!(!state.waiting_response);
        assert_eq!(state.message_count, 1, "count is not decremented");
    }

    #[test]
    fn second_begin_while_waiting_is_rejected_without_mutation() {
        let store = store();
        let u = user("a1");
        store.begin_chat(&u, "first").unwrap();
        let before = store.get_state(&u);

        let err = store.begin_chat(&u, "second").unwrap_err();
        assert!(matches!(err, LxbotError::AlreadyWaiting { ref user } if user.as_str() == "a1"));
        assert_eq!(store.get_state(&u), before);
    }

    #[test]
    fn blank_content_is_rejected_without_mutation() {
        let store = store();
        let u = user("a1");
        assert!(matches!(store.begin_chat(&u, "  \n\t"), Err(LxbotError::EmptyInput)));
        let state = store.get_state(&u);
        assert!(!state.waiting_response);
        assert!(!state.chat_mode);
        assert!(state.history.is_empty());
    }

    #[test]
    fn system_prompt_is_prepended_but_not_stored() {
        let (store, _) = store_with(ConversationSettings {
            system_prompt: Some("Be brief.".into()),
            persist_history: false,
        });
        let u = user("a1");
        let messages = store.begin_chat(&u, "hi").unwrap();
        assert_eq!(messages, vec![ChatTurn::system("Be brief."), ChatTurn::user("hi")]);
        assert_eq!(store.get_state(&u).history, vec![ChatTurn::user("hi")]);
    }

    #[test]
    fn reset_clears_history_and_chat_mode() {
        let store = store();
        let u = user("a1");
        store.begin_chat(&u, "hi").unwrap();
        store.complete_chat(&u, &Ok(json!({"response": "yo"}))).unwrap();

        assert_eq!(store.reset(&u).unwrap(), ResetOutcome::Reset);
        let state = store.get_state(&u);
        assert!(state.history.is_empty());
        assert!(!state.chat_mode);
        assert_eq!(store.reset(&u).unwrap(), ResetOutcome::NothingToReset);
    }

    #[test]
    fn reset_unknown_user_reports_nothing() {
        let store = store();
        assert_eq!(store.reset(&user("nobody")).unwrap(), ResetOutcome::NothingToReset);
    }

    #[test]
    fn completion_after_mid_request_reset_leaves_history_alone() {
        let store = store();
        let u = user("a1");
        store.begin_chat(&u, "hi").unwrap();
        store.reset(&u).unwrap();
        assert!(store.get_state(&u).waiting_response, "reset keeps the in-flight flag");

        store.complete_chat(&u, &Ok(json!({"response": "late"}))).unwrap();
        let state = store.get_state(&u);
        assert!(state.history.is_empty());
        assert!(!state.waiting_response);
    }

    #[test]
    fn abort_behaves_like_failure() {
        let store = store();
        let u = user("a1");
        store.begin_chat(&u, "one").unwrap();
        store.complete_chat(&u, &Ok(json!({"response": "1"}))).unwrap();
        store.begin_chat(&u, "two").unwrap();
        store.abort_chat(&u).unwrap();
        let state = store.get_state(&u);
        assert_eq!(state.history, vec![ChatTurn::user("one"), ChatTurn::assistant("1")]);
        assert!(!state.waiting_response);
    }

    #[test]
    fn unexpected_response_shape_stores_placeholder() {
        let store = store();
        let u = user("a1");
        store.begin_chat(&u, "hi").unwrap();
        store.complete_chat(&u, &Ok(json!({"weird": true}))).unwrap();
        assert_eq!(
            store.get_state(&u).history[1],
            ChatTurn::assistant(lxbot_core::reply::UNEXPECTED_FORMAT)
        );
    }

    #[test]
    fn writes_through_chat_states_layout() {
        let (store, storage) = store_with(ConversationSettings::default());
        let u = user("ab12");
        store.begin_chat(&u, "hi").unwrap();
        assert_eq!(
            storage.get(CHAT_STATES_KEY).unwrap().unwrap(),
            json!({"ab12": {
                "chat_mode": true,
                "message_count": 1,
                "address": "ab12",
                "waiting_response": true
            }})
        );
        assert_eq!(storage.get(CONVERSATIONS_KEY).unwrap(), None);
    }

    #[test]
    fn history_persists_only_when_enabled() {
        let storage = Arc::new(MemoryStore::new());
        let settings = ConversationSettings {
            system_prompt: None,
            persist_history: true,
        };
        {
            let store = ConversationStore::open(storage.clone(), settings.clone()).unwrap();
            let u = user("a1");
            store.begin_chat(&u, "hi").unwrap();
            store.complete_chat(&u, &Ok(json!({"response": "hello"}))).unwrap();
        }
        assert_eq!(
            storage.get(CONVERSATIONS_KEY).unwrap().unwrap(),
            json!({"a1": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"}
            ]})
        );

        let reloaded = ConversationStore::open(storage.clone(), settings).unwrap();
        assert_eq!(reloaded.get_state(&user("a1")).history.len(), 2);

        let without = ConversationStore::open(storage, ConversationSettings::default()).unwrap();
        let state = without.get_state(&user("a1"));
        assert!(state.chat_mode);
        assert!(state.history.is_empty());
    }

    #[test]
    fn stale_waiting_flags_are_cleared_on_open() {
        let storage = Arc::new(MemoryStore::new());
        storage
            .set(
                CHAT_STATES_KEY,
                &json!({"a1": {"chat_mode": true, "message_count": 4, "address": "a1", "waiting_response": true}}),
            )
            .unwrap();

        let store = ConversationStore::open(storage.clone(), ConversationSettings::default()).unwrap();
        let state = store.get_state(&user("a1"));
        assert!(!state.waiting_response);
        assert_eq!(state.message_count, 4);
        assert_eq!(
            storage.get(CHAT_STATES_KEY).unwrap().unwrap()["a1"]["waiting_response"],
            false
        );
        assert!(store.begin_chat(&user("a1"), "again").is_ok());
    }

    #[test]
    fn unreadable_entries_are_skipped() {
        let storage = Arc::new(MemoryStore::new());
        storage
            .set(CHAT_STATES_KEY, &json!({"good": {"chat_mode": true}, "bad": 42}))
            .unwrap();
        let store = ConversationStore::open(storage, ConversationSettings::default()).unwrap();
        assert_eq!(store.user_count(), 1);
        assert!(store.get_state(&user("good")).chat_mode);
    }

    #[test]
    fn settings_from_chat_config() {
        let config = ChatConfig {
            system_prompt: Some("  ".into()),
            persist_history: true,
        };
        let settings = ConversationSettings::from(&config);
        assert_eq!(settings.system_prompt, None);
        assert!(settings.persist_history);
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<Value>, LxbotError> {
            Ok(None)
        }
        fn set(&self, _key: &str, _value: &Value) -> Result<(), LxbotError> {
            Err(LxbotError::storage(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn failed_write_reverts_in_memory_state() {
        let store =
            ConversationStore::open(Arc::new(FailingStore), ConversationSettings::default()).unwrap();
        let u = user("a1");
        let err = store.begin_chat(&u, "hi").unwrap_err();
        assert!(matches!(err, LxbotError::Storage { .. }));
        let state = store.get_state(&u);
        assert!(!state.waiting_response);
        assert!(state.history.is_empty());
    }

    /// Accepts writes until `fail` is switched on, then rejects writes to
    /// `only_key` (or to every key when unset).
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail: std::sync::atomic::AtomicBool,
        only_key: Option<&'static str>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<Value>, LxbotError> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &Value) -> Result<(), LxbotError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst)
                && self.only_key.is_none_or(|k| k == key)
            {
                return Err(LxbotError::storage(std::io::Error::other("disk full")));
            }
            self.inner.set(key, value)
        }
    }

    #[test]
    fn half_applied_write_is_rolled_back_in_storage() {
        let backing = Arc::new(FlakyStore {
            only_key: Some(CHAT_STATES_KEY),
            ..Default::default()
        });
        let settings = ConversationSettings {
            system_prompt: None,
            persist_history: true,
        };
        let store = ConversationStore::open(backing.clone(), settings).unwrap();
        let u = user("a1");
        store.begin_chat(&u, "hi").unwrap();
        store
            .complete_chat(&u, &Ok(json!({"response": "hello"})))
            .unwrap();

        // History is written, then the flags write fails.
        backing.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(store.begin_chat(&u, "again").is_err());

        assert_eq!(
            backing.get(CONVERSATIONS_KEY).unwrap().unwrap(),
            json!({"a1": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"}
            ]})
        );
        assert_eq!(
            backing.get(CHAT_STATES_KEY).unwrap().unwrap()["a1"]["message_count"],
            json!(1)
        );
    }

    #[test]
    fn failed_history_write_leaves_flags_untouched() {
        let backing = Arc::new(FlakyStore {
            only_key: Some(CONVERSATIONS_KEY),
            ..Default::default()
        });
        let settings = ConversationSettings {
            system_prompt: None,
            persist_history: true,
        };
        let store = ConversationStore::open(backing.clone(), settings).unwrap();
        backing.fail.store(true, std::sync::atomic::Ordering::SeqCst);

        assert!(store.begin_chat(&user("a1"), "hi").is_err());
        assert_eq!(backing.get(CHAT_STATES_KEY).unwrap(), None);
        assert!(!store.in_chat_mode(&user("a1")));
    }

    #[test]
    fn chat_mode_lookup_never_creates_a_record() {
        let (store, storage) = store_with(ConversationSettings::default());
        for id in ["q1", "q2", "q3"] {
            assert!(!store.in_chat_mode(&user(id)));
        }
        assert_eq!(store.user_count(), 0);

        store.begin_chat(&user("chatter"), "hi").unwrap();
        assert!(store.in_chat_mode(&user("chatter")));
        let states = storage.get(CHAT_STATES_KEY).unwrap().unwrap();
        let keys: Vec<&str> = states
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["chatter"]);
    }

    #[test]
    fn concurrent_begin_chat_admits_exactly_one() {
        const THREADS: usize = 8;
        for _ in 0..50 {
            let store = store();
            let u = user("a1");
            let barrier = std::sync::Barrier::new(THREADS);

            let accepted = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..THREADS)
                    .map(|i| {
                        let (store, u, barrier) = (&store, &u, &barrier);
                        scope.spawn(move || {
                            barrier.wait();
                            store.begin_chat(u, &format!("msg {i}"))
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap())
                    .filter(|r| match r {
                        Ok(_) => true,
                        Err(LxbotError::AlreadyWaiting { .. }) => false,
                        Err(e) => panic!("unexpected error: {e}"),
                    })
                    .count()
            });

            assert_eq!(accepted, 1);
            let state = store.get_state(&u);
            assert_eq!(state.history.len(), 1);
            assert_eq!(state.message_count, 1);
            assert!(state.waiting_response);
        }
    }

    #[test]
    fn failed_write_on_completion_still_releases_user() {
        let backing = Arc::new(FlakyStore::default());
        let store = ConversationStore::open(backing.clone(), ConversationSettings::default()).unwrap();
        let u = user("a1");
        store.begin_chat(&u, "hi").unwrap();

        backing.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        let err = store
            .complete_chat(&u, &Ok(json!({"response": "hello"})))
            .unwrap_err();
        assert!(matches!(err, LxbotError::Storage { .. }));

        let state = store.get_state(&u);
        assert!(!state.waiting_response);
        assert_eq!(state.history.len(), 2);
    }

    proptest::proptest! {
        /// However begin/complete/reset interleave, a completed user never
        /// stays waiting and history never ends with two user turns.
        #[test]
        fn history_stays_well_formed(ops in proptest::collection::vec(0u8..4, 1..40)) {
            let store = store();
            let u = user("p");
            for op in ops {
                match op {
                    0 => { let _ = store.begin_chat(&u, "q"); }
                    1 => store.complete_chat(&u, &Ok(json!({"response": "a"}))).unwrap(),
                    2 => store.complete_chat(&u, &Err(BackendError::transport("x"))).unwrap(),
                    _ => { store.reset(&u).unwrap(); }
                }
                let state = store.get_state(&u);
                let doubled = state.history.windows(2).any(|w| w[0].role == Role::User && w[1].role == Role::User);
                proptest::prop_assert!(!doubled);
                if let Some(last) = state.history.last() {
                    if last.role == Role::User {
                        proptest::prop_assert!(state.waiting_response);
                    }
                }
            }
        }
    }
}
