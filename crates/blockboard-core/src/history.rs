//! Keyboard-bindable command registry with a linear undo/redo history.
//!
//! Every registered command produces an [`Execution`] (an undo/redo pair)
//! when dispatched. Commands that follow the queue have their pair appended
//! to the history and `current` points at the last applied entry, starting
//! at -1 for an empty history. Undo applies `queue[current]` and moves the
//! cursor down; redo re-applies `queue[current + 1]` and moves it up.

use crate::input::{Chord, KeyEvent, KeyOutcome};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

/// Name of the built-in undo command.
pub const UNDO: &str = "undo";
/// Name of the built-in redo command.
pub const REDO: &str = "redo";

/// A state change applied to the command context.
pub type Action<C> = Box<dyn Fn(&mut C)>;

/// Cleanup returned by [`Command::init`], run when the manager is disposed.
pub type Teardown<C> = Box<dyn FnOnce(&mut C)>;

/// The undo/redo pair produced by executing a command.
pub struct Execution<C> {
    pub undo: Option<Action<C>>,
    pub redo: Action<C>,
}

impl<C> Execution<C> {
    /// An execution that cannot be undone.
    pub fn new(redo: impl Fn(&mut C) + 'static) -> Self {
        Self {
            undo: None,
            redo: Box::new(redo),
        }
    }

    /// An execution with both directions.
    pub fn reversible(undo: impl Fn(&mut C) + 'static, redo: impl Fn(&mut C) + 'static) -> Self {
        Self {
            undo: Some(Box::new(undo)),
            redo: Box::new(redo),
        }
    }
}

impl<C> fmt::Debug for Execution<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Execution")
            .field("undo", &self.undo.is_some())
            .finish_non_exhaustive()
    }
}

/// A named operation that can be registered with a [`CommandManager`].
///
/// `C` is the context undo/redo actions operate on, `P` the payload passed
/// on dispatch. Per-command state lives in the implementing type.
pub trait Command<C, P> {
    /// Unique name. The first registration of a name wins.
    fn name(&self) -> &str;

    /// Key bindings, e.g. `["delete", "ctrl + d"]`.
    fn keyboard(&self) -> &[&'static str] {
        &[]
    }

    /// Whether executions are recorded in the history.
    fn follow_queue(&self) -> bool {
        true
    }

    /// Called once at registration. `trigger` lets the command request its
    /// own dispatch from event listeners.
    fn init(&mut self, _ctx: &mut C, _trigger: &Trigger) -> Option<Teardown<C>> {
        None
    }

    /// Produce the undo/redo pair. The manager runs `redo` immediately.
    fn execute(&mut self, ctx: &mut C, payload: P) -> Execution<C>;
}

/// Queue of dispatch requests made from outside the manager.
///
/// Event listeners can't reach the manager that owns them, so they ask
/// through a trigger and the manager drains the requests in
/// [`CommandManager::run_pending`].
#[derive(Debug, Clone, Default)]
pub struct Trigger {
    pending: Rc<RefCell<VecDeque<String>>>,
}

impl Trigger {
    /// Ask for `name` to be dispatched.
    pub fn request(&self, name: &str) {
        self.pending.borrow_mut().push_back(name.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    fn take_next(&self) -> Option<String> {
        self.pending.borrow_mut().pop_front()
    }
}

enum Registered<C, P> {
    Undo,
    Redo,
    Custom(Box<dyn Command<C, P>>),
}

struct Entry<C, P> {
    name: String,
    keyboard: Vec<Chord>,
    kind: Registered<C, P>,
}

/// Command registry, history queue and keyboard dispatcher.
pub struct CommandManager<C, P = ()> {
    commands: Vec<Entry<C, P>>,
    index: HashMap<String, usize>,
    queue: Vec<Execution<C>>,
    current: isize,
    teardowns: Vec<Teardown<C>>,
    listening: bool,
    trigger: Trigger,
}

impl<C, P> CommandManager<C, P> {
    /// Create a manager with the built-in `undo` (`ctrl+z`) and `redo`
    /// (`ctrl+shift+z`) commands registered.
    pub fn new() -> Self {
        let mut manager = Self {
            commands: Vec::new(),
            index: HashMap::new(),
            queue: Vec::new(),
            current: -1,
            teardowns: Vec::new(),
            listening: false,
            trigger: Trigger::default(),
        };
        manager.insert(UNDO, &["ctrl+z"], Registered::Undo);
        manager.insert(REDO, &["ctrl+shift+z"], Registered::Redo);
        manager
    }

    fn insert(&mut self, name: &str, bindings: &[&str], kind: Registered<C, P>) {
        let keyboard = bindings
            .iter()
            .filter_map(|binding| {
                let chord = Chord::parse(binding);
                if chord.is_none() {
                    log::warn!("Ignoring key binding without a key: {:?}", binding);
                }
                chord
            })
            .collect();
        self.index.insert(name.to_string(), self.commands.len());
        self.commands.push(Entry {
            name: name.to_string(),
            keyboard,
            kind,
        });
    }

    /// Register a command. Re-registering a name is ignored.
    /// Returns true if the command was added.
    pub fn register(&mut self, mut command: Box<dyn Command<C, P>>, ctx: &mut C) -> bool {
        let name = command.name().to_string();
        if self.index.contains_key(&name) {
            log::debug!("Command already registered: {}", name);
            return false;
        }
        if let Some(teardown) = command.init(ctx, &self.trigger) {
            self.teardowns.push(teardown);
        }
        let bindings = command.keyboard().to_vec();
        self.insert(&name, &bindings, Registered::Custom(command));
        true
    }

    /// Run a command by name. Returns false for unknown names.
    pub fn dispatch(&mut self, name: &str, ctx: &mut C, payload: P) -> bool {
        let Some(&idx) = self.index.get(name) else {
            log::debug!("Unknown command: {}", name);
            return false;
        };
        match self.commands[idx].kind {
            Registered::Undo => {
                self.undo(ctx);
            }
            Registered::Redo => {
                self.redo(ctx);
            }
            Registered::Custom(_) => self.run_custom(idx, ctx, payload),
        }
        true
    }

    fn run_custom(&mut self, idx: usize, ctx: &mut C, payload: P) {
        let Registered::Custom(command) = &mut self.commands[idx].kind else {
            return;
        };
        let follow_queue = command.follow_queue();
        let execution = command.execute(ctx, payload);

        if !follow_queue {
            (execution.redo)(ctx);
            return;
        }

        // A new entry replaces whatever was undone past the cursor
        self.queue.truncate((self.current + 1) as usize);
        self.queue.push(execution);
        self.current += 1;
        log::debug!(
            "Recorded {} (cursor {}/{})",
            self.commands[idx].name,
            self.current,
            self.queue.len()
        );
        (self.queue[self.current as usize].redo)(ctx);
    }

    /// Undo the entry at the cursor. No-op on an empty history.
    /// Returns true if the cursor moved.
    pub fn undo(&mut self, ctx: &mut C) -> bool {
        if self.current < 0 {
            log::debug!("Nothing to undo");
            return false;
        }
        if let Some(undo) = &self.queue[self.current as usize].undo {
            undo(ctx);
        }
        self.current -= 1;
        true
    }

    /// Re-apply the entry after the cursor. No-op at the end of the history.
    /// Returns true if the cursor moved.
    pub fn redo(&mut self, ctx: &mut C) -> bool {
        let next = (self.current + 1) as usize;
        let Some(entry) = self.queue.get(next) else {
            log::debug!("Nothing to redo");
            return false;
        };
        (entry.redo)(ctx);
        self.current += 1;
        true
    }

    /// Index of the last applied entry, -1 when none.
    pub fn current(&self) -> isize {
        self.current
    }

    pub fn history_len(&self) -> usize {
        self.queue.len()
    }

    pub fn can_undo(&self) -> bool {
        self.current >= 0
    }

    pub fn can_redo(&self) -> bool {
        ((self.current + 1) as usize) < self.queue.len()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered command names in registration order.
    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|entry| entry.name.as_str())
    }

    /// Display strings of a command's bindings, e.g. `["Ctrl+Z"]`.
    pub fn bindings(&self, name: &str) -> Vec<String> {
        self.index
            .get(name)
            .map(|&idx| self.commands[idx].keyboard.iter().map(Chord::format).collect())
            .unwrap_or_default()
    }

    /// Handle for requesting dispatches from outside the manager.
    pub fn trigger(&self) -> Trigger {
        self.trigger.clone()
    }

    /// Start listening for key events. Returns false if already listening.
    pub fn init(&mut self) -> bool {
        if self.listening {
            return false;
        }
        self.listening = true;
        true
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Stop listening and run every command's teardown.
    pub fn dispose(&mut self, ctx: &mut C) {
        self.listening = false;
        for teardown in self.teardowns.drain(..) {
            teardown(ctx);
        }
    }
}

impl<C, P: Default> CommandManager<C, P> {
    /// Dispatch every command bound to the event's chord.
    pub fn handle_key(&mut self, ctx: &mut C, event: &KeyEvent) -> KeyOutcome {
        if !self.listening {
            return KeyOutcome::Ignored;
        }
        let chord = Chord::from_event(event);
        let matched: Vec<String> = self
            .commands
            .iter()
            .filter(|entry| entry.keyboard.contains(&chord))
            .map(|entry| entry.name.clone())
            .collect();
        if matched.is_empty() {
            return KeyOutcome::Ignored;
        }
        for name in matched {
            log::debug!("Key {} -> {}", chord, name);
            self.dispatch(&name, ctx, P::default());
        }
        self.run_pending(ctx);
        KeyOutcome::Handled
    }

    /// Dispatch requests queued through [`Trigger`], in order.
    /// Returns the number of requests processed.
    pub fn run_pending(&mut self, ctx: &mut C) -> usize {
        let mut count = 0;
        while let Some(name) = self.trigger.take_next() {
            self.dispatch(&name, ctx, P::default());
            count += 1;
        }
        count
    }
}

impl<C, P> Default for CommandManager<C, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, P> fmt::Debug for CommandManager<C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandManager")
            .field("commands", &self.command_names().collect::<Vec<_>>())
            .field("current", &self.current)
            .field("history_len", &self.queue.len())
            .field("listening", &self.listening)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;
    use crate::test_support::init_logging;
    use std::cell::Cell;

    /// Appends its payload; undo pops it.
    struct Push;

    impl Command<Vec<i32>, i32> for Push {
        fn name(&self) -> &str {
            "push"
        }

        fn keyboard(&self) -> &[&'static str] {
            &["ctrl + p"]
        }

        fn execute(&mut self, _ctx: &mut Vec<i32>, payload: i32) -> Execution<Vec<i32>> {
            Execution::reversible(
                |v: &mut Vec<i32>| {
                    v.pop();
                },
                move |v: &mut Vec<i32>| v.push(payload),
            )
        }
    }

    /// Same name as `Push`, different behavior.
    struct Impostor;

    impl Command<Vec<i32>, i32> for Impostor {
        fn name(&self) -> &str {
            "push"
        }

        fn keyboard(&self) -> &[&'static str] {
            &["ctrl + i"]
        }

        fn execute(&mut self, _ctx: &mut Vec<i32>, _payload: i32) -> Execution<Vec<i32>> {
            Execution::new(|v: &mut Vec<i32>| v.clear())
        }
    }

    /// Not recorded in history.
    struct Log;

    impl Command<Vec<i32>, i32> for Log {
        fn name(&self) -> &str {
            "log"
        }

        fn follow_queue(&self) -> bool {
            false
        }

        fn execute(&mut self, _ctx: &mut Vec<i32>, payload: i32) -> Execution<Vec<i32>> {
            Execution::new(move |v: &mut Vec<i32>| v.push(payload * 100))
        }
    }

    /// Tracks init/teardown calls.
    struct Lifecycle {
        inits: Rc<Cell<u32>>,
        teardowns: Rc<Cell<u32>>,
    }

    impl Command<Vec<i32>, i32> for Lifecycle {
        fn name(&self) -> &str {
            "lifecycle"
        }

        fn init(&mut self, _ctx: &mut Vec<i32>, _trigger: &Trigger) -> Option<Teardown<Vec<i32>>> {
            self.inits.set(self.inits.get() + 1);
            let teardowns = Rc::clone(&self.teardowns);
            Some(Box::new(move |_: &mut Vec<i32>| {
                teardowns.set(teardowns.get() + 1)
            }))
        }

        fn execute(&mut self, _ctx: &mut Vec<i32>, _payload: i32) -> Execution<Vec<i32>> {
            Execution::new(|_: &mut Vec<i32>| {})
        }
    }

    fn manager() -> (CommandManager<Vec<i32>, i32>, Vec<i32>) {
        init_logging();
        let mut ctx = Vec::new();
        let mut manager = CommandManager::new();
        manager.register(Box::new(Push), &mut ctx);
        manager.register(Box::new(Log), &mut ctx);
        (manager, ctx)
    }

    #[test]
    fn test_dispatch_runs_redo_and_records() {
        let (mut manager, mut ctx) = manager();
        assert_eq!(manager.current(), -1);

        assert!(manager.dispatch("push", &mut ctx, 1));
        assert_eq!(ctx, vec![1]);
        assert_eq!(manager.current(), 0);
        assert_eq!(manager.history_len(), 1);
    }

    #[test]
    fn test_unknown_command_is_ignored() {
        let (mut manager, mut ctx) = manager();
        assert!(!manager.dispatch("nope", &mut ctx, 1));
        assert!(ctx.is_empty());
        assert_eq!(manager.history_len(), 0);
    }

    #[test]
    fn test_follow_queue_false_skips_history() {
        let (mut manager, mut ctx) = manager();
        manager.dispatch("log", &mut ctx, 2);
        assert_eq!(ctx, vec![200]);
        assert_eq!(manager.history_len(), 0);
        assert_eq!(manager.current(), -1);
    }

    #[test]
    fn test_k_dispatches_then_k_undos_round_trip() {
        let (mut manager, mut ctx) = manager();
        let before = ctx.clone();
        for k in 1..=5 {
            manager.dispatch("push", &mut ctx, k);
        }
        for _ in 0..5 {
            assert!(manager.undo(&mut ctx));
        }
        assert_eq!(ctx, before);
        assert_eq!(manager.current(), -1);
    }

    #[test]
    fn test_redo_after_undo_restores_state() {
        let (mut manager, mut ctx) = manager();
        for k in 1..=3 {
            manager.dispatch("push", &mut ctx, k);
        }
        // Exercise the inverse pair at every cursor position
        for _ in 0..3 {
            let state = ctx.clone();
            let cursor = manager.current();
            manager.undo(&mut ctx);
            manager.redo(&mut ctx);
            assert_eq!(ctx, state);
            assert_eq!(manager.current(), cursor);
            manager.undo(&mut ctx);
        }
        assert_eq!(manager.current(), -1);
    }

    #[test]
    fn test_undo_at_start_is_noop() {
        let (mut manager, mut ctx) = manager();
        assert!(!manager.undo(&mut ctx));
        assert_eq!(manager.current(), -1);
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_redo_at_end_is_noop() {
        let (mut manager, mut ctx) = manager();
        // Empty history
        assert!(!manager.redo(&mut ctx));

        manager.dispatch("push", &mut ctx, 1);
        assert_eq!(manager.current(), 0);
        // current + 1 == len
        assert!(!manager.redo(&mut ctx));
        assert_eq!(manager.current(), 0);
        assert_eq!(ctx, vec![1]);
    }

    #[test]
    fn test_builtins_dispatch_by_name() {
        let (mut manager, mut ctx) = manager();
        manager.dispatch("push", &mut ctx, 1);
        assert!(manager.dispatch(UNDO, &mut ctx, 0));
        assert!(ctx.is_empty());
        assert!(manager.dispatch(REDO, &mut ctx, 0));
        assert_eq!(ctx, vec![1]);
        // Undo/redo themselves never enter the history
        assert_eq!(manager.history_len(), 1);
    }

    #[test]
    fn test_new_dispatch_discards_undone_tail() {
        let (mut manager, mut ctx) = manager();
        manager.dispatch("push", &mut ctx, 1);
        manager.dispatch("push", &mut ctx, 2);
        manager.undo(&mut ctx);
        manager.dispatch("push", &mut ctx, 3);

        assert_eq!(ctx, vec![1, 3]);
        assert_eq!(manager.history_len(), 2);
        assert!(!manager.can_redo());

        manager.undo(&mut ctx);
        assert_eq!(ctx, vec![1]);
    }

    #[test]
    fn test_missing_undo_only_moves_cursor() {
        struct Forward;
        impl Command<Vec<i32>, i32> for Forward {
            fn name(&self) -> &str {
                "forward"
            }
            fn execute(&mut self, _ctx: &mut Vec<i32>, _payload: i32) -> Execution<Vec<i32>> {
                Execution::new(|v: &mut Vec<i32>| v.push(9))
            }
        }

        let (mut manager, mut ctx) = manager();
        manager.register(Box::new(Forward), &mut ctx);
        manager.dispatch("forward", &mut ctx, 0);
        assert!(manager.undo(&mut ctx));
        assert_eq!(ctx, vec![9]);
        assert_eq!(manager.current(), -1);
    }

    #[test]
    fn test_duplicate_registration_is_ignored() {
        let (mut manager, mut ctx) = manager();
        manager.init();
        assert!(!manager.register(Box::new(Impostor), &mut ctx));

        manager.dispatch("push", &mut ctx, 4);
        assert_eq!(ctx, vec![4]);

        // Only the first registration's binding is live
        let outcome = manager.handle_key(&mut ctx, &KeyEvent::new("i", Modifiers::CTRL));
        assert_eq!(outcome, KeyOutcome::Ignored);
        assert_eq!(manager.bindings("push"), vec!["Ctrl+P".to_string()]);
    }

    #[test]
    fn test_keyboard_dispatch() {
        let (mut manager, mut ctx) = manager();

        // Not listening yet
        let event = KeyEvent::new("p", Modifiers::CTRL);
        assert_eq!(manager.handle_key(&mut ctx, &event), KeyOutcome::Ignored);

        assert!(manager.init());
        assert!(!manager.init());
        assert_eq!(manager.handle_key(&mut ctx, &event), KeyOutcome::Handled);
        assert_eq!(ctx, vec![0]);

        let undo = KeyEvent::new(
            "Z",
            Modifiers {
                meta: true,
                ..Modifiers::NONE
            },
        );
        assert_eq!(manager.handle_key(&mut ctx, &undo), KeyOutcome::Handled);
        assert!(ctx.is_empty());

        let redo = KeyEvent::new(
            "z",
            Modifiers {
                ctrl: true,
                shift: true,
                ..Modifiers::NONE
            },
        );
        assert_eq!(manager.handle_key(&mut ctx, &redo), KeyOutcome::Handled);
        assert_eq!(ctx, vec![0]);

        let plain = KeyEvent::new("p", Modifiers::NONE);
        assert_eq!(manager.handle_key(&mut ctx, &plain), KeyOutcome::Ignored);
    }

    #[test]
    fn test_init_and_dispose_lifecycle() {
        let (mut manager, mut ctx) = manager();
        let inits = Rc::new(Cell::new(0));
        let teardowns = Rc::new(Cell::new(0));
        let command = Lifecycle {
            inits: Rc::clone(&inits),
            teardowns: Rc::clone(&teardowns),
        };
        manager.register(Box::new(command), &mut ctx);
        assert_eq!(inits.get(), 1);
        assert_eq!(teardowns.get(), 0);

        manager.init();
        manager.dispose(&mut ctx);
        assert_eq!(teardowns.get(), 1);
        assert!(!manager.is_listening());

        // Teardowns run once
        manager.dispose(&mut ctx);
        assert_eq!(teardowns.get(), 1);

        let event = KeyEvent::new("p", Modifiers::CTRL);
        assert_eq!(manager.handle_key(&mut ctx, &event), KeyOutcome::Ignored);
    }

    #[test]
    fn test_trigger_requests_run_in_order() {
        let (mut manager, mut ctx) = manager();
        let trigger = manager.trigger();
        trigger.request("push");
        trigger.request("log");
        trigger.request("missing");
        assert!(!trigger.is_empty());

        assert_eq!(manager.run_pending(&mut ctx), 3);
        assert_eq!(ctx, vec![0, 0]);
        assert!(trigger.is_empty());
        assert_eq!(manager.history_len(), 1);
    }

    #[test]
    fn test_command_names_in_registration_order() {
        let (manager, _ctx) = manager();
        let names: Vec<&str> = manager.command_names().collect();
        assert_eq!(names, vec![UNDO, REDO, "push", "log"]);
    }
}
