// イベントディスパッチャー
//
// モデルのライフサイクルイベントをリスナーへ配送します。
// リスナーは優先度の高い順、同じ優先度では登録順に呼ばれます。

use crate::core::event::{ModelEvent, ModelEventKind};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

/// イベントリスナー
pub type Listener = Arc<dyn Fn(&ModelEvent<'_>) + Send + Sync>;

struct Registration {
    priority: i32,
    sequence: u64,
    listener: Listener,
}

/// イベントディスパッチャー
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<HashMap<ModelEventKind, Vec<Registration>>>,
    sequence: std::sync::atomic::AtomicU64,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&ModelEventKind, usize> =
            listeners.iter().map(|(k, v)| (k, v.len())).collect();
        f.debug_struct("EventDispatcher")
            .field("listeners", &counts)
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// リスナーを登録
    ///
    /// # Arguments
    ///
    /// * `kind` - 対象イベント
    /// * `priority` - 優先度（大きいほど先に呼ばれる）
    /// * `listener` - リスナー
    pub fn add_listener<F>(&self, kind: ModelEventKind, priority: i32, listener: F)
    where
        F: Fn(&ModelEvent<'_>) + Send + Sync + 'static,
    {
        let sequence = self
            .sequence
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let registrations = listeners.entry(kind).or_default();
        registrations.push(Registration {
            priority,
            sequence,
            listener: Arc::new(listener),
        });
        registrations.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.sequence.cmp(&b.sequence))
        });
    }

    /// リスナーが登録されているか確認
    pub fn has_listeners(&self, kind: ModelEventKind) -> bool {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .is_some_and(|l| !l.is_empty())
    }

    /// イベントを配送
    ///
    /// リスナーの呼び出し中はロックを保持しないため、リスナーから登録を追加できます。
    pub fn dispatch(&self, event: &ModelEvent<'_>) {
        let listeners: Vec<Listener> = match self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.kind)
        {
            Some(registrations) => registrations.iter().map(|r| r.listener.clone()).collect(),
            None => return,
        };

        trace!(event = %event.kind, model = %event.model_name, listeners = listeners.len(), "Dispatching event");
        for listener in listeners {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_dispatch_order() {
        let dispatcher = EventDispatcher::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for (name, priority) in [("low", -10), ("first", 0), ("high", 10), ("second", 0)] {
            let calls = calls.clone();
            dispatcher.add_listener(ModelEventKind::BeforeSave, priority, move |_| {
                calls.lock().unwrap().push(name);
            });
        }

        dispatcher.dispatch(&ModelEvent::new(ModelEventKind::BeforeSave, "Node"));
        assert_eq!(*calls.lock().unwrap(), vec!["high", "first", "second", "low"]);
    }

    #[test]
    fn test_has_listeners() {
        let dispatcher = EventDispatcher::new();
        assert!(!dispatcher.has_listeners(ModelEventKind::Load));

        dispatcher.add_listener(ModelEventKind::Load, 0, |_| {});
        assert!(dispatcher.has_listeners(ModelEventKind::Load));
        assert!(!dispatcher.has_listeners(ModelEventKind::BeforeLoad));
    }

    #[test]
    fn test_listener_receives_event() {
        let dispatcher = EventDispatcher::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        dispatcher.add_listener(ModelEventKind::Delete, 0, move |event| {
            *sink.lock().unwrap() = Some(event.model_name.to_string());
        });

        dispatcher.dispatch(&ModelEvent::new(ModelEventKind::Delete, "Tag"));
        assert_eq!(seen.lock().unwrap().as_deref(), Some("Tag"));
    }
}
