//! Observable Value Cell - shared значение + синхронные уведомления
//!
//! Архитектура:
//! - `ObservableValue<T>` = handle, clone шарит ту же ячейку (DI вместо глобальных ссылок)
//! - `set()` уведомляет подписчиков ТОЛЬКО если новое значение != текущему
//! - Fan-out синхронный, в порядке регистрации, на вызывающем потоке
//! - Lock НЕ держится во время вызова handler'ов: handler может писать в другие
//!   ячейки (depth-first цепочка) или читать текущую через `get()`
//! - Циклы (A → B → A) на совести вызывающего, детекта нет
//!
//! Single-writer per cell - конвенция, не enforced.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Handler изменения значения
pub type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// ID подписки внутри одной ячейки (монотонный, не переиспользуется)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct CellState<T> {
    value: T,
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Handler<T>)>,
}

/// Observable ячейка
///
/// Инвариант: уведомление ⇔ `new != previous` (PartialEq).
/// NaN != NaN, поэтому повторный `set(NaN)` уведомляет каждый раз.
pub struct ObservableValue<T> {
    state: Arc<Mutex<CellState<T>>>,
}

impl<T> Clone for ObservableValue<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> ObservableValue<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(value: T) -> Self {
        Self {
            state: Arc::new(Mutex::new(CellState {
                value,
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    pub fn get(&self) -> T {
        self.state.lock().value.clone()
    }

    /// Записать значение. Возвращает `true` если значение изменилось
    /// (и подписчики были уведомлены).
    pub fn set(&self, value: T) -> bool {
        // Snapshot подписчиков под lock'ом, вызовы - без lock'а
        let handlers: Vec<(SubscriptionId, Handler<T>)> = {
            let mut state = self.state.lock();
            if state.value == value {
                return false;
            }
            state.value = value.clone();
            state
                .subscribers
                .iter()
                .map(|(id, handler)| (*id, Arc::clone(handler)))
                .collect()
        };

        for (id, handler) in handlers {
            // Отписан предыдущим handler'ом в этом же fan-out → не вызываем
            if !self.is_subscribed(id) {
                continue;
            }
            handler(&value);
        }

        true
    }

    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let mut state = self.state.lock();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        state.subscribers.push((id, Arc::new(handler)));
        id
    }

    /// Отписка. Повторный вызов - no-op (`false`).
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.lock();
        let before = state.subscribers.len();
        state.subscribers.retain(|(existing, _)| *existing != id);
        state.subscribers.len() != before
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.state
            .lock()
            .subscribers
            .iter()
            .any(|(existing, _)| *existing == id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    /// Два handle'а указывают на одну ячейку
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl<T> Default for ObservableValue<T>
where
    T: Default + Clone + PartialEq + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ObservableValue")
            .field("value", &state.value)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&i32) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        (count, move |_: &i32| {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_equal_set_notifies_once() {
        let cell = ObservableValue::new(0);
        let (count, handler) = counter();
        cell.subscribe(handler);

        assert!(cell.set(7));
        assert!(!cell.set(7)); // Тот же value → no-op
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(cell.get(), 7);
    }

    #[test]
    fn test_set_to_initial_value_is_noop() {
        let cell = ObservableValue::new(false);
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        cell.subscribe(move |_: &bool| {
            handle.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!cell.set(false));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_registration_order() {
        let cell = ObservableValue::new(0);
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let log = Arc::clone(&log);
            cell.subscribe(move |value: &i32| log.lock().push(format!("{}{}", tag, value)));
        }

        cell.set(1);
        assert_eq!(*log.lock(), vec!["a1", "b1", "c1"]);
    }

    #[test]
    fn test_unsubscribe_twice_is_noop() {
        let cell = ObservableValue::new(0);
        let (count, handler) = counter();
        let id = cell.subscribe(handler);

        assert!(cell.unsubscribe(id));
        assert!(!cell.unsubscribe(id));
        assert_eq!(cell.subscriber_count(), 0);

        cell.set(3);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handler_unsubscribed_mid_fanout_is_skipped() {
        let cell = ObservableValue::new(0);
        let (count, handler) = counter();

        // Первый handler отписывает второй во время того же fan-out
        let victim: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let victim_slot = Arc::clone(&victim);
        let cell_handle = cell.clone();
        cell.subscribe(move |_| {
            if let Some(id) = *victim_slot.lock() {
                cell_handle.unsubscribe(id);
            }
        });
        *victim.lock() = Some(cell.subscribe(handler));

        cell.set(1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reentrant_chain_is_depth_first() {
        let a = ObservableValue::new(0);
        let b = ObservableValue::new(0);
        let log = Arc::new(Mutex::new(Vec::new()));

        {
            let b = b.clone();
            let log = Arc::clone(&log);
            a.subscribe(move |value: &i32| {
                log.lock().push("a1");
                b.set(*value * 10);
            });
        }
        {
            let log = Arc::clone(&log);
            a.subscribe(move |_: &i32| log.lock().push("a2"));
        }
        {
            let log = Arc::clone(&log);
            b.subscribe(move |_: &i32| log.lock().push("b1"));
        }

        a.set(2);
        assert_eq!(*log.lock(), vec!["a1", "b1", "a2"]);
        assert_eq!(b.get(), 20);
    }

    #[test]
    fn test_handler_sees_new_value_via_get() {
        let cell = ObservableValue::new(1);
        let seen = Arc::new(Mutex::new(None));
        {
            let cell_handle = cell.clone();
            let seen = Arc::clone(&seen);
            cell.subscribe(move |_: &i32| *seen.lock() = Some(cell_handle.get()));
        }

        cell.set(5);
        assert_eq!(*seen.lock(), Some(5));
    }

    #[test]
    fn test_nan_always_notifies() {
        let cell = ObservableValue::new(0.0_f32);
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        cell.subscribe(move |_: &f32| {
            handle.fetch_add(1, Ordering::SeqCst);
        });

        cell.set(f32::NAN);
        cell.set(f32::NAN);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clones_share_cell() {
        let cell = ObservableValue::new(1);
        let other = cell.clone();
        other.set(9);

        assert_eq!(cell.get(), 9);
        assert!(cell.ptr_eq(&other));
        assert!(!cell.ptr_eq(&ObservableValue::new(9)));
    }
}
