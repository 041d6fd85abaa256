//! Lifecycle-scoped подписки
//!
//! Каждый reactive компонент:
//! - реализует `Hooks` (какие ячейки слушает)
//! - держит `Lifecycle`: activate() подписывает, deactivate() отписывает ровно то же самое
//!
//! Гарантии:
//! - handler никогда не вызывается после deactivate (или drop компонента)
//! - повторный activate() без deactivate() не создаёт дублей

use crate::observable::ObservableValue;

/// RAII guard одной пары (ячейка, handler)
///
/// Drop → unsubscribe. `release()` идемпотентен.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new<T>(cell: &ObservableValue<T>, handler: impl Fn(&T) + Send + Sync + 'static) -> Self
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let id = cell.subscribe(handler);
        let cell = cell.clone();
        Self {
            release: Some(Box::new(move || {
                cell.unsubscribe(id);
            })),
        }
    }

    /// Отписаться. `false` если уже отписан.
    pub fn release(&mut self) -> bool {
        match self.release.take() {
            Some(release) => {
                release();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Набор подписок, которыми владеет один компонент
#[derive(Default)]
pub struct SubscriptionScope {
    guards: Vec<Subscription>,
}

impl SubscriptionScope {
    pub fn watch<T>(&mut self, cell: &ObservableValue<T>, handler: impl Fn(&T) + Send + Sync + 'static)
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        self.guards.push(Subscription::new(cell, handler));
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    /// Отписать всё. Возвращает количество реально снятых подписок.
    pub fn release_all(&mut self) -> usize {
        self.guards
            .drain(..)
            .map(|mut guard| usize::from(guard.release()))
            .sum()
    }
}

/// Компонент, который подписывается на ячейки при активации
pub trait Hooks {
    fn hook_events(&self, scope: &mut SubscriptionScope);
}

/// Active/inactive состояние компонента
///
/// Drop активного Lifecycle снимает все подписки (любой путь выхода).
#[derive(Default)]
pub struct Lifecycle {
    scope: Option<SubscriptionScope>,
}

impl Lifecycle {
    /// Подписать `hooks`. `false` (no-op) если уже активен.
    pub fn activate<H: Hooks + ?Sized>(&mut self, hooks: &H) -> bool {
        if self.scope.is_some() {
            return false;
        }

        let mut scope = SubscriptionScope::default();
        hooks.hook_events(&mut scope);
        self.scope = Some(scope);
        true
    }

    /// Снять подписки. `false` (no-op) если уже неактивен.
    pub fn deactivate(&mut self) -> bool {
        match self.scope.take() {
            Some(mut scope) => {
                scope.release_all();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.scope.is_some()
    }

    pub fn subscription_count(&self) -> usize {
        self.scope.as_ref().map_or(0, SubscriptionScope::len)
    }
}
