use crate::model::ListHash;
use crate::window::WindowId;

/// Commands and notifications the desktop reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeskEvent {
    ApplicationWillTerminate,
    WindowDidBecomeKey(WindowId),
    WindowWillClose(WindowId),
    ScreenParametersChanged,
    NewNoteRequested,
    CloseRequested,
    ArrangeRequested,
    ArrangeMinimizedRequested,
    VisibilityChanged { blur: bool, to_normal_level: bool },
    CleanRequested(ListHash),
    MinimizeAllRequested,
    BringAllUpRequested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListChange {
    Created(ListHash),
    Updated(ListHash),
    Deleted(ListHash),
}

type Subscriber = Box<dyn FnMut(&ListChange)>;

/// Publishes list mutations to whoever renders them.
#[derive(Default)]
pub struct ChangeFeed {
    subscribers: Vec<Subscriber>,
}

impl ChangeFeed {
    pub fn subscribe(&mut self, subscriber: impl FnMut(&ListChange) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn publish(&mut self, change: ListChange) {
        for subscriber in self.subscribers.iter_mut() {
            subscriber(&change);
        }
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
