//! Interaction-delegate chaining.
//!
//! The OS has one delegate slot. Installing ours must not evict whoever was
//! there: [`install_chain`] reads the current delegate, puts it behind our
//! handler in a [`DelegateChain`], and installs the chain. Handlers run in
//! registration order; the first one that does not pass an event through
//! answers it.

use std::sync::Arc;

use crate::platform::NotificationCenter;

/// Interaction event delivered by the OS notification center.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// A notification is about to be presented while the app is in the foreground.
    WillPresent { identifier: String },
    /// The user interacted with a delivered notification.
    Response { identifier: String, action: String },
}

impl NotificationEvent {
    pub fn identifier(&self) -> &str {
        match self {
            NotificationEvent::WillPresent { identifier }
            | NotificationEvent::Response { identifier, .. } => identifier,
        }
    }
}

/// How a foreground notification is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresentationOptions {
    pub banner: bool,
    pub list: bool,
    pub sound: bool,
}

impl PresentationOptions {
    /// Transient banner that also stays in the notification list, silent.
    pub fn banner() -> Self {
        Self {
            banner: true,
            list: true,
            sound: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Present the notification with these options.
    Present(PresentationOptions),
    /// Event consumed; nothing more to do.
    Handled,
    /// Not ours; the next handler (or the OS default) decides.
    PassThrough,
}

pub trait NotificationHandler: Send + Sync {
    fn handle(&self, event: &NotificationEvent) -> Disposition;
}

/// Handlers in registration order.
#[derive(Default)]
pub struct DelegateChain {
    handlers: Vec<Arc<dyn NotificationHandler>>,
}

impl DelegateChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler. A handler already in the chain is not added twice.
    pub fn push(&mut self, handler: Arc<dyn NotificationHandler>) {
        if self.contains(&handler) {
            return;
        }
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn contains(&self, handler: &Arc<dyn NotificationHandler>) -> bool {
        self.handlers.iter().any(|h| same_handler(h, handler))
    }
}

impl NotificationHandler for DelegateChain {
    fn handle(&self, event: &NotificationEvent) -> Disposition {
        for handler in &self.handlers {
            match handler.handle(event) {
                Disposition::PassThrough => continue,
                answered => return answered,
            }
        }
        Disposition::PassThrough
    }
}

/// Pointer identity, ignoring vtables.
pub(crate) fn same_handler(
    a: &Arc<dyn NotificationHandler>,
    b: &Arc<dyn NotificationHandler>,
) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Owns every event for one notification identifier: presents it as a banner
/// in the foreground and absorbs taps on it.
pub struct ForegroundPresenter {
    identifier: String,
    options: PresentationOptions,
}

impl ForegroundPresenter {
    pub fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            options: PresentationOptions::banner(),
        }
    }
}

impl NotificationHandler for ForegroundPresenter {
    fn handle(&self, event: &NotificationEvent) -> Disposition {
        if event.identifier() != self.identifier {
            return Disposition::PassThrough;
        }
        match event {
            NotificationEvent::WillPresent { .. } => Disposition::Present(self.options),
            NotificationEvent::Response { action, .. } => {
                tracing::debug!(identifier = %self.identifier, %action, "progress notification tapped");
                Disposition::Handled
            }
        }
    }
}

/// Install `own` in front of whatever delegate `center` currently has.
/// Returns the installed chain.
pub fn install_chain(
    center: &dyn NotificationCenter,
    own: Arc<dyn NotificationHandler>,
) -> Arc<dyn NotificationHandler> {
    let mut chain = DelegateChain::new();
    chain.push(Arc::clone(&own));
    match center.delegate() {
        Some(existing) if same_handler(&existing, &own) => {
            tracing::debug!("own handler already installed; not chaining it to itself");
        }
        Some(existing) => {
            tracing::debug!("chaining previously installed notification delegate");
            chain.push(existing);
        }
        None => {}
    }
    let chain: Arc<dyn NotificationHandler> = Arc::new(chain);
    center.set_delegate(Arc::clone(&chain));
    chain
}
