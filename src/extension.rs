//! Enable/disable lifecycle of the switcher.
//!
//! While enabled the switcher owns the switching key bindings; while disabled
//! they fall through to the compositor and no recency state is kept.

use tracing::info;

use crate::host::Host;
use crate::manager::{Manager, ManagerSettings};
use crate::presenter::Presenter;

type PresenterFactory = Box<dyn Fn() -> Box<dyn Presenter>>;

pub struct Extension {
    settings: ManagerSettings,
    presenter_factory: PresenterFactory,
    manager: Option<Manager>,
}

impl Extension {
    /// `presenter_factory` builds a fresh presenter on every enable.
    pub fn new<F>(settings: ManagerSettings, presenter_factory: F) -> Self
    where
        F: Fn() -> Box<dyn Presenter> + 'static,
    {
        Extension {
            settings,
            presenter_factory: Box::new(presenter_factory),
            manager: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.manager.is_some()
    }

    /// Take over the switching bindings. A no-op when already enabled.
    pub fn enable(&mut self) {
        if self.manager.is_none() {
            info!("Switcher enabled");
            self.manager = Some(Manager::new(self.settings, (self.presenter_factory)()));
        }
    }

    /// Hand the bindings back and drop all switcher state, ending any live
    /// session first.
    pub fn disable<H: Host>(&mut self, host: &mut H) {
        if let Some(mut manager) = self.manager.take() {
            manager.cancel(host);
            info!("Switcher disabled");
        }
    }

    /// The manager, while enabled.
    pub fn manager(&mut self) -> Option<&mut Manager> {
        self.manager.as_mut()
    }
}
