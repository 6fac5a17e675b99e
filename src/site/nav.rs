//! Mobile navigation drawer: burger toggle, scrim, Escape, and body scroll lock.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    BurgerClick,
    /// A click inside the panel. Only clicks on (or inside) a link close it.
    PanelClick { on_link: bool },
    ScrimClick,
    KeyDown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTransition {
    Opened,
    /// Closed; the window should scroll back to this offset.
    Closed { restore_scroll_y: u32 },
    Unchanged,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavPanel {
    open: bool,
    scroll_lock_y: u32,
}

impl NavPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Remember where the page was and pin the body there.
    pub fn open(&mut self, scroll_y: u32) -> NavTransition {
        self.scroll_lock_y = scroll_y;
        self.open = true;
        NavTransition::Opened
    }

    pub fn close(&mut self) -> NavTransition {
        if !self.open {
            return NavTransition::Unchanged;
        }
        self.open = false;
        NavTransition::Closed {
            restore_scroll_y: self.scroll_lock_y,
        }
    }

    /// `scroll_y` is the window offset at the time of the event.
    pub fn handle(&mut self, event: &NavEvent, scroll_y: u32) -> NavTransition {
        match event {
            NavEvent::BurgerClick if self.open => self.close(),
            NavEvent::BurgerClick => self.open(scroll_y),
            NavEvent::PanelClick { on_link: true } | NavEvent::ScrimClick => self.close(),
            NavEvent::KeyDown(key) if key == "Escape" => self.close(),
            NavEvent::PanelClick { on_link: false } | NavEvent::KeyDown(_) => NavTransition::Unchanged,
        }
    }

    /// Inline `top` for the body while locked.
    pub fn body_top(&self) -> Option<String> {
        self.open.then(|| format!("-{}px", self.scroll_lock_y))
    }

    pub fn body_no_scroll(&self) -> bool {
        self.open
    }

    pub fn burger_aria_expanded(&self) -> &'static str {
        if self.open { "true" } else { "false" }
    }

    pub fn panel_aria_hidden(&self) -> &'static str {
        if self.open { "false" } else { "true" }
    }
}
