//! DOM Events
//!
//! Event objects dispatched through the window: focus, keyboard, pointer
//! and custom events. Propagation is target-then-ancestors (bubble phase
//! only).

use crate::NodeId;

/// Identifier of a registered listener or hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// DOM event types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    KeyDown,
    FocusIn,
    FocusOut,
    MouseDown,
    /// `CustomEvent` by name
    Custom(String),
}

impl EventType {
    pub fn custom(name: &str) -> Self {
        Self::Custom(name.to_string())
    }

    /// Event name as scripts see it
    pub fn name(&self) -> &str {
        match self {
            Self::KeyDown => "keydown",
            Self::FocusIn => "focusin",
            Self::FocusOut => "focusout",
            Self::MouseDown => "mousedown",
            Self::Custom(name) => name,
        }
    }
}

/// Key value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Character(char),
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    Enter,
    Tab,
    Escape,
    Space,
    Unidentified(String),
}

impl Key {
    /// Parse from key string
    pub fn parse(s: &str) -> Self {
        match s {
            "ArrowUp" => Self::ArrowUp,
            "ArrowDown" => Self::ArrowDown,
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowRight" => Self::ArrowRight,
            "Home" => Self::Home,
            "End" => Self::End,
            "Enter" => Self::Enter,
            "Tab" => Self::Tab,
            "Escape" => Self::Escape,
            " " => Self::Space,
            s => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Character(c),
                    _ => Self::Unidentified(s.to_string()),
                }
            }
        }
    }
}

/// Modifier key state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyModifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyModifiers {
    /// Any modifier other than shift held
    pub fn has_command(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

/// Keyboard event payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardEvent {
    pub key: Key,
    pub modifiers: KeyModifiers,
    pub repeat: bool,
}

impl KeyboardEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: KeyModifiers::default(),
            repeat: false,
        }
    }

    /// Plain Tab
    pub fn tab() -> Self {
        Self::new(Key::Tab)
    }

    /// Shift+Tab
    pub fn shift_tab() -> Self {
        Self::new(Key::Tab).with_shift()
    }

    pub fn with_shift(mut self) -> Self {
        self.modifiers.shift = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.modifiers.ctrl = true;
        self
    }

    /// Tab or Shift+Tab without command modifiers
    pub fn is_sequential_navigation(&self) -> bool {
        self.key == Key::Tab && !self.modifiers.has_command()
    }
}

/// Type-specific event data
#[derive(Debug, Clone, PartialEq)]
pub enum EventDetail {
    None,
    Key(KeyboardEvent),
}

/// DOM event
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: EventType,
    pub target: NodeId,
    pub current_target: Option<NodeId>,
    /// Focus events: the node losing (focusin) or gaining (focusout) focus
    pub related_target: Option<NodeId>,
    pub detail: EventDetail,
    pub bubbles: bool,
    pub cancelable: bool,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Event {
    fn new(event_type: EventType, bubbles: bool, cancelable: bool) -> Self {
        Self {
            event_type,
            target: NodeId::NONE,
            current_target: None,
            related_target: None,
            detail: EventDetail::None,
            bubbles,
            cancelable,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Create a custom event
    pub fn custom(name: &str, bubbles: bool, cancelable: bool) -> Self {
        Self::new(EventType::custom(name), bubbles, cancelable)
    }

    /// Create keydown event
    pub fn key_down(key: KeyboardEvent) -> Self {
        let mut event = Self::new(EventType::KeyDown, true, true);
        event.detail = EventDetail::Key(key);
        event
    }

    /// Create focusin event
    pub fn focus_in(related: Option<NodeId>) -> Self {
        let mut event = Self::new(EventType::FocusIn, true, false);
        event.related_target = related;
        event
    }

    /// Create focusout event
    pub fn focus_out(related: Option<NodeId>) -> Self {
        let mut event = Self::new(EventType::FocusOut, true, false);
        event.related_target = related;
        event
    }

    /// Create mousedown event
    pub fn mouse_down() -> Self {
        Self::new(EventType::MouseDown, true, true)
    }

    /// Keyboard payload, if any
    pub fn key(&self) -> Option<&KeyboardEvent> {
        match &self.detail {
            EventDetail::Key(k) => Some(k),
            EventDetail::None => None,
        }
    }

    /// Prevent default action
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Stop propagation
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Check if default was prevented
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}
