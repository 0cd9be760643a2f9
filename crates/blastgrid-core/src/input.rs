use serde::{Deserialize, Serialize};

/// Logical keys a player can hold or press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Action,
}

impl Key {
    fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Compact set of keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeySet(u8);

impl KeySet {
    pub fn insert(&mut self, key: Key) {
        self.0 |= key.bit();
    }

    pub fn contains(&self, key: Key) -> bool {
        self.0 & key.bit() != 0
    }

    pub fn union(self, other: KeySet) -> KeySet {
        KeySet(self.0 | other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<Key> for KeySet {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        let mut set = KeySet::default();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

/// A control update from the input transport.
///
/// `held` is the full set of keys currently down. `pressed` lists keys that
/// went down since the previous update (edge-triggered).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputUpdate {
    pub held: Vec<Key>,
    pub pressed: Vec<Key>,
}

impl InputUpdate {
    pub fn holding(keys: &[Key]) -> Self {
        Self {
            held: keys.to_vec(),
            pressed: Vec::new(),
        }
    }

    pub fn pressing(keys: &[Key]) -> Self {
        Self {
            held: keys.to_vec(),
            pressed: keys.to_vec(),
        }
    }

    /// The same held keys with edge presses dropped.
    pub fn without_edges(&self) -> Self {
        Self::holding(&self.held)
    }
}

/// Input consumed by one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputFrame {
    pub held: KeySet,
    pub pressed: KeySet,
}

/// Per-player buffer between the input transport and the tick.
///
/// Held keys are last-write-wins. Pressed keys accumulate across updates and
/// are cleared when a tick consumes them, so a press arriving between ticks
/// is seen exactly once.
#[derive(Debug, Clone, Default)]
pub struct InputBuffer {
    held: KeySet,
    pressed: KeySet,
}

impl InputBuffer {
    pub fn apply(&mut self, update: &InputUpdate) {
        self.held = update.held.iter().copied().collect();
        let pressed: KeySet = update.pressed.iter().copied().collect();
        self.pressed = self.pressed.union(pressed);
    }

    /// Read the current frame and clear pending edges.
    pub fn take_frame(&mut self) -> InputFrame {
        InputFrame {
            held: self.held,
            pressed: std::mem::take(&mut self.pressed),
        }
    }

    /// Drop held keys and pending edges.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
