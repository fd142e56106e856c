//! Six-slot one-time-code entry. Each slot holds a single digit; entering a
//! digit advances focus to the next slot, and non-digit input leaves the slot
//! unchanged. Submission requires all six slots filled.

pub const CODE_LEN: usize = 6;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeEntry {
    slots: [Option<char>; CODE_LEN],
    focus: usize,
}

impl CodeEntry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a character into the focused slot, advancing focus when a digit
    /// is accepted. Focus stays on the last slot once it is reached.
    pub fn push(&mut self, input: char) {
        if self.set_slot(self.focus, input) && self.focus < CODE_LEN - 1 {
            self.focus += 1;
        }
    }

    /// Enter a character into a specific slot. Returns whether the slot
    /// accepted the character; non-digits are rejected and the slot keeps its
    /// previous value.
    pub fn set_slot(&mut self, index: usize, input: char) -> bool {
        if index >= CODE_LEN || !input.is_ascii_digit() {
            return false;
        }
        self.slots[index] = Some(input);
        true
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn focus(&self) -> usize {
        self.focus
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> Option<char> {
        self.slots.get(index).copied().flatten()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// The submitted code string, only when all six slots are filled.
    #[must_use]
    pub fn code(&self) -> Option<String> {
        if !self.is_complete() {
            return None;
        }
        Some(self.slots.iter().filter_map(|slot| *slot).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_advance_focus() {
        let mut entry = CodeEntry::new();
        entry.push('1');
        entry.push('2');
        assert_eq!(entry.focus(), 2);
        assert_eq!(entry.slot(0), Some('1'));
        assert_eq!(entry.slot(1), Some('2'));
        assert_eq!(entry.slot(2), None);
    }

    #[test]
    fn non_digit_leaves_slot_and_focus_unchanged() {
        let mut entry = CodeEntry::new();
        entry.push('1');
        entry.push('x');
        assert_eq!(entry.focus(), 1);
        assert_eq!(entry.slot(1), None);
        assert!(!entry.set_slot(3, 'a'));
        assert_eq!(entry.slot(3), None);
    }

    #[test]
    fn focus_stops_at_last_slot() {
        let mut entry = CodeEntry::new();
        for digit in "123456".chars() {
            entry.push(digit);
        }
        assert_eq!(entry.focus(), CODE_LEN - 1);
        entry.push('7');
        assert_eq!(entry.slot(CODE_LEN - 1), Some('7'));
    }

    #[test]
    fn code_requires_all_slots() {
        let mut entry = CodeEntry::new();
        for (index, digit) in [(0, '1'), (1, '2'), (2, '3'), (4, '5'), (5, '6')] {
            entry.set_slot(index, digit);
        }
        assert!(!entry.is_complete());
        assert_eq!(entry.code(), None);

        entry.set_slot(3, '4');
        assert_eq!(entry.code(), Some("123456".to_string()));
    }

    #[test]
    fn clear_resets_slots_and_focus() {
        let mut entry = CodeEntry::new();
        entry.push('9');
        entry.clear();
        assert_eq!(entry, CodeEntry::new());
    }
}
