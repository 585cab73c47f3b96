use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::entries::FocusableEntry;
use super::state::{NavigationState, TextTarget};
use super::Effect;

/// Keys the project view reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Esc,
    Backspace,
    Delete,
    Home,
    End,
    Tab,
    Char(char),
}

impl Key {
    /// Map a terminal key event. Control and Alt chords are not ours.
    pub fn from_event(event: &KeyEvent) -> Option<Self> {
        if event
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return None;
        }
        let key = match event.code {
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Enter => Key::Enter,
            KeyCode::Esc => Key::Esc,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Delete => Key::Delete,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::Tab => Key::Tab,
            KeyCode::Char(ch) => Key::Char(ch),
            _ => return None,
        };
        Some(key)
    }
}

impl FromStr for Key {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let key = match value.to_ascii_lowercase().as_str() {
            "up" => Key::Up,
            "down" => Key::Down,
            "left" => Key::Left,
            "right" => Key::Right,
            "enter" | "return" => Key::Enter,
            "esc" | "escape" => Key::Esc,
            "backspace" => Key::Backspace,
            "delete" | "del" => Key::Delete,
            "home" => Key::Home,
            "end" => Key::End,
            "tab" => Key::Tab,
            "space" => Key::Char(' '),
            "comma" => Key::Char(','),
            _ => {
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Key::Char(ch),
                    _ => bail!("unknown key `{value}`"),
                }
            }
        };
        Ok(key)
    }
}

/// Parse a comma-separated key list. A `text:` token expands into one
/// `Char` per character, e.g. `s,text:buy milk,enter`.
pub fn parse_keys(spec: &str) -> Result<Vec<Key>> {
    let mut keys = Vec::new();
    for token in spec.split(',') {
        if let Some(text) = token.strip_prefix("text:") {
            keys.extend(text.chars().map(Key::Char));
            continue;
        }
        let token = token.trim();
        if token.is_empty() {
            return Err(anyhow!("empty key in `{spec}`"));
        }
        keys.push(token.parse()?);
    }
    Ok(keys)
}

impl NavigationState {
    /// Apply one key against the current entry sequence. Up and Down always
    /// navigate, even out of a text field; everything else goes to the
    /// active text field when there is one.
    pub fn handle_key(&mut self, key: Key, entries: &[FocusableEntry]) -> Vec<Effect> {
        match key {
            Key::Down => return self.move_down(entries),
            Key::Up => return self.move_up(entries),
            _ => {}
        }

        if let Some(target) = self.text_target() {
            return self.handle_text_key(key, &target);
        }

        match key {
            Key::Enter => self.confirm(),
            Key::Right => self.open_detail(),
            Key::Left => self.close_detail(),
            Key::Esc => self.escape(),
            Key::Char('s') => self.start_sub_item_add(),
            Key::Char('t') => self.start_task_add(),
            _ => Vec::new(),
        }
    }

    fn handle_text_key(&mut self, key: Key, target: &TextTarget) -> Vec<Effect> {
        match key {
            Key::Enter => return self.submit(),
            Key::Esc => return self.cancel(),
            Key::Tab if *target == TextTarget::CreateProject => self.cycle_project_color(),
            Key::Char(ch) => self.type_char(ch),
            _ => {
                if let Some(draft) = self.active_draft_mut() {
                    match key {
                        Key::Backspace => draft.backspace(),
                        Key::Delete => draft.delete_char(),
                        Key::Left => draft.move_left(),
                        Key::Right => draft.move_right(),
                        Key::Home => draft.move_home(),
                        Key::End => draft.move_end(),
                        _ => {}
                    }
                }
            }
        }
        Vec::new()
    }
}
