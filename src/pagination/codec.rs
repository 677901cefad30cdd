use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const CHAR_TAG: &str = "char";
const PAGE_TAG: &str = "page";
const PREV_TAG: &str = "prev";
const NEXT_TAG: &str = "next";
const DELIMITER: char = ':';

/// State carried by a button or menu option across the Discord round trip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavAction {
    SelectCharacter { name: String },
    GoToPage { page_index: usize },
    PrevPage { from_page_index: usize },
    NextPage { from_page_index: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unrecognized widget identifier {0:?}")]
    Unrecognized(String),
}

impl NavAction {
    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn decode(id: &str) -> Result<Self, DecodeError> {
        id.parse()
    }

    /// The page a navigation action leads to, before clamping against the current list.
    pub fn target_page(&self) -> Option<usize> {
        match self {
            NavAction::SelectCharacter { .. } => None,
            NavAction::GoToPage { page_index } => Some(*page_index),
            NavAction::PrevPage { from_page_index } => Some(from_page_index.saturating_sub(1)),
            NavAction::NextPage { from_page_index } => Some(from_page_index.saturating_add(1)),
        }
    }
}

impl fmt::Display for NavAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NavAction::SelectCharacter { name } => write!(f, "{CHAR_TAG}{DELIMITER}{name}"),
            NavAction::GoToPage { page_index } => write!(f, "{PAGE_TAG}{DELIMITER}{page_index}"),
            NavAction::PrevPage { from_page_index } => write!(f, "{PREV_TAG}{DELIMITER}{from_page_index}"),
            NavAction::NextPage { from_page_index } => write!(f, "{NEXT_TAG}{DELIMITER}{from_page_index}"),
        }
    }
}

impl FromStr for NavAction {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unrecognized = || DecodeError::Unrecognized(s.to_string());

        // Only the first delimiter separates the tag, names may contain more of them.
        let (tag, payload) = s.split_once(DELIMITER).ok_or_else(unrecognized)?;

        match tag {
            CHAR_TAG => Ok(NavAction::SelectCharacter { name: payload.to_string() }),
            PAGE_TAG => parse_page_index(payload).map(|page_index| NavAction::GoToPage { page_index }).ok_or_else(unrecognized),
            PREV_TAG => parse_page_index(payload).map(|from_page_index| NavAction::PrevPage { from_page_index }).ok_or_else(unrecognized),
            NEXT_TAG => parse_page_index(payload).map(|from_page_index| NavAction::NextPage { from_page_index }).ok_or_else(unrecognized),
            _ => Err(unrecognized()),
        }
    }
}

/// Accepts exactly what `usize`'s `Display` produces.
fn parse_page_index(payload: &str) -> Option<usize> {
    if payload.is_empty() || !payload.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if payload.len() > 1 && payload.starts_with('0') {
        return None;
    }
    payload.parse().ok()
}
