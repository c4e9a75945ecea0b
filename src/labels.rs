use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Binary sentiment label, encoded 0 = negative, 1 = positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
  Negative = 0,
  Positive = 1,
}

impl Label {
  pub const ALL: [Label; 2] = [Label::Negative, Label::Positive];

  pub fn as_index(self) -> usize {
    self as usize
  }

  pub fn from_index(index: usize) -> Option<Label> {
    match index {
      0 => Some(Label::Negative),
      1 => Some(Label::Positive),
      _ => None,
    }
  }
}

impl TryFrom<u8> for Label {
  type Error = Error;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Label::from_index(value as usize)
      .ok_or_else(|| Error::invalid("label", value, "must be 0 or 1"))
  }
}

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Label::Negative => f.write_str("Negative"),
      Label::Positive => f.write_str("Positive"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn it_renders_the_two_literals() {
    assert_eq!(Label::Positive.to_string(), "Positive");
    assert_eq!(Label::Negative.to_string(), "Negative");
  }

  #[test]
  fn it_rejects_labels_outside_zero_and_one() {
    assert_eq!(Label::try_from(1u8).unwrap(), Label::Positive);
    assert_eq!(Label::try_from(0u8).unwrap(), Label::Negative);
    assert!(Label::try_from(2u8).is_err());
  }
}
