//! Visibility resolver.
//!
//! Every read path resolves an actor to a single [`CardScope`]; stores
//! evaluate that scope and nothing else, so a card hidden on one path cannot
//! surface on another.
//!
//! | Actor | General / Export | Personal | Direct lookup |
//! |-------|------------------|----------|---------------|
//! | admin | everything (optionally one submitter) | own cards | everything |
//! | user | privileged submitter's cards + shared cards | own cards | general ∪ personal |
//! | privileged user | privileged submitter's cards + shared cards | nothing | general |

use serde::{Deserialize, Serialize};

use crate::{actor::Actor, card::CardRecord};

/// A read path through which cards are observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPath {
  General,
  Personal,
  Export,
  /// Fetching one card by id.
  Direct,
}

/// The set of cards an actor may observe, as a store predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardScope {
  All,
  Nothing,
  SubmittedBy(String),
  /// Cards by the privileged submitter, cards with `shared` set, and, when
  /// `own` is present, cards submitted by that identity.
  Published {
    privileged: String,
    own:        Option<String>,
  },
}

impl CardScope {
  pub fn matches(&self, card: &CardRecord) -> bool {
    match self {
      Self::All => true,
      Self::Nothing => false,
      Self::SubmittedBy(who) => card.submitted_by == *who,
      Self::Published { privileged, own } => {
        card.shared
          || card.submitted_by == *privileged
          || own.as_deref() == Some(card.submitted_by.as_str())
      }
    }
  }
}

/// Process-wide access configuration, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
  privileged_submitter: String,
}

impl AccessPolicy {
  pub fn new(privileged_submitter: impl Into<String>) -> Self {
    Self { privileged_submitter: privileged_submitter.into().trim().to_owned() }
  }

  pub fn privileged_submitter(&self) -> &str { &self.privileged_submitter }

  pub fn is_privileged(&self, identity: &str) -> bool {
    identity == self.privileged_submitter
  }

  /// Resolve the scope for `actor` on `path`. `submitted_by` narrows the
  /// general and export listings for admins and is ignored otherwise.
  pub fn scope(
    &self,
    actor: &Actor,
    path: ReadPath,
    submitted_by: Option<&str>,
  ) -> CardScope {
    if actor.is_admin() {
      return match (path, submitted_by) {
        (ReadPath::Personal, _) => CardScope::SubmittedBy(actor.identity.clone()),
        (ReadPath::General | ReadPath::Export, Some(who)) => {
          CardScope::SubmittedBy(who.to_owned())
        }
        _ => CardScope::All,
      };
    }

    let privileged = self.is_privileged(&actor.identity);
    match path {
      ReadPath::Personal if privileged => CardScope::Nothing,
      ReadPath::Personal => CardScope::SubmittedBy(actor.identity.clone()),
      ReadPath::General | ReadPath::Export => CardScope::Published {
        privileged: self.privileged_submitter.clone(),
        own:        None,
      },
      ReadPath::Direct => CardScope::Published {
        privileged: self.privileged_submitter.clone(),
        own:        (!privileged).then(|| actor.identity.clone()),
      },
    }
  }

  /// Whether `actor` can observe `card` through any read path.
  pub fn can_view(&self, actor: &Actor, card: &CardRecord) -> bool {
    self.scope(actor, ReadPath::Direct, None).matches(card)
  }

  /// Admins may mutate any card; everyone else only cards they submitted.
  /// Applies to the share toggle, field edits and deletion alike.
  pub fn can_mutate(&self, actor: &Actor, card: &CardRecord) -> bool {
    actor.is_admin() || card.submitted_by == actor.identity
  }
}
