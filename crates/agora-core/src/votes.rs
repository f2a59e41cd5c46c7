//! The vote ledger: at most one stance per (subject, voter), toggled.
//!
//! | existing       | requested | effect            |
//! |----------------|-----------|-------------------|
//! | none           | s         | insert s          |
//! | s              | s         | delete (no vote)  |
//! | opposite of s  | s         | overwrite with s  |

use std::sync::Arc;

use agora_db::{Connection, Database, votes};
use agora_types::models::{Aggregate, Stance, SubjectKind, UserId};
use anyhow::anyhow;
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};

/// How [`VoteLedger::toggle`] talks to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToggleMode {
    /// Read, decide, then write as independent round-trips. Concurrent toggles
    /// by the same voter on the same subject race; the last write wins.
    #[default]
    Sequential,
    /// Read, decide and write inside one IMMEDIATE transaction, serialized
    /// against every other writer.
    Atomic,
}

/// The single write a toggle performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    Insert(Stance),
    Delete,
    Update(Stance),
}

impl VoteAction {
    pub fn plan(existing: Option<Stance>, requested: Stance) -> Self {
        match existing {
            None => Self::Insert(requested),
            Some(current) if current == requested => Self::Delete,
            Some(_) => Self::Update(requested),
        }
    }

    /// The voter's stance once the action is applied.
    pub fn outcome(self) -> Option<Stance> {
        match self {
            Self::Insert(s) | Self::Update(s) => Some(s),
            Self::Delete => None,
        }
    }
}

#[derive(Clone)]
pub struct VoteLedger {
    db: Arc<Database>,
    mode: ToggleMode,
}

impl VoteLedger {
    pub fn new(db: Arc<Database>, mode: ToggleMode) -> Self {
        Self { db, mode }
    }

    /// Apply the tri-state toggle and return the voter's resulting stance.
    pub fn toggle(
        &self,
        kind: SubjectKind,
        subject_id: i64,
        voter_id: UserId,
        stance: Stance,
    ) -> CoreResult<Option<Stance>> {
        check_id(subject_id, kind_name(kind))?;
        check_id(voter_id, "voter")?;

        if !self.db.subject_exists(kind, subject_id)? {
            return Err(CoreError::NotFound(kind_name(kind)));
        }

        let action = match self.mode {
            ToggleMode::Sequential => self.toggle_sequential(kind, subject_id, voter_id, stance)?,
            ToggleMode::Atomic => self.db.with_transaction(|tx| {
                let existing = decode(votes::select_vote(tx, kind, subject_id, voter_id)?)?;
                let action = VoteAction::plan(existing, stance);
                apply(tx, kind, subject_id, voter_id, action)?;
                Ok(action)
            })?,
        };

        debug!("Vote on {} {} by user {}: {:?}", kind, subject_id, voter_id, action);
        Ok(action.outcome())
    }

    // Each statement is its own round-trip; nothing holds the row between
    // the read and the write.
    fn toggle_sequential(
        &self,
        kind: SubjectKind,
        subject_id: i64,
        voter_id: UserId,
        stance: Stance,
    ) -> CoreResult<VoteAction> {
        let existing = decode(self.db.get_vote(kind, subject_id, voter_id)?)?;
        let action = VoteAction::plan(existing, stance);

        let written = match action {
            VoteAction::Insert(s) => self.db.insert_vote(kind, subject_id, voter_id, s.as_i64()),
            VoteAction::Delete => self.db.delete_vote(kind, subject_id, voter_id).map(|_| ()),
            VoteAction::Update(s) => self
                .db
                .update_vote(kind, subject_id, voter_id, s.as_i64())
                .map(|_| ()),
        };

        match written {
            Ok(()) => Ok(action),
            Err(e) if agora_db::is_constraint_violation(&e) => {
                warn!(
                    "Concurrent vote on {} {} by user {} lost the race",
                    kind, subject_id, voter_id
                );
                Err(CoreError::Conflict("vote changed concurrently".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Like and dislike counts, read with two independent queries.
    pub fn aggregate(&self, kind: SubjectKind, subject_id: i64) -> CoreResult<Aggregate> {
        let likes = self.db.count_votes(kind, subject_id, Stance::Like.as_i64())?;
        let dislikes = self.db.count_votes(kind, subject_id, Stance::Dislike.as_i64())?;
        Ok(Aggregate::new(likes, dislikes))
    }

    /// The voter's current stance; `None` means no vote.
    pub fn stance(
        &self,
        kind: SubjectKind,
        subject_id: i64,
        voter_id: UserId,
    ) -> CoreResult<Option<Stance>> {
        Ok(decode(self.db.get_vote(kind, subject_id, voter_id)?)?)
    }
}

fn apply(
    conn: &Connection,
    kind: SubjectKind,
    subject_id: i64,
    voter_id: UserId,
    action: VoteAction,
) -> anyhow::Result<()> {
    match action {
        VoteAction::Insert(s) => votes::insert_vote(conn, kind, subject_id, voter_id, s.as_i64()),
        VoteAction::Delete => votes::delete_vote(conn, kind, subject_id, voter_id).map(|_| ()),
        VoteAction::Update(s) => {
            votes::update_vote(conn, kind, subject_id, voter_id, s.as_i64()).map(|_| ())
        }
    }
}

fn decode(raw: Option<i64>) -> anyhow::Result<Option<Stance>> {
    raw.map(|v| Stance::try_from(v).map_err(|e| anyhow!("corrupt vote row: {}", e)))
        .transpose()
}

fn kind_name(kind: SubjectKind) -> &'static str {
    match kind {
        SubjectKind::Post => "post",
        SubjectKind::Comment => "comment",
    }
}

fn check_id(id: i64, what: &str) -> CoreResult<()> {
    if id < 1 {
        return Err(CoreError::invalid(format!("{} id must be positive, got {}", what, id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_covers_all_three_branches() {
        assert_eq!(VoteAction::plan(None, Stance::Like), VoteAction::Insert(Stance::Like));
        assert_eq!(VoteAction::plan(Some(Stance::Like), Stance::Like), VoteAction::Delete);
        assert_eq!(
            VoteAction::plan(Some(Stance::Dislike), Stance::Like),
            VoteAction::Update(Stance::Like)
        );
    }

    #[test]
    fn outcomes() {
        assert_eq!(VoteAction::Delete.outcome(), None);
        assert_eq!(VoteAction::Update(Stance::Dislike).outcome(), Some(Stance::Dislike));
    }

    #[test]
    fn decode_rejects_neutral_codes() {
        assert_eq!(decode(None).unwrap(), None);
        assert_eq!(decode(Some(-1)).unwrap(), Some(Stance::Dislike));
        assert!(decode(Some(0)).is_err());
    }
}
