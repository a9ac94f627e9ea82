//! Validator set tracking: the current and previous sets of a chain plus
//! the pending proposal tally for vote-driven changes.

use crate::error::RelayError;
use crate::types::validator::ValidatorSet;
use alloy_primitives::Address;
use std::collections::{BTreeMap, BTreeSet};

/// A proposal to add (`authorize`) or remove a validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vote {
    pub proposer: Address,
    pub target: Address,
    pub authorize: bool,
}

/// What a vote did to the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote could not change the set (authorizing a member, dropping a
    /// non-member, or dropping the last validator) and was not recorded.
    Ignored,
    /// Recorded; the proposal now has `tally` of the `threshold` votes needed.
    Pending { tally: usize, threshold: usize },
    /// The proposal reached its threshold and the set changed.
    Applied,
}

/// Current and previous validator sets of one chain.
///
/// `previous` starts equal to `current` and is replaced by the old current
/// set on every transition, so proofs against a block sealed just before a
/// change can still be related to the set that signed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorTracker {
    current: ValidatorSet,
    previous: ValidatorSet,
    /// (target, authorize) -> proposers backing that proposal.
    tally: BTreeMap<(Address, bool), BTreeSet<Address>>,
}

impl ValidatorTracker {
    pub fn new(initial: ValidatorSet) -> Self {
        Self {
            previous: initial.clone(),
            current: initial,
            tally: BTreeMap::new(),
        }
    }

    pub fn current(&self) -> &ValidatorSet {
        &self.current
    }

    pub fn previous(&self) -> &ValidatorSet {
        &self.previous
    }

    /// Votes currently backing the proposal `(target, authorize)`.
    pub fn tally(&self, target: &Address, authorize: bool) -> usize {
        self.tally
            .get(&(*target, authorize))
            .map_or(0, BTreeSet::len)
    }

    /// Number of open proposals.
    pub fn pending_proposals(&self) -> usize {
        self.tally.len()
    }

    pub fn clear_votes(&mut self) {
        self.tally.clear();
    }

    /// Record a vote and apply the change once it reaches `threshold`.
    ///
    /// A proposer holds at most one vote per target: voting the other way
    /// replaces the earlier vote, and repeating a vote does not count twice.
    pub fn apply_vote(&mut self, vote: &Vote) -> Result<VoteOutcome, RelayError> {
        if !self.current.contains(&vote.proposer) {
            return Err(RelayError::UnauthorizedProposer {
                proposer: vote.proposer,
            });
        }

        let is_member = self.current.contains(&vote.target);
        if is_member == vote.authorize || (!vote.authorize && self.current.len() == 1) {
            return Ok(VoteOutcome::Ignored);
        }

        if let Some(voters) = self.tally.get_mut(&(vote.target, !vote.authorize)) {
            voters.remove(&vote.proposer);
        }
        let voters = self
            .tally
            .entry((vote.target, vote.authorize))
            .or_default();
        voters.insert(vote.proposer);
        let tally = voters.len();
        let threshold = self.current.threshold();
        self.prune();

        if tally < threshold {
            return Ok(VoteOutcome::Pending { tally, threshold });
        }

        let next = if vote.authorize {
            self.current.with_added(vote.target)?
        } else {
            self.current.with_removed(&vote.target)?
        };

        self.tally.remove(&(vote.target, true));
        self.tally.remove(&(vote.target, false));
        if !vote.authorize {
            // A dropped validator's own votes no longer count
            for voters in self.tally.values_mut() {
                voters.remove(&vote.target);
            }
            self.prune();
        }
        self.rotate(next);
        Ok(VoteOutcome::Applied)
    }

    /// Replace the current set wholesale, discarding pending votes.
    /// Returns false if `next` equals the current set.
    pub fn transition(&mut self, next: ValidatorSet) -> bool {
        if next == self.current {
            return false;
        }
        self.rotate(next);
        self.tally.clear();
        true
    }

    fn rotate(&mut self, next: ValidatorSet) {
        self.previous = std::mem::replace(&mut self.current, next);
    }

    fn prune(&mut self) {
        self.tally.retain(|_, voters| !voters.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn tracker(n: u8) -> ValidatorTracker {
        ValidatorTracker::new(ValidatorSet::from_addresses((1..=n).map(addr)).unwrap())
    }

    fn vote(proposer: u8, target: u8, authorize: bool) -> Vote {
        Vote {
            proposer: addr(proposer),
            target: addr(target),
            authorize,
        }
    }

    #[test]
    fn test_add_reaches_threshold() {
        // n = 4, threshold = 3
        let mut t = tracker(4);
        assert_eq!(
            t.apply_vote(&vote(1, 9, true)).unwrap(),
            VoteOutcome::Pending { tally: 1, threshold: 3 }
        );
        assert_eq!(
            t.apply_vote(&vote(2, 9, true)).unwrap(),
            VoteOutcome::Pending { tally: 2, threshold: 3 }
        );
        assert_eq!(t.apply_vote(&vote(3, 9, true)).unwrap(), VoteOutcome::Applied);

        assert!(t.current().contains(&addr(9)));
        assert_eq!(t.current().len(), 5);
        assert_eq!(t.previous().len(), 4);
        assert_eq!(t.tally(&addr(9), true), 0);
        assert_eq!(t.pending_proposals(), 0);
    }

    #[test]
    fn test_duplicate_vote_is_idempotent() {
        let mut t = tracker(4);
        t.apply_vote(&vote(1, 9, true)).unwrap();
        assert_eq!(
            t.apply_vote(&vote(1, 9, true)).unwrap(),
            VoteOutcome::Pending { tally: 1, threshold: 3 }
        );
        assert!(!t.current().contains(&addr(9)));
    }

    #[test]
    fn test_vote_direction_follows_membership() {
        let mut t = tracker(4);
        t.apply_vote(&vote(1, 2, false)).unwrap();
        assert_eq!(t.tally(&addr(2), false), 1);
        // Authorizing a current member is meaningless
        assert_eq!(t.apply_vote(&vote(1, 2, true)).unwrap(), VoteOutcome::Ignored);
        assert_eq!(t.tally(&addr(2), false), 1);
        assert_eq!(t.tally(&addr(2), true), 0);
    }

    #[test]
    fn test_meaningless_votes_ignored() {
        let mut t = tracker(3);
        assert_eq!(t.apply_vote(&vote(1, 2, true)).unwrap(), VoteOutcome::Ignored);
        assert_eq!(t.apply_vote(&vote(1, 9, false)).unwrap(), VoteOutcome::Ignored);
        assert_eq!(t.pending_proposals(), 0);
    }

    #[test]
    fn test_outsider_cannot_vote() {
        let mut t = tracker(3);
        assert!(matches!(
            t.apply_vote(&vote(7, 9, true)),
            Err(RelayError::UnauthorizedProposer { .. })
        ));
    }

    #[test]
    fn test_drop_discards_dropped_validators_votes() {
        // n = 3, threshold = 2
        let mut t = tracker(3);
        t.apply_vote(&vote(3, 9, true)).unwrap();
        assert_eq!(t.tally(&addr(9), true), 1);

        t.apply_vote(&vote(1, 3, false)).unwrap();
        assert_eq!(t.apply_vote(&vote(2, 3, false)).unwrap(), VoteOutcome::Applied);
        assert!(!t.current().contains(&addr(3)));
        assert_eq!(t.tally(&addr(9), true), 0);
        assert_eq!(t.pending_proposals(), 0);
    }

    #[test]
    fn test_cannot_drop_last_validator() {
        let mut t = tracker(1);
        assert_eq!(t.apply_vote(&vote(1, 1, false)).unwrap(), VoteOutcome::Ignored);
        assert_eq!(t.current().len(), 1);
    }

    #[test]
    fn test_single_validator_adds_alone() {
        let mut t = tracker(1);
        assert_eq!(t.apply_vote(&vote(1, 9, true)).unwrap(), VoteOutcome::Applied);
        assert_eq!(t.current().len(), 2);
    }

    #[test]
    fn test_transition_moves_current_to_previous() {
        let mut t = tracker(3);
        t.apply_vote(&vote(1, 9, true)).unwrap();
        let next = ValidatorSet::from_addresses([addr(4), addr(5)]).unwrap();
        assert!(t.transition(next.clone()));
        assert_eq!(t.current(), &next);
        assert_eq!(t.previous().len(), 3);
        assert_eq!(t.pending_proposals(), 0);

        assert!(!t.transition(next));
        assert_eq!(t.previous().len(), 3);
    }
}
