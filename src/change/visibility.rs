//! Per-user change visibility

use super::entity::Change;
use crate::predicate::{MatchablePredicate, Predicate};

/// Cost of a visibility check; above any index leaf so it runs last
pub const VISIBILITY_COST: u64 = 10;

fn can_see(change: &Change, user: &str) -> bool {
    !change.private || change.owner == user
}

/// Changes `user` may see: every public change and their own private ones
pub fn visible_to(user: &str) -> Predicate<Change> {
    Predicate::new(MatchablePredicate::new("visibleto", user, VISIBILITY_COST, can_see))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeStatus;
    use chrono::Utc;

    fn change(owner: &str, private: bool) -> Change {
        Change {
            id: 1,
            key: "Iabcd1234".into(),
            project: "core".into(),
            branch: "main".into(),
            status: ChangeStatus::New,
            owner: owner.into(),
            subject: "s".into(),
            message: String::new(),
            topic: None,
            hashtags: vec![],
            files: vec![],
            insertions: 0,
            deletions: 0,
            created: Utc::now(),
            updated: Utc::now(),
            private,
            comments: vec![],
        }
    }

    #[test]
    fn test_private_changes_visible_to_owner_only() {
        let bob = visible_to("bob");
        assert!(bob.matches(&change("alice", false)).unwrap());
        assert!(!bob.matches(&change("alice", true)).unwrap());
        assert!(bob.matches(&change("bob", true)).unwrap());
        assert_eq!(bob.to_string(), "visibleto:bob");
    }
}
