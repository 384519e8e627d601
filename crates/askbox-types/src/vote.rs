/// Direction of a vote. At most one active vote exists per
/// (response, voter) pair; casting the opposite direction replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    Up,
    Down,
}

impl VoteKind {
    /// Storage representation, matching the votes table CHECK constraint.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "upvote",
            Self::Down => "downvote",
        }
    }
}

const UPVOTE_ALIASES: &[&str] = &["+1", "thumbsup", "thumbsup_all", "👍", "thumbs_up"];
const DOWNVOTE_ALIASES: &[&str] = &["-1", "thumbsdown", "thumbsdown_all", "👎", "thumbs_down"];

/// Map a reaction name to a vote direction. Returns `None` for every
/// reaction that is not a recognized thumbs alias; those events are ignored.
pub fn classify_reaction(name: &str) -> Option<VoteKind> {
    if UPVOTE_ALIASES.contains(&name) {
        Some(VoteKind::Up)
    } else if DOWNVOTE_ALIASES.contains(&name) {
        Some(VoteKind::Down)
    } else {
        None
    }
}

/// Format a net score for display: explicit `+` on positive values,
/// plain rendering for zero and negatives.
pub fn format_points(score: i64) -> String {
    if score > 0 {
        format!("+{}", score)
    } else {
        score.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbs_aliases_classify() {
        for name in ["+1", "thumbsup", "thumbsup_all", "👍", "thumbs_up"] {
            assert_eq!(classify_reaction(name), Some(VoteKind::Up), "{}", name);
        }
        for name in ["-1", "thumbsdown", "thumbsdown_all", "👎", "thumbs_down"] {
            assert_eq!(classify_reaction(name), Some(VoteKind::Down), "{}", name);
        }
    }

    #[test]
    fn other_reactions_are_ignored() {
        assert_eq!(classify_reaction("tada"), None);
        assert_eq!(classify_reaction("eyes"), None);
        assert_eq!(classify_reaction(""), None);
        // Prefix of an alias is not an alias
        assert_eq!(classify_reaction("thumbsup_a"), None);
    }

    #[test]
    fn points_formatting() {
        assert_eq!(format_points(3), "+3");
        assert_eq!(format_points(1), "+1");
        assert_eq!(format_points(0), "0");
        assert_eq!(format_points(-2), "-2");
    }
}
