use serde::{Deserialize, Serialize};

/// Fixed set of avatar tags a profile may carry.
///
/// Registration rejects anything outside this set; the store persists the
/// lowercase tag string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Avatar {
    Cat,
    Dog,
    Fox,
    Panda,
    Lion,
    Bear,
    Rabbit,
    Owl,
}

impl Avatar {
    /// Every allowed avatar, in declaration order.
    pub const ALL: [Avatar; 8] = [
        Avatar::Cat,
        Avatar::Dog,
        Avatar::Fox,
        Avatar::Panda,
        Avatar::Lion,
        Avatar::Bear,
        Avatar::Rabbit,
        Avatar::Owl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Avatar::Cat => "cat",
            Avatar::Dog => "dog",
            Avatar::Fox => "fox",
            Avatar::Panda => "panda",
            Avatar::Lion => "lion",
            Avatar::Bear => "bear",
            Avatar::Rabbit => "rabbit",
            Avatar::Owl => "owl",
        }
    }

    /// Parse a lowercase tag; `None` for anything outside the allowed set.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.as_str() == s)
    }
}

impl std::fmt::Display for Avatar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a friend request.  Terminal once accepted or rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "accepted" => Some(RequestStatus::Accepted),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

/// Action a request target may take on a pending friend request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RespondAction {
    Accept,
    Reject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_round_trip() {
        for avatar in Avatar::ALL {
            assert_eq!(Avatar::parse(avatar.as_str()), Some(avatar));
        }
    }

    #[test]
    fn avatar_rejects_unknown_tag() {
        assert_eq!(Avatar::parse("dragon"), None);
        assert_eq!(Avatar::parse("Cat"), None);
    }

    #[test]
    fn request_status_round_trip() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Accepted,
            RequestStatus::Rejected,
        ] {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::parse("open"), None);
    }
}
