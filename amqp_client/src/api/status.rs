//! Lifecycle status shared by connections and channels.
//!
//! Each entity embeds a [`StatusTracker`] restricted to its own set of
//! permitted values. The tracker only checks membership; which transitions
//! are legal is decided by the owner.
use std::{fmt, str::FromStr};

use super::{error::Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Initial,
    Opening,
    Opened,
    Closing,
    Closed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Initial => "initial",
            Status::Opening => "opening",
            Status::Opened => "opened",
            Status::Closing => "closing",
            Status::Closed => "closed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "initial" => Ok(Status::Initial),
            "opening" => Ok(Status::Opening),
            "opened" => Ok(Status::Opened),
            "closing" => Ok(Status::Closing),
            "closed" => Ok(Status::Closed),
            other => Err(Error::ImproperStatus(format!(
                "'{}' is not a known status",
                other
            ))),
        }
    }
}

pub const CONNECTION_STATUSES: &[Status] = &[
    Status::Initial,
    Status::Opening,
    Status::Opened,
    Status::Closing,
    Status::Closed,
];

pub const CHANNEL_STATUSES: &[Status] = &[
    Status::Opening,
    Status::Opened,
    Status::Closing,
    Status::Closed,
];

/////////////////////////////////////////////////////////////////////////////
/// Current status of an entity, `None` until first set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTracker {
    permitted: &'static [Status],
    current: Option<Status>,
}

impl StatusTracker {
    pub fn new(permitted: &'static [Status]) -> Self {
        Self {
            permitted,
            current: None,
        }
    }

    pub fn permitted(&self) -> &'static [Status] {
        self.permitted
    }
}

/////////////////////////////////////////////////////////////////////////////
macro_rules! impl_status_helpers {
    ($($status:ident => $is:ident, $mark:ident);+ $(;)?) => {
        /// Predicates and transitions over an embedded [`StatusTracker`].
        pub trait Stateful {
            fn tracker(&self) -> &StatusTracker;
            fn tracker_mut(&mut self) -> &mut StatusTracker;

            /// `None` if status has never been set.
            fn status(&self) -> Option<Status> {
                self.tracker().current
            }

            /// # Errors
            ///
            /// Returns [`Error::ImproperStatus`] and keeps the current value
            /// if `status` is not permitted for this entity.
            fn set_status(&mut self, status: Status) -> Result<()> {
                let tracker = self.tracker_mut();
                if !tracker.permitted.contains(&status) {
                    return Err(Error::ImproperStatus(format!(
                        "'{}' is not one of {:?}",
                        status, tracker.permitted
                    )));
                }
                tracker.current = Some(status);
                Ok(())
            }

            $(
                fn $is(&self) -> bool {
                    self.status() == Some(Status::$status)
                }

                fn $mark(&mut self) -> Result<()> {
                    self.set_status(Status::$status)
                }
            )+
        }
    };
}

impl_status_helpers! {
    Initial => is_initial, mark_initial;
    Opening => is_opening, mark_opening;
    Opened => is_opened, mark_opened;
    Closing => is_closing, mark_closing;
    Closed => is_closed, mark_closed;
}

impl Stateful for StatusTracker {
    fn tracker(&self) -> &StatusTracker {
        self
    }

    fn tracker_mut(&mut self) -> &mut StatusTracker {
        self
    }
}

/////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::{Stateful, Status, StatusTracker, CHANNEL_STATUSES, CONNECTION_STATUSES};
    use crate::api::error::Error;

    #[test]
    fn test_unset_by_default() {
        let tracker = StatusTracker::new(CONNECTION_STATUSES);
        assert_eq!(None, tracker.status());
        assert!(CONNECTION_STATUSES.iter().all(|s| {
            let mut other = tracker.clone();
            other.set_status(*s).unwrap();
            other.status() != tracker.status()
        }));
    }

    #[test]
    fn test_store_permitted_values() {
        let mut tracker = StatusTracker::new(CONNECTION_STATUSES);
        for status in CONNECTION_STATUSES {
            tracker.set_status(*status).unwrap();
            assert_eq!(Some(*status), tracker.status());
        }
    }

    #[test]
    fn test_reject_value_not_permitted() {
        let mut tracker = StatusTracker::new(CHANNEL_STATUSES);
        tracker.mark_opened().unwrap();

        let err = tracker.set_status(Status::Initial).unwrap_err();
        assert!(matches!(err, Error::ImproperStatus(_)));
        assert_eq!(Some(Status::Opened), tracker.status());
    }

    #[test]
    fn test_reject_unknown_symbol() {
        assert!(matches!(
            "sleepy".parse::<Status>(),
            Err(Error::ImproperStatus(_))
        ));
        assert_eq!(Status::Closing, "closing".parse().unwrap());
    }

    #[test]
    fn test_predicates_follow_marks() {
        let mut tracker = StatusTracker::new(CONNECTION_STATUSES);

        tracker.mark_opening().unwrap();
        assert!(tracker.is_opening());
        assert!(!tracker.is_initial());
        assert!(!tracker.is_opened());
        assert!(!tracker.is_closing());
        assert!(!tracker.is_closed());

        tracker.mark_opened().unwrap();
        assert!(tracker.is_opened());
        assert!(!tracker.is_opening());

        tracker.mark_closing().unwrap();
        assert!(tracker.is_closing());
        assert!(!tracker.is_opened());

        tracker.mark_closed().unwrap();
        assert!(tracker.is_closed());
        assert!(!tracker.is_closing());
    }

    #[test]
    fn test_no_transition_order_enforced() {
        let mut tracker = StatusTracker::new(CONNECTION_STATUSES);
        tracker.mark_closed().unwrap();
        tracker.mark_opened().unwrap();
        assert!(tracker.is_opened());
    }
}
