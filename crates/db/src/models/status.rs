//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data in the
//! corresponding `*_statuses` table.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Map a database status ID back to the enum.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Job lifecycle status. `Done`, `DonePartial`, `Failed`, and
    /// `Canceled` are terminal: no transition leads out of them.
    JobStatus {
        Queued = 1,
        Running = 2,
        Done = 3,
        DonePartial = 4,
        Failed = 5,
        Canceled = 6,
    }
}

define_status_enum! {
    /// Per-item execution status within a job.
    JobItemStatus {
        Queued = 1,
        Running = 2,
        Done = 3,
        Failed = 4,
    }
}

/// Non-terminal job statuses; at most one job per user may hold one of
/// these (enforced by the `uq_jobs_user_active` partial unique index).
pub const ACTIVE_JOB_STATUSES: [StatusId; 2] =
    [JobStatus::Queued as StatusId, JobStatus::Running as StatusId];

impl JobStatus {
    /// Whether this status admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Done | JobStatus::DonePartial | JobStatus::Failed | JobStatus::Canceled
        )
    }

    /// Lowercase wire name matching the `job_statuses` seed data.
    pub fn name(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::DonePartial => "done_partial",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
        }
    }
}

impl JobItemStatus {
    /// Lowercase wire name matching the `job_item_statuses` seed data.
    pub fn name(self) -> &'static str {
        match self {
            JobItemStatus::Queued => "queued",
            JobItemStatus::Running => "running",
            JobItemStatus::Done => "done",
            JobItemStatus::Failed => "failed",
        }
    }
}

impl From<tempero_core::settlement::ItemOutcome> for JobItemStatus {
    fn from(outcome: tempero_core::settlement::ItemOutcome) -> Self {
        use tempero_core::settlement::ItemOutcome;
        match outcome {
            ItemOutcome::Running => JobItemStatus::Running,
            ItemOutcome::Done => JobItemStatus::Done,
            ItemOutcome::Failed => JobItemStatus::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_ids_match_seed_data() {
        assert_eq!(JobStatus::Queued.id(), 1);
        assert_eq!(JobStatus::Running.id(), 2);
        assert_eq!(JobStatus::Done.id(), 3);
        assert_eq!(JobStatus::DonePartial.id(), 4);
        assert_eq!(JobStatus::Failed.id(), 5);
        assert_eq!(JobStatus::Canceled.id(), 6);
    }

    #[test]
    fn from_id_round_trips() {
        for id in 1..=6 {
            let status = JobStatus::from_id(id).unwrap();
            assert_eq!(status.id(), id);
        }
        assert!(JobStatus::from_id(7).is_none());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::DonePartial.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Canceled.is_terminal());
    }

    #[test]
    fn item_outcome_maps_to_item_status() {
        use tempero_core::settlement::ItemOutcome;
        assert_eq!(JobItemStatus::from(ItemOutcome::Done), JobItemStatus::Done);
        assert_eq!(
            JobItemStatus::from(ItemOutcome::Failed),
            JobItemStatus::Failed
        );
        assert_eq!(
            JobItemStatus::from(ItemOutcome::Running),
            JobItemStatus::Running
        );
    }
}
